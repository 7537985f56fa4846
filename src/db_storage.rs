use crate::errors::{AppError, ResultExt};
use crate::models::{CompanyCandidate, EnrichmentRecord, Lead, ScoreUpdate};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Storage for lead records.
///
/// Domain uniqueness is enforced by the storage itself, never by callers
/// locking around it.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Inserts new leads or refreshes existing ones matched by domain.
    ///
    /// Candidates must already be unique by domain. Rows whose values would not
    /// change are left untouched, `updated_at` included. Returns the number of
    /// rows inserted or changed.
    async fn upsert(&self, candidates: &[CompanyCandidate]) -> Result<u64, AppError>;

    /// All leads, most recently updated first.
    async fn find_all(&self) -> Result<Vec<Lead>, AppError>;

    /// Leads whose id is in `ids`. Unknown ids are omitted.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, AppError>;

    /// Writes evaluation scores. All updates land or none do.
    async fn save_scores(&self, updates: &[ScoreUpdate]) -> Result<(), AppError>;

    /// Applies provider data to the lead with the record's domain.
    ///
    /// Fields the provider did not return keep their stored value. Returns the
    /// number of rows changed (0 when no lead has that domain).
    async fn update_enrichment(&self, record: &EnrichmentRecord) -> Result<u64, AppError>;
}

/// PostgreSQL-backed lead storage.
#[derive(Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn upsert(&self, candidates: &[CompanyCandidate]) -> Result<u64, AppError> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO leads (id, company_name, contact_phone, location, website_url, domain) ",
        );
        builder.push_values(candidates, |mut row, candidate| {
            row.push_bind(Uuid::new_v4())
                .push_bind(candidate.company_name.clone())
                .push_bind(candidate.contact_phone.clone())
                .push_bind(candidate.location.clone())
                .push_bind(candidate.website_url.clone())
                .push_bind(candidate.domain.clone());
        });
        // Skip the write entirely when nothing changed so updated_at stays put.
        builder.push(
            r#"
            ON CONFLICT (domain) DO UPDATE
            SET company_name = EXCLUDED.company_name,
                contact_phone = EXCLUDED.contact_phone,
                location = EXCLUDED.location,
                website_url = EXCLUDED.website_url,
                updated_at = now()
            WHERE (leads.company_name, leads.contact_phone, leads.location, leads.website_url)
                IS DISTINCT FROM
                (EXCLUDED.company_name, EXCLUDED.contact_phone, EXCLUDED.location, EXCLUDED.website_url)
            "#,
        );

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to upsert {} scraped leads", candidates.len()))?;

        tracing::info!(
            "Upserted leads: {} submitted, {} inserted or changed",
            candidates.len(),
            result.rows_affected()
        );

        Ok(result.rows_affected())
    }

    async fn find_all(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list leads")?;

        Ok(leads)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let leads = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE id = ANY($1) ORDER BY updated_at DESC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load leads by id")?;

        Ok(leads)
    }

    async fn save_scores(&self, updates: &[ScoreUpdate]) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open score transaction")?;

        for update in updates {
            sqlx::query(
                r#"
                UPDATE leads
                SET icp_score = $2,
                    keyword_score = $3,
                    outreach_angle = $4,
                    priority_score = $5,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(update.id)
            .bind(update.icp_score)
            .bind(update.keyword_score)
            .bind(&update.outreach_angle)
            .bind(update.priority_score)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to save scores for lead {}", update.id))?;
        }

        tx.commit()
            .await
            .context("Failed to commit score transaction")?;

        tracing::info!("Saved scores for {} leads", updates.len());
        Ok(())
    }

    async fn update_enrichment(&self, record: &EnrichmentRecord) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET contact_phone = COALESCE($2, contact_phone),
                keywords = COALESCE($3, keywords),
                linkedin_url = COALESCE($4, linkedin_url),
                industry = COALESCE($5, industry),
                description = COALESCE($6, description),
                num_employees = COALESCE($7, num_employees),
                updated_at = now()
            WHERE domain = $1
              AND (contact_phone, keywords, linkedin_url, industry, description, num_employees)
                  IS DISTINCT FROM
                  (COALESCE($2, contact_phone), COALESCE($3, keywords), COALESCE($4, linkedin_url),
                   COALESCE($5, industry), COALESCE($6, description), COALESCE($7, num_employees))
            "#,
        )
        .bind(&record.domain)
        .bind(&record.contact_phone)
        .bind(&record.keywords)
        .bind(&record.linkedin_url)
        .bind(&record.industry)
        .bind(&record.description)
        .bind(record.num_employees)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to apply enrichment for {}", record.domain))?;

        Ok(result.rows_affected())
    }
}
