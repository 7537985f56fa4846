//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use lead_scout::db_storage::LeadRepository;
use lead_scout::directory::DirectorySource;
use lead_scout::enrichment::EnrichmentClient;
use lead_scout::errors::AppError;
use lead_scout::evaluation::{EvaluationEngine, ScoringBackend};
use lead_scout::models::{CompanyCandidate, EnrichmentRecord, Lead, ScoreUpdate, SearchQuery};
use lead_scout::pipeline::LeadPipeline;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory lead storage with the same write semantics as the Postgres one:
/// writes that change nothing return 0 and leave `updated_at` alone.
#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: Mutex<Vec<Lead>>,
    failing_domains: Mutex<HashSet<String>>,
    pub upsert_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
}

impl InMemoryLeadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `update_enrichment` fail for `domain`.
    pub fn fail_updates_for(&self, domain: &str) {
        self.failing_domains
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    pub fn snapshot(&self) -> Vec<Lead> {
        self.leads.lock().unwrap().clone()
    }

    pub fn by_domain(&self, domain: &str) -> Option<Lead> {
        self.leads
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.domain == domain)
            .cloned()
    }

    pub fn insert_lead(&self, lead: Lead) {
        self.leads.lock().unwrap().push(lead);
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn upsert(&self, candidates: &[CompanyCandidate]) -> Result<u64, AppError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let mut seen = HashSet::new();
        for candidate in candidates {
            if !seen.insert(candidate.domain.as_str()) {
                return Err(AppError::DatabaseError(sqlx::Error::Protocol(format!(
                    "ON CONFLICT DO UPDATE command cannot affect row a second time ({})",
                    candidate.domain
                ))));
            }
        }

        let mut leads = self.leads.lock().unwrap();
        let mut changed = 0;
        for candidate in candidates {
            match leads.iter_mut().find(|l| l.domain == candidate.domain) {
                Some(existing) => {
                    let same = existing.company_name.as_deref() == Some(candidate.company_name.as_str())
                        && existing.contact_phone.as_deref() == Some(candidate.contact_phone.as_str())
                        && existing.location.as_deref() == Some(candidate.location.as_str())
                        && existing.website_url.as_deref() == Some(candidate.website_url.as_str());
                    if !same {
                        existing.company_name = Some(candidate.company_name.clone());
                        existing.contact_phone = Some(candidate.contact_phone.clone());
                        existing.location = Some(candidate.location.clone());
                        existing.website_url = Some(candidate.website_url.clone());
                        existing.updated_at = Utc::now();
                        changed += 1;
                    }
                }
                None => {
                    leads.push(lead_from_candidate(candidate));
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn find_all(&self) -> Result<Vec<Lead>, AppError> {
        let mut leads = self.snapshot();
        leads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(leads)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, AppError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|l| ids.contains(&l.id))
            .collect())
    }

    async fn save_scores(&self, updates: &[ScoreUpdate]) -> Result<(), AppError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        let mut leads = self.leads.lock().unwrap();
        for update in updates {
            if let Some(lead) = leads.iter_mut().find(|l| l.id == update.id) {
                lead.icp_score = Some(update.icp_score);
                lead.keyword_score = Some(update.keyword_score);
                lead.outreach_angle = Some(update.outreach_angle.clone());
                lead.priority_score = Some(update.priority_score);
                lead.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn update_enrichment(&self, record: &EnrichmentRecord) -> Result<u64, AppError> {
        if self.failing_domains.lock().unwrap().contains(&record.domain) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }

        let mut leads = self.leads.lock().unwrap();
        let Some(lead) = leads.iter_mut().find(|l| l.domain == record.domain) else {
            return Ok(0);
        };

        // Provider nulls keep the stored value, like COALESCE.
        let mut merged = lead.clone();
        if let Some(phone) = &record.contact_phone {
            merged.contact_phone = Some(phone.clone());
        }
        if let Some(keywords) = &record.keywords {
            merged.keywords = keywords.clone();
        }
        if let Some(linkedin) = &record.linkedin_url {
            merged.linkedin_url = Some(linkedin.clone());
        }
        if let Some(industry) = &record.industry {
            merged.industry = Some(industry.clone());
        }
        if let Some(description) = &record.description {
            merged.description = Some(description.clone());
        }
        if let Some(n) = record.num_employees {
            merged.num_employees = Some(n);
        }

        if merged == *lead {
            return Ok(0);
        }
        merged.updated_at = Utc::now();
        *lead = merged;
        Ok(1)
    }
}

/// Directory that always lists the same companies.
pub struct FakeDirectory {
    candidates: Vec<CompanyCandidate>,
    pub calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(candidates: Vec<CompanyCandidate>) -> Self {
        Self {
            candidates,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DirectorySource for FakeDirectory {
    async fn search(&self, _query: &SearchQuery) -> Vec<CompanyCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidates.clone()
    }
}

/// Scoring backend that answers every prompt with a fixed string.
pub struct ScriptedBackend {
    response: Mutex<String>,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Mutex::new(response.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_response(&self, response: impl Into<String>) {
        *self.response.lock().unwrap() = response.into();
    }
}

#[async_trait]
impl ScoringBackend for ScriptedBackend {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().unwrap().clone())
    }
}

pub fn candidate(name: &str, domain: &str) -> CompanyCandidate {
    CompanyCandidate {
        company_name: name.to_string(),
        contact_phone: "(555) 010-2000".to_string(),
        location: "12 Main St Austin, TX".to_string(),
        website_url: format!("https://www.{}/", domain),
        domain: domain.to_string(),
    }
}

pub fn lead_from_candidate(candidate: &CompanyCandidate) -> Lead {
    let now = Utc::now();
    Lead {
        id: Uuid::new_v4(),
        company_name: Some(candidate.company_name.clone()),
        industry: None,
        location: Some(candidate.location.clone()),
        description: None,
        website_url: Some(candidate.website_url.clone()),
        domain: candidate.domain.clone(),
        num_employees: None,
        contact_phone: Some(candidate.contact_phone.clone()),
        linkedin_url: None,
        keywords: Vec::new(),
        icp_score: None,
        keyword_score: None,
        priority_score: None,
        outreach_angle: None,
        created_at: now,
        updated_at: now,
    }
}

/// One evaluation item in the shape the scoring backend returns.
pub fn evaluation_json(id: Uuid, icp: i64, keyword: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id.to_string(),
        "icpScore": icp,
        "keywordScore": keyword,
        "outreachAngle": "Offer a free maintenance audit."
    })
}

/// Enrichment client that is never expected to be reached.
pub fn unused_enrichment_client() -> EnrichmentClient {
    EnrichmentClient::new("http://127.0.0.1:9".to_string(), None).unwrap()
}

pub struct Harness {
    pub repository: Arc<InMemoryLeadRepository>,
    pub directory: Arc<FakeDirectory>,
    pub backend: Arc<ScriptedBackend>,
    pub pipeline: LeadPipeline,
}

/// Pipeline over in-memory doubles.
pub fn harness(
    candidates: Vec<CompanyCandidate>,
    enrichment: EnrichmentClient,
    scoring_response: &str,
) -> Harness {
    let repository = Arc::new(InMemoryLeadRepository::new());
    let directory = Arc::new(FakeDirectory::new(candidates));
    let backend = Arc::new(ScriptedBackend::new(scoring_response));

    let pipeline = LeadPipeline::new(
        repository.clone(),
        directory.clone(),
        enrichment,
        EvaluationEngine::new(backend.clone(), repository.clone()),
    );

    Harness {
        repository,
        directory,
        backend,
        pipeline,
    }
}
