//! Lead pipeline.
//!
//! Wires the directory, the repository, the enrichment client and the
//! evaluation engine into the operations exposed over HTTP. Every collaborator
//! is handed in through [`LeadPipeline::new`].

use crate::db_storage::LeadRepository;
use crate::directory::DirectorySource;
use crate::enrichment::EnrichmentClient;
use crate::errors::{AppError, ResultExt};
use crate::evaluation::EvaluationEngine;
use crate::export::leads_to_csv;
use crate::models::{CompanyCandidate, EnrichmentSummary, Lead, SearchQuery};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct LeadPipeline {
    repository: Arc<dyn LeadRepository>,
    directory: Arc<dyn DirectorySource>,
    enrichment: EnrichmentClient,
    evaluator: EvaluationEngine,
}

impl LeadPipeline {
    pub fn new(
        repository: Arc<dyn LeadRepository>,
        directory: Arc<dyn DirectorySource>,
        enrichment: EnrichmentClient,
        evaluator: EvaluationEngine,
    ) -> Self {
        Self {
            repository,
            directory,
            enrichment,
            evaluator,
        }
    }

    /// Scrapes the directory for `query` and stores what it finds.
    ///
    /// Returns the number of leads inserted or changed. An empty scrape is a
    /// successful no-op.
    pub async fn search(&self, query: &SearchQuery) -> Result<u64, AppError> {
        if query.industry.trim().is_empty() || query.location.trim().is_empty() {
            return Err(AppError::BadRequest(
                "industry and location are required".to_string(),
            ));
        }

        let scraped = self.directory.search(query).await;
        let candidates = dedup_by_domain(scraped);
        if candidates.is_empty() {
            tracing::info!(
                "No companies found for industry='{}' location='{}'",
                query.industry,
                query.location
            );
            return Ok(0);
        }

        self.repository
            .upsert(&candidates)
            .await
            .with_context(|| {
                format!(
                    "Storing search results for '{}' in '{}'",
                    query.industry, query.location
                )
            })
    }

    /// Enriches the leads stored under `domains`.
    ///
    /// Each provider record is applied independently; a failed update is
    /// counted and logged without stopping the rest.
    pub async fn enrich(&self, domains: &[String]) -> Result<EnrichmentSummary, AppError> {
        if domains.is_empty() {
            return Err(AppError::BadRequest("domains must not be empty".to_string()));
        }
        if domains.iter().any(|d| d.trim().is_empty()) {
            return Err(AppError::BadRequest(
                "domains must not contain blank entries".to_string(),
            ));
        }

        let records = self.enrichment.enrich(domains).await?;

        let mut summary = EnrichmentSummary {
            requested: domains.len(),
            returned: records.len(),
            ..Default::default()
        };

        let outcomes = join_all(
            records
                .iter()
                .map(|record| self.repository.update_enrichment(record)),
        )
        .await;

        for (record, outcome) in records.iter().zip(outcomes) {
            match outcome {
                Ok(0) => summary.unchanged += 1,
                Ok(_) => summary.updated += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Enrichment update failed for {}: {}", record.domain, e);
                }
            }
        }

        tracing::info!(
            "Enrichment finished: requested={} returned={} updated={} unchanged={} failed={}",
            summary.requested,
            summary.returned,
            summary.updated,
            summary.unchanged,
            summary.failed
        );

        Ok(summary)
    }

    /// Scores the leads with the given ids and saves the scores.
    ///
    /// Unknown ids are ignored; if none of them exist the call fails with
    /// `NotFound`. Returns the number of leads scored.
    pub async fn evaluate(&self, ids: &[Uuid]) -> Result<usize, AppError> {
        if ids.is_empty() {
            return Err(AppError::BadRequest("ids must not be empty".to_string()));
        }

        let leads = self.repository.find_by_ids(ids).await?;
        if leads.is_empty() {
            return Err(AppError::NotFound(
                "No leads found for the given ids".to_string(),
            ));
        }
        if leads.len() < ids.len() {
            tracing::warn!(
                "Evaluating {} of {} requested leads; the rest do not exist",
                leads.len(),
                ids.len()
            );
        }

        let saved = self
            .evaluator
            .evaluate_and_save(&leads)
            .await
            .with_context(|| format!("Evaluating {} leads", leads.len()))?;

        Ok(saved.len())
    }

    /// All stored leads, most recently updated first.
    pub async fn list(&self) -> Result<Vec<Lead>, AppError> {
        self.repository.find_all().await
    }

    /// CSV rendering of [`list`](Self::list).
    pub async fn export(&self) -> Result<Vec<u8>, AppError> {
        let leads = self.repository.find_all().await?;
        tracing::info!("Exporting {} leads", leads.len());
        leads_to_csv(&leads)
    }
}

/// Collapses candidates that share a domain.
///
/// The last occurrence of a domain supplies the values; the position of its
/// first occurrence is kept. Candidates without a domain are dropped.
pub fn dedup_by_domain(candidates: Vec<CompanyCandidate>) -> Vec<CompanyCandidate> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CompanyCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if candidate.domain.is_empty() {
            continue;
        }
        match position.get(&candidate.domain) {
            Some(&index) => unique[index] = candidate,
            None => {
                position.insert(candidate.domain.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }

    unique
}
