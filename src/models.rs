use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// A prospective business lead.
///
/// Uniquely keyed by `domain`. Created by a directory search, then filled in by
/// enrichment (firmographic fields) and evaluation (scored fields).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Unique identifier for the lead.
    pub id: Uuid,
    /// Company display name as listed in the directory.
    pub company_name: Option<String>,
    /// Industry reported by the enrichment provider.
    pub industry: Option<String>,
    /// Street address and locality.
    pub location: Option<String>,
    /// Short company description.
    pub description: Option<String>,
    /// Website URL as scraped.
    pub website_url: Option<String>,
    /// Normalized registrable domain; the business key.
    pub domain: String,
    /// Estimated head count.
    pub num_employees: Option<i32>,
    /// Main contact phone.
    pub contact_phone: Option<String>,
    /// Company LinkedIn page.
    pub linkedin_url: Option<String>,
    /// Provider keywords describing the company.
    pub keywords: Vec<String>,
    /// Ideal-customer-profile fit, 0-100.
    pub icp_score: Option<i32>,
    /// Keyword relevance, 1-5.
    pub keyword_score: Option<i32>,
    /// Composite ranking score. Derived from the two scores above.
    pub priority_score: Option<f64>,
    /// Suggested outreach angle.
    pub outreach_angle: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last mutating write.
    pub updated_at: DateTime<Utc>,
}

// ============ Pipeline Records ============

/// A company listing extracted from a directory search page, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCandidate {
    pub company_name: String,
    pub contact_phone: String,
    pub location: String,
    pub website_url: String,
    pub domain: String,
}

/// Firmographic data for one domain, mapped from the enrichment provider.
///
/// `None` fields were not returned by the provider and leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRecord {
    pub domain: String,
    pub contact_phone: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub num_employees: Option<i32>,
}

/// Validated scores for one lead, produced by the evaluation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub lead_id: Uuid,
    pub icp_score: i32,
    pub keyword_score: i32,
    pub outreach_angle: String,
}

/// Field-level write applied to a lead after evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub id: Uuid,
    pub icp_score: i32,
    pub keyword_score: i32,
    pub outreach_angle: String,
    pub priority_score: f64,
}

/// Aggregate outcome of one enrichment round. Logged, not returned to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Domains submitted to the provider.
    pub requested: usize,
    /// Records the provider recognised.
    pub returned: usize,
    /// Leads whose stored fields changed.
    pub updated: usize,
    /// Records that matched no stored lead, or changed nothing.
    pub unchanged: usize,
    /// Updates that failed at the storage layer.
    pub failed: usize,
}

// ============ Request Models ============

/// Directory search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub industry: String,
    pub location: String,
}

/// Body of `POST /leads/enrich`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichRequest {
    pub domains: Vec<String>,
}

/// Body of `POST /leads/evaluate`.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub ids: Vec<Uuid>,
}
