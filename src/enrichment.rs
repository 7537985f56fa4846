//! Firmographic enrichment via the Apollo bulk organization endpoint.
//!
//! Enrichment is best-effort: transport failures, provider errors and
//! undecodable payloads are logged and produce an empty result. Only a
//! missing API key is an error, because no retry can fix it.

use crate::config::Config;
use crate::domain::normalize_domain;
use crate::errors::AppError;
use crate::models::EnrichmentRecord;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Client for the Apollo organization enrichment API.
#[derive(Clone)]
pub struct EnrichmentClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Response of `POST /organizations/bulk_enrich`.
#[derive(Debug, Deserialize)]
pub struct ApolloBulkEnrichResponse {
    /// One slot per requested domain; unknown domains come back as `null`.
    #[serde(default)]
    pub organizations: Vec<Option<ApolloOrganization>>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// The subset of an Apollo organization this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ApolloOrganization {
    pub website_url: Option<String>,
    pub phone: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub short_description: Option<String>,
    pub estimated_num_employees: Option<i64>,
}

impl ApolloOrganization {
    /// Maps the provider shape onto an [`EnrichmentRecord`].
    ///
    /// The join key is re-derived from the provider's website so it matches the
    /// domain stored on the lead. Organizations without a usable website are
    /// dropped.
    pub fn into_record(self) -> Option<EnrichmentRecord> {
        let domain = self
            .website_url
            .as_deref()
            .map(normalize_domain)
            .filter(|d| !d.is_empty())?;

        Some(EnrichmentRecord {
            domain,
            contact_phone: non_blank(self.phone),
            keywords: self.keywords,
            linkedin_url: non_blank(self.linkedin_url),
            industry: non_blank(self.industry),
            description: non_blank(self.short_description),
            num_employees: self
                .estimated_num_employees
                .and_then(|n| i32::try_from(n).ok()),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl EnrichmentClient {
    /// Creates a new `EnrichmentClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Apollo API root, e.g. `https://api.apollo.io/api/v1`.
    /// * `api_key` - Apollo key. May be absent; checked when `enrich` runs.
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Apollo client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.apollo_base_url.clone(), config.apollo_api_key.clone())
    }

    /// Enriches `domains` with one bulk provider call.
    ///
    /// Returns one record per domain the provider recognised; domains it does
    /// not know are simply absent. `domains` must be non-empty.
    ///
    /// # Errors
    ///
    /// * `AppError::Configuration` - when no API key is configured. Nothing is sent.
    pub async fn enrich(&self, domains: &[String]) -> Result<Vec<EnrichmentRecord>, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration("Apollo API key not configured".to_string()))?;

        let organizations = match self.fetch_organizations(api_key, domains).await {
            Ok(organizations) => organizations,
            Err(e) => {
                tracing::error!(
                    "Apollo enrichment failed for {} domains, continuing without it: {}",
                    domains.len(),
                    e
                );
                return Ok(Vec::new());
            }
        };

        let records: Vec<EnrichmentRecord> = organizations
            .into_iter()
            .filter_map(ApolloOrganization::into_record)
            .collect();

        let returned: HashSet<&str> = records.iter().map(|r| r.domain.as_str()).collect();
        let missing = domains
            .iter()
            .filter(|d| !returned.contains(d.as_str()))
            .count();
        if missing > 0 {
            // Unknown domains are not an error.
            tracing::debug!("Apollo returned no data for {} of {} domains", missing, domains.len());
        }

        tracing::info!(
            "Apollo enrichment returned {} records for {} domains",
            records.len(),
            domains.len()
        );
        Ok(records)
    }

    async fn fetch_organizations(
        &self,
        api_key: &str,
        domains: &[String],
    ) -> Result<Vec<ApolloOrganization>, AppError> {
        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/organizations/bulk_enrich", self.base_url),
            domains.iter().map(|d| ("domains[]", d.as_str())),
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::debug!("Apollo bulk enrich for domains: {:?}", domains);

        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key)
            .header("Cache-Control", "no-cache")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Apollo returned status {}: {}",
                status, error_text
            )));
        }

        let body: ApolloBulkEnrichResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Apollo response: {}", e))
        })?;

        if let Some(code) = body.error_code {
            return Err(AppError::ExternalApiError(format!(
                "Apollo reported {}: {}",
                code,
                body.error_message.unwrap_or_default()
            )));
        }

        Ok(body.organizations.into_iter().flatten().collect())
    }
}
