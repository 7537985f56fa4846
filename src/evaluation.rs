//! Lead evaluation.
//!
//! A batch of leads is scored in one call to a generative backend. The backend
//! must answer with exactly one evaluation per lead, in submission order; any
//! deviation fails the whole batch so that one search round is always scored
//! consistently.

use crate::config::Config;
use crate::db_storage::LeadRepository;
use crate::errors::AppError;
use crate::models::{EvaluationResult, Lead, ScoreUpdate};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// Weight of the ICP score in the priority blend.
pub const ICP_WEIGHT: f64 = 0.6;
/// Weight of the keyword score in the priority blend.
pub const KEYWORD_WEIGHT: f64 = 0.4;
/// Maps the 1-5 keyword scale onto the 0-100 ICP scale.
pub const KEYWORD_SCALE: f64 = 20.0;

pub const ICP_SCORE_RANGE: std::ops::RangeInclusive<i64> = 0..=100;
pub const KEYWORD_SCORE_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

const SCORING_TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "\
You qualify companies as B2B sales leads. For every company you are given, \
return an object with:\n\
- id: the company id exactly as given (string)\n\
- icpScore: ideal customer profile fit from 0 to 100 (integer), considering \
industry, description, employee count and keywords\n\
- keywordScore: keyword relevance from 1 to 5 (integer)\n\
- outreachAngle: a personalised outreach suggestion, under 200 words (string)\n\
Respond with JSON only, shaped as {\"evaluations\": [...]}, with one entry per \
company in the same order as the companies are listed.";

/// Composite ranking score.
///
/// `icp * 0.6 + keyword * 20 * 0.4`: the keyword score is stretched onto the
/// ICP scale before blending. Changing the weights changes ranking semantics.
pub fn priority_score(icp_score: i32, keyword_score: i32) -> f64 {
    f64::from(icp_score) * ICP_WEIGHT + f64::from(keyword_score) * KEYWORD_SCALE * KEYWORD_WEIGHT
}

/// Text-completion backend used for scoring.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    /// Sends one prompt and returns the raw model output.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AppError>;
}

/// Scoring backend speaking the OpenAI chat-completions protocol.
///
/// Defaults to Gemini's OpenAI-compatible endpoint.
pub struct OpenAiScoringBackend {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiScoringBackend {
    pub fn new(api_base: &str, api_key: Option<String>, model: String) -> Self {
        let client = api_key.filter(|k| !k.trim().is_empty()).map(|key| {
            Client::with_config(
                OpenAIConfig::new()
                    .with_api_base(api_base)
                    .with_api_key(key),
            )
        });

        Self { client, model }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.llm_base_url,
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        )
    }
}

#[async_trait]
impl ScoringBackend for OpenAiScoringBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AppError> {
        let client = self.client.as_ref().ok_or_else(|| {
            AppError::Configuration("Generative backend API key not configured".to_string())
        })?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .temperature(SCORING_TEMPERATURE)
            .response_format(ResponseFormat::JsonObject)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| AppError::InternalError(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| AppError::InternalError(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        let response = client.chat().create(request).await.map_err(|e| {
            AppError::ExternalApiError(format!("Scoring backend request failed: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Scoring("Scoring backend returned no content".to_string()))
    }
}

/// One item of the backend's answer, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    id: String,
    icp_score: i64,
    keyword_score: i64,
    outreach_angle: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EvaluationPayload {
    Wrapped { evaluations: Vec<RawEvaluation> },
    Bare(Vec<RawEvaluation>),
}

/// Scores leads through a [`ScoringBackend`] and persists the results.
#[derive(Clone)]
pub struct EvaluationEngine {
    backend: Arc<dyn ScoringBackend>,
    repository: Arc<dyn LeadRepository>,
}

impl EvaluationEngine {
    pub fn new(backend: Arc<dyn ScoringBackend>, repository: Arc<dyn LeadRepository>) -> Self {
        Self {
            backend,
            repository,
        }
    }

    /// Scores `leads` in one backend call.
    ///
    /// The result has the same length and order as `leads`.
    pub async fn evaluate(&self, leads: &[Lead]) -> Result<Vec<EvaluationResult>, AppError> {
        if leads.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(leads);
        tracing::info!("Evaluating {} leads", leads.len());

        let raw = self.backend.complete(SYSTEM_PROMPT, &prompt).await?;
        tracing::debug!("Scoring backend output: {}", raw);

        parse_evaluations(&raw, leads)
    }

    /// Scores `leads` and writes the scores back, all or nothing.
    pub async fn evaluate_and_save(&self, leads: &[Lead]) -> Result<Vec<ScoreUpdate>, AppError> {
        let updates: Vec<ScoreUpdate> = self
            .evaluate(leads)
            .await?
            .into_iter()
            .map(|evaluation| ScoreUpdate {
                id: evaluation.lead_id,
                priority_score: priority_score(evaluation.icp_score, evaluation.keyword_score),
                icp_score: evaluation.icp_score,
                keyword_score: evaluation.keyword_score,
                outreach_angle: evaluation.outreach_angle,
            })
            .collect();

        if !updates.is_empty() {
            self.repository.save_scores(&updates).await?;
        }

        Ok(updates)
    }
}

/// Lists the leads for the backend, one numbered block per company.
pub fn build_prompt(leads: &[Lead]) -> String {
    fn or_na(value: Option<&str>) -> &str {
        value.filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
    }

    let mut prompt = String::from("Companies:\n");
    for (index, lead) in leads.iter().enumerate() {
        let keywords = if lead.keywords.is_empty() {
            "N/A".to_string()
        } else {
            lead.keywords.join(", ")
        };
        let employees = lead
            .num_employees
            .map(|n| n.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        // Writing to a String cannot fail.
        let _ = write!(
            prompt,
            "\n{}. {}\nCompany ID: {}\nWebsite: {}\nIndustry: {}\nLocation: {}\nDescription: {}\nNum Employees: {}\nKeywords: {}\n",
            index + 1,
            or_na(lead.company_name.as_deref()),
            lead.id,
            or_na(lead.website_url.as_deref()),
            or_na(lead.industry.as_deref()),
            or_na(lead.location.as_deref()),
            or_na(lead.description.as_deref()),
            employees,
            keywords,
        );
    }
    prompt
}

/// Validates the backend's answer against the submitted leads.
///
/// Items are matched by position. Wrong length, missing fields, wrong types or
/// out-of-range scores reject the whole batch.
pub fn parse_evaluations(raw: &str, leads: &[Lead]) -> Result<Vec<EvaluationResult>, AppError> {
    let payload: EvaluationPayload = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| AppError::Scoring(format!("Unparseable scoring response: {}", e)))?;

    let items = match payload {
        EvaluationPayload::Wrapped { evaluations } => evaluations,
        EvaluationPayload::Bare(items) => items,
    };

    if items.len() != leads.len() {
        return Err(AppError::Scoring(format!(
            "Expected {} evaluations, got {}",
            leads.len(),
            items.len()
        )));
    }

    items
        .into_iter()
        .zip(leads)
        .enumerate()
        .map(|(position, (item, lead))| {
            if item.id.trim() != lead.id.to_string() {
                tracing::warn!(
                    "Evaluation {} carries id '{}' but was submitted as {}; applying by position",
                    position + 1,
                    item.id,
                    lead.id
                );
            }
            if !ICP_SCORE_RANGE.contains(&item.icp_score) {
                return Err(AppError::Scoring(format!(
                    "icpScore {} out of range for evaluation {}",
                    item.icp_score,
                    position + 1
                )));
            }
            if !KEYWORD_SCORE_RANGE.contains(&item.keyword_score) {
                return Err(AppError::Scoring(format!(
                    "keywordScore {} out of range for evaluation {}",
                    item.keyword_score,
                    position + 1
                )));
            }

            Ok(EvaluationResult {
                lead_id: lead.id,
                // Both ranges fit in i32.
                icp_score: item.icp_score as i32,
                keyword_score: item.keyword_score as i32,
                outreach_angle: item.outreach_angle.trim().to_string(),
            })
        })
        .collect()
}

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.strip_suffix("```").unwrap_or(rest);
            // Drop the info string ("json") on the opening line.
            match body.find('\n') {
                Some(newline) => body[newline + 1..].trim(),
                None => body.trim(),
            }
        }
        None => trimmed,
    }
}
