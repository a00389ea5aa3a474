//! LLM match client — sends one batch prompt through a `ChatProvider` and
//! strict-parses the reply into raw match objects.
//!
//! Models are unreliable JSON emitters: keys drift (`id` for `jobId`,
//! `relevanceScore` for `matchScore`), sub-scores go missing, and whole
//! replies occasionally come back as prose. Parsing is therefore schema-first
//! with aliases and defaults, and a reply that fails to parse contributes an
//! empty batch instead of aborting the run.

use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::{strip_json_fences, ChatProvider};
use crate::matching::models::{CandidateProfile, JobPosting, MatchingCriteria};
use crate::matching::prompts::{build_match_prompt, MATCH_SYSTEM};

/// One match object as the model returned it, before normalization.
/// Field aliases absorb the known key-drift cases.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLlmMatch {
    /// `jobId` preferred; `id` accepted when the model echoes the input key.
    #[serde(default, alias = "id")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// `relevanceScore` is treated as an alias of `matchScore`.
    #[serde(default, alias = "relevanceScore")]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub skills_score: Option<f64>,
    #[serde(default)]
    pub experience_score: Option<f64>,
    #[serde(default)]
    pub education_score: Option<f64>,
    #[serde(default)]
    pub location_score: Option<f64>,
}

/// Rounds and clamps a raw model score into [0, 100]. Missing scores are 0.
pub fn clamp_score(raw: Option<f64>) -> u32 {
    raw.map(|v| v.round().clamp(0.0, 100.0) as u32).unwrap_or(0)
}

/// Parses the model's reply text into raw matches. A non-JSON or
/// wrong-shaped reply yields an empty list, never an error.
pub fn parse_matches(text: &str) -> Vec<RawLlmMatch> {
    let cleaned = strip_json_fences(text);
    match serde_json::from_str::<Vec<RawLlmMatch>>(cleaned) {
        Ok(matches) => matches,
        Err(e) => {
            warn!(
                "Match reply was not a valid match array ({e}); treating batch as empty. \
                Reply head: {:?}",
                cleaned.chars().take(120).collect::<String>()
            );
            Vec::new()
        }
    }
}

/// Sends one batch of jobs through the provider and returns the parsed raw
/// matches. Transport/API errors propagate so the orchestrator can isolate
/// the failed batch; parse failures degrade to an empty batch here.
pub async fn request_batch_matches(
    provider: &dyn ChatProvider,
    profile: &CandidateProfile,
    jobs: &[JobPosting],
    criteria: Option<&MatchingCriteria>,
) -> Result<Vec<RawLlmMatch>, AppError> {
    let prompt = build_match_prompt(profile, jobs, criteria)?;

    let reply = provider
        .query(&prompt, MATCH_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Match LLM call failed: {e}")))?;

    Ok(parse_matches(&reply))
}
