//! Axum route handlers for the Matching API.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::llm_client::{ChatProvider, ProviderKind};
use crate::matching::matcher::{extract_matching_criteria, match_jobs_to_profile};
use crate::matching::models::{CandidateProfile, JobPosting, MatchResult, MatchingCriteria};
use crate::matching::persistence::save_matches;
use crate::matching::scoring::calculate_detailed_match_score;
use crate::models::job::JobDescriptionRow;
use crate::models::resume::ResumeRow;
use crate::models::settings::UserAiSettingsRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchJobsRequest {
    pub resume_id: Option<Uuid>,
    #[serde(default)]
    pub job_description_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub match_all: bool,
    /// Optional criteria overrides embedded into the match prompt.
    #[serde(default)]
    pub criteria: Option<MatchingCriteria>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUsed {
    pub id: Uuid,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchJobsResponse {
    pub success: bool,
    pub matches: Vec<MatchResult>,
    pub resume_used: ResumeUsed,
    pub total_jobs_analyzed: usize,
    pub total_matches: usize,
    pub saved_matches: usize,
    pub ai_model: String,
    /// True when at least one batch failed; distinguishes a provider outage
    /// from "no jobs met the threshold".
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreQuery {
    pub resume_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub job_id: Uuid,
    pub match_score: u32,
    pub skills_score: u32,
    pub experience_score: u32,
    pub education_score: u32,
    pub location_score: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractCriteriaRequest {
    pub resume_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractCriteriaResponse {
    pub criteria: MatchingCriteria,
    pub ai_model: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/match
///
/// Full matching pipeline: load profile + jobs → batched LLM scoring →
/// persist match rows → sorted response. A provider outage degrades to an
/// empty match list; it never fails the request.
pub async fn handle_match_jobs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<MatchJobsRequest>,
) -> Result<Json<MatchJobsResponse>, AppError> {
    let resume_id = request
        .resume_id
        .ok_or_else(|| AppError::Validation("resumeId is required".to_string()))?;

    let (resume, profile) = load_parsed_resume(&state, user_id, resume_id).await?;

    // matchAll wins over any id subset the client also sent
    let requested_ids = if request.match_all {
        None
    } else {
        request.job_description_ids.as_deref()
    };
    let jobs = load_job_postings(&state, user_id, requested_ids).await?;
    let total_jobs_analyzed = jobs.len();

    info!(
        "Matching resume {} against {} jobs for user {}",
        resume_id, total_jobs_analyzed, user_id
    );

    let provider = select_provider(&state, user_id).await;

    let run =
        match_jobs_to_profile(provider.as_ref(), &profile, &jobs, request.criteria.as_ref()).await;

    let saved_matches = save_matches(&state.db, user_id, resume_id, &run.matches).await;

    Ok(Json(MatchJobsResponse {
        success: true,
        total_matches: run.matches.len(),
        saved_matches,
        total_jobs_analyzed,
        ai_model: provider.model().to_string(),
        degraded: run.degraded,
        resume_used: ResumeUsed {
            id: resume.id,
            file_name: resume.file_name,
        },
        matches: run.matches,
    }))
}

/// GET /api/v1/jobs/match/score?resumeId=..&jobId=..
///
/// Deterministic breakdown for one resume/job pair — no LLM call.
pub async fn handle_score_pair(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<ScoreResponse>, AppError> {
    let (_, profile) = load_parsed_resume(&state, user_id, query.resume_id).await?;

    let row = sqlx::query_as::<_, JobDescriptionRow>(
        "SELECT * FROM job_descriptions WHERE id = $1 AND user_id = $2",
    )
    .bind(query.job_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Job description {} not found", query.job_id)))?;

    let job = JobPosting::from(row);
    let (match_score, breakdown) = calculate_detailed_match_score(&profile, &job);

    Ok(Json(ScoreResponse {
        job_id: job.id,
        match_score,
        skills_score: breakdown.skills_score,
        experience_score: breakdown.experience_score,
        education_score: breakdown.education_score,
        location_score: breakdown.location_score,
    }))
}

/// POST /api/v1/jobs/match/criteria
///
/// Derives implied matching preferences from a resume profile. Always
/// succeeds: an LLM failure falls back to profile-derived defaults.
pub async fn handle_extract_criteria(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<ExtractCriteriaRequest>,
) -> Result<Json<ExtractCriteriaResponse>, AppError> {
    let resume_id = request
        .resume_id
        .ok_or_else(|| AppError::Validation("resumeId is required".to_string()))?;

    let (_, profile) = load_parsed_resume(&state, user_id, resume_id).await?;

    let provider = select_provider(&state, user_id).await;
    let criteria = extract_matching_criteria(provider.as_ref(), &profile).await;

    Ok(Json(ExtractCriteriaResponse {
        criteria,
        ai_model: provider.model().to_string(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Shared loading helpers
// ────────────────────────────────────────────────────────────────────────────

/// Loads the resume row and its parsed profile. Missing row and unparsed
/// resume both surface as 404 — the caller cannot match either way.
async fn load_parsed_resume(
    state: &AppState,
    user_id: Uuid,
    resume_id: Uuid,
) -> Result<(ResumeRow, CandidateProfile), AppError> {
    let resume =
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(resume_id)
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    let parsed = resume.parsed_profile.clone().ok_or_else(|| {
        AppError::NotFound(format!(
            "Resume {resume_id} has not been parsed yet; upload processing may still be running"
        ))
    })?;

    let profile: CandidateProfile = serde_json::from_value(parsed)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored profile is malformed: {e}")))?;

    Ok((resume, profile))
}

/// Loads the user's job postings, either the requested subset or all of them.
async fn load_job_postings(
    state: &AppState,
    user_id: Uuid,
    ids: Option<&[Uuid]>,
) -> Result<Vec<JobPosting>, AppError> {
    let rows = match ids {
        Some(ids) if !ids.is_empty() => {
            sqlx::query_as::<_, JobDescriptionRow>(
                "SELECT * FROM job_descriptions WHERE user_id = $1 AND id = ANY($2) ORDER BY created_at",
            )
            .bind(user_id)
            .bind(ids)
            .fetch_all(&state.db)
            .await?
        }
        _ => {
            sqlx::query_as::<_, JobDescriptionRow>(
                "SELECT * FROM job_descriptions WHERE user_id = $1 ORDER BY created_at",
            )
            .bind(user_id)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(rows.into_iter().map(JobPosting::from).collect())
}

/// Picks the provider for this user: stored settings when present and valid,
/// otherwise the service default.
async fn select_provider(state: &AppState, user_id: Uuid) -> Arc<dyn ChatProvider> {
    let settings = sqlx::query_as::<_, UserAiSettingsRow>(
        "SELECT * FROM user_ai_settings WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await;

    match settings {
        Ok(Some(row)) => match row.provider.parse::<ProviderKind>() {
            Ok(kind) => state.providers.get_or_create(kind, &row.model, &row.api_key),
            Err(e) => {
                warn!("User {user_id} has invalid provider settings ({e}); using default");
                Arc::clone(&state.llm)
            }
        },
        Ok(None) => Arc::clone(&state.llm),
        Err(e) => {
            warn!("Failed to load AI settings for user {user_id} ({e}); using default");
            Arc::clone(&state.llm)
        }
    }
}
