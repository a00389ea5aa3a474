#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A stored job description. `parsed_requirements` holds the structured
/// JobRequirements JSON produced by the JD parser; NULL until parsing
/// completes. The `match_score` / `matched_resume_id` / `last_matched_at`
/// columns are denormalized copies of the latest match for list rendering;
/// the authoritative per-pair record is `JobMatchRow`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobDescriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: String,
    pub parsed_requirements: Option<Value>,
    pub url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub match_score: Option<i32>,
    pub matched_resume_id: Option<Uuid>,
    pub last_matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted match record, one per (user, resume, job description) triple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobMatchRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub job_description_id: Uuid,
    pub match_score: i32,
    pub match_breakdown: Option<Value>,
    pub match_reasons: Option<Vec<String>>,
    pub missing_skills: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}
