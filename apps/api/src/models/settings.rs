use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user AI provider settings. When present, matching runs through the
/// user's chosen provider/model instead of the service default.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAiSettingsRow {
    pub user_id: Uuid,
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub updated_at: DateTime<Utc>,
}
