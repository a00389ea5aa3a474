use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::{ChatProvider, ProviderCache};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Default provider, used when a user has no stored AI settings.
    pub llm: Arc<dyn ChatProvider>,
    /// Config-keyed cache of per-user providers.
    pub providers: Arc<ProviderCache>,
    pub config: Config,
}
