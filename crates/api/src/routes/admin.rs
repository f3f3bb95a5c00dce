//! Maintenance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use ledger_store::InventoryStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PurgeParams {
    /// Defaults to the configured retention floor.
    pub min_age_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
    pub min_age_days: i64,
}

/// POST /admin/ledger/purge
#[tracing::instrument(skip(state))]
pub async fn purge_ledger<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<PurgeParams>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let min_age_days = params.min_age_days.unwrap_or(state.retention_days);
    let removed = state.ledger.purge_expired(min_age_days).await?;
    Ok(Json(PurgeResponse {
        removed,
        min_age_days,
    }))
}
