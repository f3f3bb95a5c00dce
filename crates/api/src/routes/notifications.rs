//! Notification listing and acknowledgement.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::NotificationId;
use ledger_store::{InventoryStore, Notification};
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsParams {
    pub unread_only: Option<bool>,
    pub limit: Option<usize>,
}

/// GET /notifications
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<ListNotificationsParams>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state
        .notifications
        .list(
            params.unread_only.unwrap_or(false),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;
    Ok(Json(notifications))
}

/// POST /notifications/{id}/read
#[tracing::instrument(skip(state))]
pub async fn mark_read<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: NotificationId = parse_id("notification", &id)?;
    state.notifications.mark_read(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
