//! Report generation endpoint.

use std::sync::Arc;

use analytics::{Report, ReportOptions, ReportType};
use axum::Json;
use axum::extract::{Path, State};
use ledger_store::InventoryStore;

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// GET /reports/{report_type}
#[tracing::instrument(skip(state, opts))]
pub async fn generate<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(report_type): Path<String>,
    ApiQuery(opts): ApiQuery<ReportOptions>,
) -> Result<Json<Report>, ApiError> {
    let report_type: ReportType = report_type
        .parse()
        .map_err(|_| ApiError::NotFound(format!("unknown report type: {report_type}")))?;
    Ok(Json(state.reports.generate(report_type, &opts).await?))
}
