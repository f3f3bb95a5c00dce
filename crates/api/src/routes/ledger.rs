//! Ledger query endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use common::{OperationType, ProductId, UserId};
use ledger_store::{InventoryStore, LedgerQuery, SortOrder};
use serde::Deserialize;
use stock::LedgerPage;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Query string of `GET /ledger`. `operation_type` accepts a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct LedgerParams {
    pub product_id: Option<String>,
    pub user_id: Option<String>,
    pub operation_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub order: Option<SortOrder>,
}

impl LedgerParams {
    fn into_query(self) -> Result<LedgerQuery, ApiError> {
        let mut query = LedgerQuery {
            from: self.from,
            to: self.to,
            limit: self.limit,
            offset: self.offset,
            order: self.order.unwrap_or_default(),
            ..LedgerQuery::default()
        };
        if let Some(raw) = self.product_id {
            query.product_id = Some(parse_id::<ProductId>("product", &raw)?);
        }
        if let Some(raw) = self.user_id {
            query.user_id = Some(parse_id::<UserId>("user", &raw)?);
        }
        if let Some(raw) = self.operation_type {
            let types = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<OperationType>()
                        .map_err(|e| ApiError::BadRequest(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if !types.is_empty() {
                query.operation_types = Some(types);
            }
        }
        Ok(query)
    }
}

/// GET /ledger
#[tracing::instrument(skip(state))]
pub async fn query<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<LedgerParams>,
) -> Result<Json<LedgerPage>, ApiError> {
    let query = params.into_query()?;
    Ok(Json(state.ledger.query(query).await?))
}
