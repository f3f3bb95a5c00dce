//! Product catalog and stock mutation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OperationType, ProductId, UserId};
use ledger_store::{InventoryStore, Pagination, Product, ProductFilter, ProductUpdate};
use serde::{Deserialize, Serialize};
use stock::{ConsistencyReport, LedgerPage, NewProduct, StockChange, StockChangeOutcome};

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(flatten)]
    pub product: NewProduct,

    /// Credited with the initial stock entry.
    pub created_by: UserId,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    pub category: Option<String>,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub low_stock_only: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Body of `POST /products/{id}/stock`. Exactly one of `quantity` (absolute)
/// and `delta` (relative) must be given.
#[derive(Debug, Deserialize)]
pub struct StockChangeRequest {
    pub quantity: Option<i64>,
    pub delta: Option<i64>,
    pub user_id: UserId,
    pub reason: String,
    pub operation_type: OperationType,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: u64,
    pub offset: usize,
}

// -- Handlers --

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state
        .catalog
        .create_product(req.product, req.created_by)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiQuery(params): ApiQuery<ListProductsParams>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let filter = ProductFilter {
        category: params.category,
        location: params.location,
        supplier: params.supplier,
        low_stock_only: params.low_stock_only.unwrap_or(false),
        search: params.search,
    };
    let offset = params.offset.unwrap_or(0);
    let page = Pagination {
        limit: params.limit,
        offset,
    };

    let (products, total) = state.catalog.list_products(&filter, page).await?;
    Ok(Json(ProductListResponse {
        products,
        total,
        offset,
    }))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    Ok(Json(state.catalog.get_product(id).await?))
}

/// PATCH /products/{id}
#[tracing::instrument(skip(state, update))]
pub async fn update<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    Ok(Json(state.catalog.update_product(id, update).await?))
}

/// POST /products/{id}/stock
#[tracing::instrument(skip(state, req))]
pub async fn change_stock<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockChangeRequest>,
) -> Result<Json<StockChangeOutcome>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    let change = match (req.quantity, req.delta) {
        (Some(quantity), None) => {
            StockChange::set(id, quantity, req.user_id, req.reason, req.operation_type)
        }
        (None, Some(delta)) => {
            StockChange::adjust(id, delta, req.user_id, req.reason, req.operation_type)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "exactly one of quantity or delta is required".to_string(),
            ));
        }
    };

    Ok(Json(state.stock.apply_stock_change(change).await?))
}

/// GET /products/{id}/history
#[tracing::instrument(skip(state))]
pub async fn history<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<LedgerPage>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    let page = Pagination {
        limit: params.limit,
        offset: params.offset.unwrap_or(0),
    };
    Ok(Json(state.ledger.product_history(id, page).await?))
}

/// GET /products/{id}/consistency
#[tracing::instrument(skip(state))]
pub async fn consistency<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ConsistencyReport>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    Ok(Json(state.ledger.verify_consistency(id).await?))
}
