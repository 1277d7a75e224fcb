use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    access::{perm, AuthenticatedActor},
    errors::ServiceError,
    events::ActorContext,
    handlers::common::{success_response, PaginatedResponse, PaginationParams},
    AppState,
};

pub fn stock_router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(get_balance))
        .route("/ledger", get(list_ledger))
        .route("/adjust", post(adjust_stock))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StockQuery {
    pub variation_id: Uuid,
    pub location_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub variation_id: Uuid,
    pub location_id: Uuid,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub location_id: Uuid,
    /// Signed: positive receives stock, negative writes it off.
    pub quantity: Decimal,
}

/// Current balance of a variation at a location
#[utoipa::path(
    get,
    path = "/api/v1/stock/balance",
    params(StockQuery),
    responses(
        (status = 200, description = "Balance returned", body = BalanceResponse),
        (status = 403, description = "Location not accessible", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_balance(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Query(query): Query<StockQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require(perm::STOCK_READ)?;
    state
        .services
        .locations
        .require_source_access(&actor, query.location_id)
        .await?;

    let balance = state
        .services
        .stock_ledger
        .balance(&*state.db, query.variation_id, query.location_id)
        .await?;

    Ok(success_response(BalanceResponse {
        variation_id: query.variation_id,
        location_id: query.location_id,
        balance,
    }))
}

/// Ledger entries for a variation at a location, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock/ledger",
    params(StockQuery, PaginationParams),
    responses(
        (status = 200, description = "Ledger page returned"),
        (status = 403, description = "Location not accessible", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_ledger(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Query(query): Query<StockQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require(perm::STOCK_READ)?;
    state
        .services
        .locations
        .require_source_access(&actor, query.location_id)
        .await?;

    let (entries, total) = state
        .services
        .stock_ledger
        .entries(
            actor.business_id,
            query.variation_id,
            query.location_id,
            pagination.page,
            pagination.per_page,
        )
        .await?;

    Ok(success_response(PaginatedResponse::new(
        entries,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Manual stock correction or opening balance
#[utoipa::path(
    post,
    path = "/api/v1/stock/adjust",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Adjustment posted"),
        (status = 400, description = "Invalid adjustment", body = crate::errors::ErrorResponse),
        (status = 422, description = "Would drive stock negative", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(input): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require(perm::STOCK_ADJUST)?;
    state
        .services
        .locations
        .require_source_access(&actor, input.location_id)
        .await?;

    let entry = state
        .services
        .stock_ledger
        .record_adjustment(
            ActorContext::from_actor(&actor),
            actor.business_id,
            input.product_id,
            input.variation_id,
            input.location_id,
            input.quantity,
        )
        .await?;

    Ok(success_response(entry))
}
