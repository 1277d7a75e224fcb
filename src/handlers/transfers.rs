use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    access::AuthenticatedActor,
    errors::ServiceError,
    handlers::common::{created_response, success_response, PaginatedResponse, PaginationParams},
    services::transfers::{
        CreateTransferInput, TransferFilters, UpdateTransferInput, VerifyTransferInput,
    },
    AppState,
};

/// Create the transfers router
pub fn transfers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transfer).get(list_transfers))
        .route(
            "/:id",
            get(get_transfer)
                .put(update_transfer)
                .delete(cancel_transfer),
        )
        .route("/:id/check", post(check_transfer))
        .route("/:id/send", post(send_transfer))
        .route("/:id/arrive", post(mark_arrived))
        .route("/:id/verify", post(verify_transfer))
        .route("/:id/complete", post(complete_transfer))
}

/// Create a stock transfer (status `draft`)
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferInput,
    responses(
        (status = 201, description = "Transfer created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Location or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(input): Json<CreateTransferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.transfers.create_transfer(&actor, input).await?;
    Ok(created_response(detail))
}

/// List transfers visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(TransferFilters, PaginationParams),
    responses(
        (status = 200, description = "Transfer page returned"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Query(filters): Query<TransferFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (rows, total) = state
        .services
        .transfers
        .list_transfers(&actor, filters, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Fetch one transfer with items, workflow history, and effective SOD settings
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer returned"),
        (status = 403, description = "Not assigned to either endpoint", body = crate::errors::ErrorResponse),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.transfers.get_transfer(&actor, id).await?;
    Ok(success_response(detail))
}

/// Edit a draft transfer's date or notes
#[utoipa::path(
    put,
    path = "/api/v1/transfers/{id}",
    request_body = UpdateTransferInput,
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer updated"),
        (status = 400, description = "Past the editable state", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn update_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTransferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state
        .services
        .transfers
        .update_transfer(&actor, id, input)
        .await?;
    Ok(success_response(detail))
}

/// Approve a draft for dispatch
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/check",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer checked"),
        (status = 403, description = "SOD violation", body = crate::errors::ErrorResponse),
        (status = 409, description = "Wrong status", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn check_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.transfers.check_transfer(&actor, id).await?;
    Ok(success_response(detail))
}

/// Dispatch: deducts source stock and puts serials in transit
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/send",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer dispatched"),
        (status = 403, description = "SOD violation", body = crate::errors::ErrorResponse),
        (status = 409, description = "Wrong status", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn send_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.transfers.send_transfer(&actor, id).await?;
    Ok(success_response(detail))
}

/// Record physical arrival at the destination
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/arrive",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Arrival recorded"),
        (status = 409, description = "Wrong status", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn mark_arrived(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.transfers.mark_arrived(&actor, id).await?;
    Ok(success_response(detail))
}

/// Count the delivery and record received quantities
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/verify",
    request_body = VerifyTransferInput,
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Counts recorded"),
        (status = 400, description = "Invalid receipts", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn verify_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(input): Json<VerifyTransferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state
        .services
        .transfers
        .verify_transfer(&actor, id, input)
        .await?;
    Ok(success_response(detail))
}

/// Finalize: credits destination stock and restocks serials there
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/complete",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer completed"),
        (status = 403, description = "SOD violation", body = crate::errors::ErrorResponse),
        (status = 409, description = "Wrong status", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn complete_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state
        .services
        .transfers
        .complete_transfer(&actor, id)
        .await?;
    Ok(success_response(detail))
}

/// Cancel a transfer; a dispatched one is compensated back into source stock
#[utoipa::path(
    delete,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer cancelled"),
        (status = 409, description = "Already delivered or cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn cancel_transfer(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.transfers.cancel_transfer(&actor, id).await?;
    Ok(success_response(detail))
}
