use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storeflow API",
        version = "0.3.0",
        description = r#"
# Storeflow Stock Transfer API

Moves quantified and serialized inventory between business locations under a
multi-step approval workflow, segregation-of-duties control, and an
append-only stock ledger.

## Identity

The caller is authenticated upstream; the gateway forwards the actor record
in trusted headers (`X-Actor-Id`, `X-Business-Id`, `X-Actor-Name`,
`X-Actor-Permissions`).

## Error Handling

Errors use consistent JSON bodies with appropriate status codes: validation
400, authorization 403, not found 404, state conflicts 409, insufficient
stock 422.
        "#,
        contact(
            name = "Storeflow Engineering",
            email = "engineering@storeflow.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "transfers", description = "Stock transfer workflow"),
        (name = "stock", description = "Stock ledger reads and adjustments"),
        (name = "health", description = "Service health")
    ),
    paths(
        crate::handlers::transfers::create_transfer,
        crate::handlers::transfers::list_transfers,
        crate::handlers::transfers::get_transfer,
        crate::handlers::transfers::update_transfer,
        crate::handlers::transfers::check_transfer,
        crate::handlers::transfers::send_transfer,
        crate::handlers::transfers::mark_arrived,
        crate::handlers::transfers::verify_transfer,
        crate::handlers::transfers::complete_transfer,
        crate::handlers::transfers::cancel_transfer,
        crate::handlers::stock::get_balance,
        crate::handlers::stock::list_ledger,
        crate::handlers::stock::adjust_stock,
        crate::handlers::health::health,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::stock_transfer::TransferStatus,
        crate::entities::transfer_step_event::TransferStep,
        crate::entities::serial_number::SerialStatus,
        crate::entities::stock_ledger_entry::LedgerEntryType,
        crate::services::transfers::CreateTransferInput,
        crate::services::transfers::TransferItemInput,
        crate::services::transfers::UpdateTransferInput,
        crate::services::transfers::VerifyTransferInput,
        crate::services::transfers::ReceiptInput,
        crate::handlers::stock::AdjustStockRequest,
        crate::handlers::stock::BalanceResponse,
        crate::handlers::health::HealthResponse,
    ))
)]
pub struct ApiDoc;

/// Swagger UI mount, served at `/docs` with the spec at
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
