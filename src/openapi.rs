use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Payments API",
        version = "0.1.0",
        description = r#"
Payments backend for the storefront: Razorpay checkout intents, callback
signature verification, order reconciliation, shipping handoff and
customer notifications.

Every response carries an explicit `success` boolean; HTTP status codes
distinguish client errors (400/404) from server-side failures (5xx).
"#
    ),
    paths(
        crate::handlers::payments::initiate_payment,
        crate::handlers::payments::verify_payment,
        crate::handlers::payments::check_payment_status,
    ),
    components(schemas(
        crate::services::payments::CheckoutRequest,
        crate::services::payments::PaymentInitiated,
        crate::services::payments::PaymentStatusReport,
        crate::services::verification::VerifyPaymentRequest,
        crate::services::verification::CallbackEcho,
        crate::services::verification::CallbackNotes,
        crate::services::verification::VerificationOutcome,
        crate::models::cart::CartItem,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "Payments", description = "Checkout intents, verification and status lookups")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, serving the generated OpenAPI document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
