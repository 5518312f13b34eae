use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::payments::{CheckoutRequest, PaymentInitiated, PaymentStatusReport};
use crate::services::verification::{VerificationOutcome, VerifyPaymentRequest};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};

/// Initiate a payment: validate checkout input, persist the pending order
/// and create the provider payment intent.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Payment initiated", body = PaymentInitiated),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<PaymentInitiated>, ServiceError> {
    let response = state.services.payments.initiate(request).await?;
    Ok(Json(response))
}

/// Verify a payment callback: signature check, authoritative provider
/// status fetch, order reconciliation and downstream side effects.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerificationOutcome),
        (status = 400, description = "Missing parameters or invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown pending payment", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerificationOutcome>, ServiceError> {
    let outcome = state.services.verification.verify(request).await?;
    Ok(Json(outcome))
}

/// Read-only payment status lookup against the provider.
#[utoipa::path(
    get,
    path = "/api/v1/payments/{payment_id}/status",
    params(("payment_id" = String, Path, description = "Provider payment id")),
    responses(
        (status = 200, description = "Payment status", body = PaymentStatusReport),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn check_payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentStatusReport>, ServiceError> {
    let report = state.services.payments.check_status(&payment_id).await?;
    Ok(Json(report))
}

/// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(initiate_payment))
        .route("/verify", post(verify_payment))
        .route("/:payment_id/status", get(check_payment_status))
}
