pub mod extension;
pub mod health;

use axum::{
    http::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{MakeSpan, TraceLayer},
};

use crate::{config::AppConfig, services::PaymentHandler};

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub payments: PaymentHandler,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, payments: PaymentHandler) -> Self {
        Self { config, payments }
    }
}

/// Span per request carrying the `x-request-id` set by [`SetRequestIdLayer`]
#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "http.request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Builds the service router: `POST /` for API extension calls and
/// `GET /health` for probes.
///
/// Requests are not bounded as a whole. Each outbound call is bounded by the
/// HTTP client's timeout, and a dispatched payment is always answered with its
/// recorded interaction.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(extension::handle_extension))
        .route("/health", get(health::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(RequestSpanMaker))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(Arc::new(state))
}
