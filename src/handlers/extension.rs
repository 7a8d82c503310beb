use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    handlers::AppState,
    models::{PaymentRecord, UpdateActions},
};

const PAYMENT_TYPE_ID: &str = "payment";

/// API extension call made by the commerce platform on resource create/update.
#[derive(Debug, Deserialize)]
pub struct ExtensionRequest {
    /// `Create` or `Update`
    pub action: String,
    pub resource: ExtensionResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionResource {
    pub type_id: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub obj: Option<Value>,
}

/// `POST /`
///
/// Answers with the update actions for the payment. Provider failures are
/// still answered with `200` so that the recorded interaction is persisted;
/// every other failure becomes a `400` extension error.
#[instrument(skip(state, body))]
pub async fn handle_extension(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match process(&state, &body).await {
        Ok(actions) => Json(actions).into_response(),
        Err(err) if err.recorded_actions().is_some() => {
            warn!(error = %err, "Returning recorded interaction of failed payment");
            let actions = err.into_recorded_actions().unwrap_or_default();
            Json(UpdateActions::new(actions)).into_response()
        }
        Err(err) => {
            warn!(error = %err, status = %err.status_code(), "Extension call failed");
            err.into_response()
        }
    }
}

async fn process(state: &AppState, body: &[u8]) -> Result<UpdateActions, ServiceError> {
    let request: ExtensionRequest = serde_json::from_slice(body).map_err(|e| {
        ServiceError::MalformedRequest(format!("extension request is not valid: {}", e))
    })?;

    if request.resource.type_id != PAYMENT_TYPE_ID {
        info!(type_id = %request.resource.type_id, "Ignoring non-payment resource");
        return Ok(UpdateActions::empty());
    }

    let obj = request.resource.obj.ok_or_else(|| {
        ServiceError::MalformedRequest("extension request carries no payment object".to_string())
    })?;
    let payment: PaymentRecord = serde_json::from_value(obj).map_err(|e| {
        ServiceError::MalformedRequest(format!("payment object is not valid: {}", e))
    })?;

    info!(action = %request.action, payment_id = %payment.id, "Handling payment extension call");

    let module = payment
        .merchant_account()
        .map(|account| state.config.module_config_for(account))
        .unwrap_or_else(|| state.config.module.clone());

    state.payments.handle_payment(&payment, &module).await
}
