use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    config::AppConfig,
    errors::ServiceError,
    models::payment_request::{
        ApplicationComponent, ApplicationInfo, ExternalPlatform, PaymentRequest,
    },
};

const API_KEY_HEADER: &str = "X-Api-Key";
const MERCHANT_APPLICATION_NAME: &str = env!("CARGO_PKG_NAME");
const MERCHANT_APPLICATION_VERSION: &str = env!("CARGO_PKG_VERSION");
const EXTERNAL_PLATFORM_NAME: &str = "commercetools";

/// One request/response exchange with the payment provider.
///
/// `request` is the exact body that was sent and `response` the body that came
/// back (or a JSON error document when nothing came back).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderExchange {
    pub request: String,
    pub response: String,
    pub outcome: ProviderOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    /// 2xx with the parsed response body
    Accepted(Value),
    /// Non-2xx answer from the provider
    Rejected { status: u16 },
    /// The provider could not be reached or its answer was unreadable
    Unreachable(String),
}

/// Sends make-payment requests to the provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Sends the request on behalf of `merchant_account`.
    ///
    /// Only configuration problems are returned as errors; rejections and
    /// transport failures are reported through [`ProviderOutcome`] so the
    /// exchange can still be recorded.
    async fn make_payment(
        &self,
        merchant_account: &str,
        request: &PaymentRequest,
    ) -> Result<ProviderExchange, ServiceError>;
}

/// Checkout API client, `POST {api_base_url}/payments` per merchant account.
#[derive(Clone)]
pub struct AdyenClient {
    client: reqwest::Client,
    config: Arc<AppConfig>,
}

impl AdyenClient {
    pub fn new(client: reqwest::Client, config: Arc<AppConfig>) -> Self {
        Self { client, config }
    }
}

/// Final provider-bound shape of a request: merchant account and application
/// info set, bridge-only switches removed.
pub fn prepare_request(request: &PaymentRequest, merchant_account: &str) -> PaymentRequest {
    let mut prepared = request.clone();
    prepared.merchant_account = Some(merchant_account.to_string());
    prepared.add_commercetools_line_items = None;
    prepared.application_info = Some(ApplicationInfo {
        merchant_application: ApplicationComponent {
            name: MERCHANT_APPLICATION_NAME.to_string(),
            version: MERCHANT_APPLICATION_VERSION.to_string(),
        },
        external_platform: ExternalPlatform {
            name: EXTERNAL_PLATFORM_NAME.to_string(),
            integrator: None,
        },
    });
    prepared
}

#[async_trait]
impl PaymentProvider for AdyenClient {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn make_payment(
        &self,
        merchant_account: &str,
        request: &PaymentRequest,
    ) -> Result<ProviderExchange, ServiceError> {
        let merchant = self.config.adyen_merchant(merchant_account).ok_or_else(|| {
            ServiceError::Configuration(format!(
                "Adyen merchant account {} is not configured",
                merchant_account
            ))
        })?;

        // Serialized once: the same string is sent and recorded
        let body = prepare_request(request, merchant_account).to_json()?;
        let url = format!("{}/payments", merchant.api_base_url.trim_end_matches('/'));

        let sent = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &merchant.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.clone())
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                error!(merchant_account, "Payment provider unreachable: {}", e);
                let message = e.to_string();
                return Ok(ProviderExchange {
                    request: body,
                    response: json!({ "error": message }).to_string(),
                    outcome: ProviderOutcome::Unreachable(message),
                });
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!(merchant_account, status = %status, "Reading provider response failed: {}", e);
                let message = e.to_string();
                return Ok(ProviderExchange {
                    request: body,
                    response: json!({ "error": message }).to_string(),
                    outcome: ProviderOutcome::Unreachable(message),
                });
            }
        };

        let outcome = if status.is_success() {
            match serde_json::from_str::<Value>(&text) {
                Ok(parsed) => {
                    let result_code = parsed
                        .get("resultCode")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    info!(merchant_account, result_code, "Payment provider accepted the request");
                    ProviderOutcome::Accepted(parsed)
                }
                Err(e) => {
                    error!(merchant_account, status = %status, "Provider answered with a non-JSON body: {}", e);
                    ProviderOutcome::Unreachable(format!(
                        "provider answered {} with a non-JSON body",
                        status
                    ))
                }
            }
        } else {
            warn!(merchant_account, status = %status, "Payment provider rejected the request");
            ProviderOutcome::Rejected {
                status: status.as_u16(),
            }
        };

        Ok(ProviderExchange {
            request: body,
            response: text,
            outcome,
        })
    }
}
