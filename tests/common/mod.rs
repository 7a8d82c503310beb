#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use payment_bridge::{
    build_payment_handler,
    config::{AdyenMerchantConfig, AppConfig, CtpProjectConfig, ModuleConfig},
    handlers::{router, AppState},
    models::PaymentRecord,
    services::PaymentHandler,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

pub const PROJECT_KEY: &str = "shop-eu";
pub const MERCHANT_ACCOUNT: &str = "MerchantECOM";
pub const API_KEY: &str = "test-api-key";
pub const PAYMENT_ID: &str = "pay-1";

/// Harness with wiremock servers standing in for the commerce platform
/// (auth and API on one server) and the payment provider.
pub struct TestBridge {
    pub platform: MockServer,
    pub provider: MockServer,
    pub config: Arc<AppConfig>,
}

impl TestBridge {
    pub async fn new() -> Self {
        Self::with_module(ModuleConfig::default(), None).await
    }

    /// `merchant_line_items` is the merchant account's `addCommercetoolsLineItems`
    pub async fn with_module(module: ModuleConfig, merchant_line_items: Option<bool>) -> Self {
        Self::build(module, merchant_line_items, 5).await
    }

    /// Outbound calls time out after `secs` seconds each.
    pub async fn with_http_timeout(secs: u64) -> Self {
        Self::build(ModuleConfig::default(), None, secs).await
    }

    async fn build(
        module: ModuleConfig,
        merchant_line_items: Option<bool>,
        http_timeout_secs: u64,
    ) -> Self {
        let platform = MockServer::start().await;
        let provider = MockServer::start().await;

        let mut cfg = AppConfig::new(
            vec![CtpProjectConfig {
                project_key: PROJECT_KEY.to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                api_url: platform.uri(),
                auth_url: platform.uri(),
                scope: None,
            }],
            vec![AdyenMerchantConfig {
                merchant_account: MERCHANT_ACCOUNT.to_string(),
                api_key: API_KEY.to_string(),
                api_base_url: format!("{}/v71", provider.uri()),
                add_commercetools_line_items: merchant_line_items,
            }],
        );
        cfg.http_timeout_secs = http_timeout_secs;
        cfg.module = module;

        Self {
            platform,
            provider,
            config: Arc::new(cfg),
        }
    }

    pub fn handler(&self) -> PaymentHandler {
        build_payment_handler(Arc::clone(&self.config)).expect("payment handler")
    }

    pub fn router(&self) -> Router {
        router(AppState::new(Arc::clone(&self.config), self.handler()))
    }

    pub fn module(&self) -> ModuleConfig {
        self.config.module_config_for(MERCHANT_ACCOUNT)
    }

    pub async fn mount_token(&self) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ctp-token",
                "token_type": "bearer",
                "expires_in": 172800,
                "scope": format!("manage_project:{}", PROJECT_KEY)
            })))
            .mount(&self.platform)
            .await;
    }

    /// Answers the cart query for [`PAYMENT_ID`] with the given carts.
    pub async fn mount_carts(&self, carts: Vec<Value>) {
        let count = carts.len();
        Mock::given(method("GET"))
            .and(path(format!("/{}/carts", PROJECT_KEY)))
            .and(query_param(
                "where",
                format!("paymentInfo(payments(id=\"{}\"))", PAYMENT_ID),
            ))
            .and(header("authorization", "Bearer ctp-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "limit": 20,
                "offset": 0,
                "count": count,
                "total": count,
                "results": carts
            })))
            .mount(&self.platform)
            .await;
    }

    pub async fn mount_provider(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v71/payments"))
            .and(header("x-api-key", API_KEY))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.provider)
            .await;
    }

    pub async fn mount_authorised(&self) {
        self.mount_provider(
            200,
            json!({ "resultCode": "Authorised", "pspReference": "PSP-123" }),
        )
        .await;
    }

    /// Bodies the provider received, parsed as JSON.
    pub async fn provider_requests(&self) -> Vec<Value> {
        self.provider
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r: &MockRequest| serde_json::from_slice(&r.body).expect("JSON body"))
            .collect()
    }

    pub async fn cart_queries(&self) -> usize {
        self.platform
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with("/carts"))
            .count()
    }

    pub async fn post_extension(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response")
        };
        (status, value)
    }
}

/// Cart with three line items: two taxed gross, one taxed net.
pub fn three_item_cart(id: &str) -> Value {
    json!({
        "id": id,
        "version": 7,
        "locale": "en",
        "lineItems": [
            {
                "id": "li-1",
                "name": { "en": "Running shoes", "de": "Laufschuhe" },
                "variant": { "id": 1, "sku": "SHOE-42" },
                "price": { "value": { "currencyCode": "EUR", "centAmount": 11900 } },
                "quantity": 1,
                "taxRate": { "name": "19% DE", "amount": 0.19, "includedInPrice": true }
            },
            {
                "id": "li-2",
                "name": { "en": "Socks" },
                "variant": { "id": 2, "sku": "SOCK-3P" },
                "price": {
                    "value": { "currencyCode": "EUR", "centAmount": 1500 },
                    "discounted": { "value": { "currencyCode": "EUR", "centAmount": 1190 } }
                },
                "quantity": 2,
                "totalPrice": { "currencyCode": "EUR", "centAmount": 2380 },
                "taxRate": { "name": "19% DE", "amount": 0.19, "includedInPrice": true }
            },
            {
                "id": "li-3",
                "name": { "de": "Versand" },
                "price": { "value": { "currencyCode": "EUR", "centAmount": 500 } },
                "quantity": 1,
                "taxRate": { "name": "7% DE", "amount": 0.07, "includedInPrice": false }
            }
        ],
        "paymentInfo": { "payments": [ { "typeId": "payment", "id": PAYMENT_ID } ] }
    })
}

/// Payment record whose `makePaymentRequest` holds `request`.
pub fn payment_record(request: Value) -> PaymentRecord {
    serde_json::from_value(payment_json(request)).expect("payment record")
}

pub fn payment_json(request: Value) -> Value {
    json!({
        "id": PAYMENT_ID,
        "version": 1,
        "amountPlanned": { "currencyCode": "EUR", "centAmount": 14815 },
        "paymentMethodInfo": { "paymentInterface": "ctp-adyen-integration" },
        "custom": {
            "type": { "typeId": "type", "key": "ctp-adyen-integration-web-components-payment-type" },
            "fields": {
                "makePaymentRequest": request.to_string(),
                "adyenMerchantAccount": MERCHANT_ACCOUNT,
                "commercetoolsProjectKey": PROJECT_KEY
            }
        }
    })
}

/// Make-payment request for `method_type`, optionally carrying the flag.
pub fn make_payment_request(method_type: &str, flag: Option<bool>) -> Value {
    let mut request = json!({
        "reference": "order-1001",
        "amount": { "currency": "EUR", "value": 14815 },
        "paymentMethod": { "type": method_type },
        "returnUrl": "https://shop.example.com/checkout/return"
    });
    if let Some(flag) = flag {
        request["addCommercetoolsLineItems"] = json!(flag);
    }
    request
}

pub fn extension_call(request: Value) -> Value {
    json!({
        "action": "Create",
        "resource": { "typeId": "payment", "id": PAYMENT_ID, "obj": payment_json(request) }
    })
}
