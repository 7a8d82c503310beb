use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    config::ModuleConfig,
    errors::ServiceError,
    models::payment::{MERCHANT_ACCOUNT_FIELD, PROJECT_KEY_FIELD},
    models::{PaymentRecord, PaymentRequest, UpdateActions},
    services::{
        adyen::{PaymentProvider, ProviderOutcome},
        commerce::{map_cart_line_items, CartLookup},
        enrichment::should_add_line_items,
        interactions::{accepted_payment_actions, record_interaction},
    },
};

/// Runs the make-payment pipeline for one payment record: decide on line
/// items, enrich from the cart, dispatch to the provider and record the
/// exchange as update actions.
#[derive(Clone)]
pub struct PaymentHandler {
    carts: Arc<dyn CartLookup>,
    provider: Arc<dyn PaymentProvider>,
}

impl PaymentHandler {
    pub fn new(carts: Arc<dyn CartLookup>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { carts, provider }
    }

    /// Processes the payment's `makePaymentRequest`.
    ///
    /// Records without a request, or that already carry a response, yield no
    /// actions. A provider rejection or transport failure is returned as an
    /// error that still carries the recorded interaction.
    #[instrument(skip(self, payment, module), fields(payment_id = %payment.id))]
    pub async fn handle_payment(
        &self,
        payment: &PaymentRecord,
        module: &ModuleConfig,
    ) -> Result<UpdateActions, ServiceError> {
        let raw = match payment.make_payment_request() {
            Some(raw) => raw,
            None => {
                info!("No makePaymentRequest on payment; nothing to do");
                return Ok(UpdateActions::empty());
            }
        };

        if payment.has_make_payment_response() {
            info!("Payment already has a makePaymentResponse; skipping");
            return Ok(UpdateActions::empty());
        }

        let merchant_account = payment.merchant_account().ok_or_else(|| {
            ServiceError::MalformedRequest(format!(
                "payment {} has no {}",
                payment.id, MERCHANT_ACCOUNT_FIELD
            ))
        })?;
        let project_key = payment.project_key().ok_or_else(|| {
            ServiceError::MalformedRequest(format!(
                "payment {} has no {}",
                payment.id, PROJECT_KEY_FIELD
            ))
        })?;

        let mut request = PaymentRequest::parse(raw)?;

        let add_line_items = should_add_line_items(
            request.payment_method_type(),
            request.line_items_flag(),
            module.add_commercetools_line_items,
        );

        if add_line_items {
            let cart = self
                .carts
                .fetch_cart_by_reference(project_key, &payment.id, module.strict_cart_lookup)
                .await?;
            let items = map_cart_line_items(&cart.line_items, cart.locale.as_deref())?;
            info!(
                cart_id = %cart.id,
                line_items = items.len(),
                payment_method = request.payment_method_type(),
                "Adding cart line items to make-payment request"
            );
            request.set_line_items(&items)?;
        } else if let Some(dropped) = request.clear_line_items() {
            warn!(
                dropped,
                "Dropping caller supplied lineItems; line items are not enabled for this request"
            );
        }

        let exchange = self.provider.make_payment(merchant_account, &request).await?;
        let mut actions = vec![record_interaction(&exchange.request, &exchange.response)];

        match exchange.outcome {
            ProviderOutcome::Accepted(response) => {
                actions.extend(accepted_payment_actions(
                    payment,
                    &request,
                    &response,
                    &exchange.response,
                ));
                Ok(UpdateActions::new(actions))
            }
            ProviderOutcome::Rejected { status } => Err(ServiceError::ProviderRejected {
                merchant_account: merchant_account.to_string(),
                status,
                actions,
            }),
            ProviderOutcome::Unreachable(message) => Err(ServiceError::ProviderUnavailable {
                merchant_account: merchant_account.to_string(),
                message,
                actions,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cart, UpdateAction};
    use crate::services::adyen::{prepare_request, ProviderExchange};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::{json, Value};

    mock! {
        pub Carts {}
        #[async_trait]
        impl CartLookup for Carts {
            async fn fetch_cart_by_reference(
                &self,
                project_key: &str,
                reference: &str,
                strict: bool,
            ) -> Result<Cart, ServiceError>;
        }
    }

    mock! {
        pub Provider {}
        #[async_trait]
        impl PaymentProvider for Provider {
            async fn make_payment(
                &self,
                merchant_account: &str,
                request: &PaymentRequest,
            ) -> Result<ProviderExchange, ServiceError>;
        }
    }

    fn three_item_cart() -> Cart {
        let line_items: Vec<Value> = (1..=3)
            .map(|n| {
                json!({
                    "id": format!("li-{}", n),
                    "name": { "en": format!("Item {}", n) },
                    "variant": { "id": 1, "sku": format!("SKU-{}", n) },
                    "price": { "value": { "currencyCode": "EUR", "centAmount": 1190 } },
                    "quantity": 1,
                    "taxRate": { "name": "19%", "amount": 0.19, "includedInPrice": true }
                })
            })
            .collect();

        serde_json::from_value(json!({
            "id": "cart-1",
            "version": 4,
            "locale": "en",
            "lineItems": line_items
        }))
        .unwrap()
    }

    fn payment(request: Value) -> PaymentRecord {
        serde_json::from_value(json!({
            "id": "pay-1",
            "version": 1,
            "amountPlanned": { "currencyCode": "EUR", "centAmount": 3570 },
            "paymentMethodInfo": { "paymentInterface": "ctp-adyen-integration" },
            "custom": {
                "type": { "key": "ctp-adyen-integration-web-components-payment-type" },
                "fields": {
                    "makePaymentRequest": request.to_string(),
                    "adyenMerchantAccount": "MerchantECOM",
                    "commercetoolsProjectKey": "shop-eu"
                }
            }
        }))
        .unwrap()
    }

    fn module(add_line_items: bool) -> ModuleConfig {
        ModuleConfig {
            add_commercetools_line_items: add_line_items,
            strict_cart_lookup: true,
        }
    }

    fn exchange(request: &PaymentRequest, outcome: ProviderOutcome, response: &str) -> ProviderExchange {
        ProviderExchange {
            request: prepare_request(request, "MerchantECOM").to_json().unwrap(),
            response: response.to_string(),
            outcome,
        }
    }

    fn authorised(request: &PaymentRequest) -> ProviderExchange {
        let body = json!({ "resultCode": "Authorised", "pspReference": "PSP-1" });
        exchange(request, ProviderOutcome::Accepted(body.clone()), &body.to_string())
    }

    fn recorded_request(actions: &UpdateActions) -> Value {
        serde_json::from_str(&actions.interaction().unwrap().request).unwrap()
    }

    fn handler(carts: MockCarts, provider: MockProvider) -> PaymentHandler {
        PaymentHandler::new(Arc::new(carts), Arc::new(provider))
    }

    #[tokio::test]
    async fn explicit_flag_adds_line_items_for_any_method() {
        let mut carts = MockCarts::new();
        carts
            .expect_fetch_cart_by_reference()
            .withf(|project, reference, strict| project == "shop-eu" && reference == "pay-1" && *strict)
            .times(1)
            .returning(|_, _, _| Ok(three_item_cart()));

        let mut provider = MockProvider::new();
        provider
            .expect_make_payment()
            .withf(|merchant, request| {
                merchant == "MerchantECOM"
                    && request.line_items.as_ref().map(Vec::len) == Some(3)
            })
            .times(1)
            .returning(|_, request| Ok(authorised(request)));

        let record = payment(json!({
            "reference": "order-1",
            "paymentMethod": { "type": "gpay" },
            "addCommercetoolsLineItems": true
        }));

        let actions = handler(carts, provider)
            .handle_payment(&record, &module(false))
            .await
            .unwrap();

        let sent = recorded_request(&actions);
        assert_eq!(sent["lineItems"].as_array().unwrap().len(), 3);
        assert_eq!(sent["lineItems"][2]["id"], "SKU-3");
        assert!(sent.get("addCommercetoolsLineItems").is_none());
        assert_eq!(actions.actions[0].name(), "addInterfaceInteraction");
        assert_eq!(actions.actions[1].name(), "setCustomField");
    }

    #[tokio::test]
    async fn explicit_false_skips_cart_and_drops_caller_line_items() {
        let mut carts = MockCarts::new();
        carts.expect_fetch_cart_by_reference().never();

        let mut provider = MockProvider::new();
        provider
            .expect_make_payment()
            .withf(|_, request| request.line_items.is_none())
            .times(1)
            .returning(|_, request| Ok(authorised(request)));

        let record = payment(json!({
            "reference": "order-1",
            "paymentMethod": { "type": "klarna" },
            "addCommercetoolsLineItems": false,
            "lineItems": [{ "id": "stale" }]
        }));

        let actions = handler(carts, provider)
            .handle_payment(&record, &module(false))
            .await
            .unwrap();

        assert!(recorded_request(&actions).get("lineItems").is_none());
    }

    #[tokio::test]
    async fn method_requirement_beats_module_default() {
        let mut carts = MockCarts::new();
        carts
            .expect_fetch_cart_by_reference()
            .times(1)
            .returning(|_, _, _| Ok(three_item_cart()));

        let mut provider = MockProvider::new();
        provider
            .expect_make_payment()
            .times(1)
            .returning(|_, request| Ok(authorised(request)));

        let record = payment(json!({ "reference": "order-1", "paymentMethod": { "type": "klarna" } }));
        let actions = handler(carts, provider)
            .handle_payment(&record, &module(false))
            .await
            .unwrap();

        assert_eq!(recorded_request(&actions)["lineItems"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn provider_rejection_carries_recorded_interaction() {
        let mut carts = MockCarts::new();
        carts
            .expect_fetch_cart_by_reference()
            .returning(|_, _, _| Ok(three_item_cart()));

        let mut provider = MockProvider::new();
        provider.expect_make_payment().returning(|_, request| {
            Ok(exchange(
                request,
                ProviderOutcome::Rejected { status: 422 },
                r#"{"status":422,"errorCode":"14_030","message":"Return URL is missing."}"#,
            ))
        });

        let record = payment(json!({ "reference": "order-1", "paymentMethod": { "type": "clearpay" } }));
        let err = handler(carts, provider)
            .handle_payment(&record, &module(true))
            .await
            .unwrap_err();

        assert_matches!(&err, ServiceError::ProviderRejected { status: 422, merchant_account, .. } if merchant_account == "MerchantECOM");
        let actions = err.into_recorded_actions().unwrap();
        assert_eq!(actions.len(), 1);
        let fields = actions[0].interaction().unwrap();
        let sent: Value = serde_json::from_str(&fields.request).unwrap();
        assert_eq!(sent["lineItems"].as_array().unwrap().len(), 3);
        assert!(fields.response.contains("14_030"));
    }

    #[tokio::test]
    async fn unreachable_provider_is_recorded() {
        let mut carts = MockCarts::new();
        carts.expect_fetch_cart_by_reference().never();

        let mut provider = MockProvider::new();
        provider.expect_make_payment().returning(|_, request| {
            Ok(exchange(
                request,
                ProviderOutcome::Unreachable("connection refused".into()),
                r#"{"error":"connection refused"}"#,
            ))
        });

        let record = payment(json!({ "reference": "order-1", "paymentMethod": { "type": "scheme" } }));
        let err = handler(carts, provider)
            .handle_payment(&record, &module(false))
            .await
            .unwrap_err();

        assert_matches!(&err, ServiceError::ProviderUnavailable { message, .. } if message == "connection refused");
        assert_eq!(err.recorded_actions().map(<[UpdateAction]>::len), Some(1));
    }

    #[tokio::test]
    async fn missing_cart_stops_before_dispatch() {
        let mut carts = MockCarts::new();
        carts
            .expect_fetch_cart_by_reference()
            .returning(|_, reference, _| Err(ServiceError::NotFound(format!("no cart for {}", reference))));

        let mut provider = MockProvider::new();
        provider.expect_make_payment().never();

        let record = payment(json!({ "reference": "order-1", "paymentMethod": { "type": "affirm" } }));
        assert_matches!(
            handler(carts, provider).handle_payment(&record, &module(false)).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn guards_short_circuit_without_calls() {
        let mut carts = MockCarts::new();
        carts.expect_fetch_cart_by_reference().never();
        let mut provider = MockProvider::new();
        provider.expect_make_payment().never();
        let handler = handler(carts, provider);

        let mut no_request = payment(json!({}));
        if let Some(custom) = no_request.custom.as_mut() {
            custom.fields.make_payment_request = None;
        }
        assert!(handler
            .handle_payment(&no_request, &module(true))
            .await
            .unwrap()
            .actions
            .is_empty());

        let mut processed = payment(json!({ "reference": "r", "paymentMethod": { "type": "klarna" } }));
        if let Some(custom) = processed.custom.as_mut() {
            custom.fields.make_payment_response = Some("{\"resultCode\":\"Authorised\"}".into());
        }
        assert!(handler
            .handle_payment(&processed, &module(true))
            .await
            .unwrap()
            .actions
            .is_empty());

        let mut no_merchant = payment(json!({ "reference": "r", "paymentMethod": { "type": "klarna" } }));
        if let Some(custom) = no_merchant.custom.as_mut() {
            custom.fields.adyen_merchant_account = Some("  ".into());
        }
        assert_matches!(
            handler.handle_payment(&no_merchant, &module(true)).await,
            Err(ServiceError::MalformedRequest(msg)) if msg.contains("adyenMerchantAccount")
        );

        let broken = {
            let mut record = payment(json!({}));
            if let Some(custom) = record.custom.as_mut() {
                custom.fields.make_payment_request = Some("{not json".into());
            }
            record
        };
        assert_matches!(
            handler.handle_payment(&broken, &module(true)).await,
            Err(ServiceError::MalformedRequest(_))
        );
    }
}
