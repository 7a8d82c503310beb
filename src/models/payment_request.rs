use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::payment::MAKE_PAYMENT_REQUEST_FIELD;
use crate::errors::ServiceError;

/// Provider-bound make-payment request, parsed from the payment's
/// `makePaymentRequest` custom field.
///
/// Only the fields the bridge reads or writes are typed. Everything else the
/// shop sent (amount, return URL, shopper data, encrypted card data, ...) is
/// kept in `extra` and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[validate(length(min = 1, message = "reference must not be empty"))]
    pub reference: String,

    #[validate]
    pub payment_method: PaymentMethod,

    /// Bridge-only switch; stripped before the request leaves the bridge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_commercetools_line_items: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_info: Option<ApplicationInfo>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "paymentMethod.type must not be empty"))]
    pub method_type: String,

    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    pub merchant_application: ApplicationComponent,
    pub external_platform: ExternalPlatform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationComponent {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPlatform {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrator: Option<String>,
}

/// Line item in the provider's schema. Amounts are per unit, in minor units;
/// `tax_percentage` is in basis points of a percent (21 % is `2100`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLineItem {
    pub id: String,
    pub description: String,
    pub quantity: u64,
    pub amount_including_tax: i64,
    pub amount_excluding_tax: i64,
    pub tax_amount: i64,
    pub tax_percentage: i64,
}

impl PaymentRequest {
    /// Strictly parses the serialized request: it must be a JSON object with a
    /// non-empty `reference` and a `paymentMethod` carrying a non-empty `type`.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let request: PaymentRequest = serde_json::from_str(raw).map_err(|e| {
            ServiceError::MalformedRequest(format!("{} is not valid: {}", MAKE_PAYMENT_REQUEST_FIELD, e))
        })?;

        request.validate().map_err(|e| {
            ServiceError::MalformedRequest(format!("{} is not valid: {}", MAKE_PAYMENT_REQUEST_FIELD, e))
        })?;

        Ok(request)
    }

    pub fn payment_method_type(&self) -> &str {
        &self.payment_method.method_type
    }

    /// Explicit per-request line item switch, if the shop set one.
    pub fn line_items_flag(&self) -> Option<bool> {
        self.add_commercetools_line_items
    }

    /// Replaces any line items with the given provider line items.
    pub fn set_line_items(&mut self, items: &[ProviderLineItem]) -> Result<(), ServiceError> {
        let values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        self.line_items = Some(values);
        Ok(())
    }

    /// Removes the line items, returning how many were present.
    pub fn clear_line_items(&mut self) -> Option<usize> {
        self.line_items.take().map(|items| items.len())
    }

    pub fn to_json(&self) -> Result<String, ServiceError> {
        serde_json::to_string(self).map_err(|e| ServiceError::SerializationError(e.to_string()))
    }
}
