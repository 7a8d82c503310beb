use serde::{Deserialize, Serialize};

use super::common::{Money, TypeKeyReference};

/// Custom field holding the serialized make-payment request.
pub const MAKE_PAYMENT_REQUEST_FIELD: &str = "makePaymentRequest";
/// Custom field holding the serialized provider response.
pub const MAKE_PAYMENT_RESPONSE_FIELD: &str = "makePaymentResponse";
pub const MERCHANT_ACCOUNT_FIELD: &str = "adyenMerchantAccount";
pub const PROJECT_KEY_FIELD: &str = "commercetoolsProjectKey";

/// Payment resource as sent by the commerce platform.
///
/// The bridge never writes this record directly; changes are expressed as
/// [`UpdateAction`](super::update_action::UpdateAction)s returned to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_planned: Option<Money>,
    #[serde(default)]
    pub payment_method_info: PaymentMethodInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomFields {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<TypeKeyReference>,
    #[serde(default)]
    pub fields: PaymentCustomFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCustomFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_payment_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_payment_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adyen_merchant_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commercetools_project_key: Option<String>,
}

impl PaymentRecord {
    pub fn fields(&self) -> Option<&PaymentCustomFields> {
        self.custom.as_ref().map(|c| &c.fields)
    }

    pub fn make_payment_request(&self) -> Option<&str> {
        self.fields()
            .and_then(|f| f.make_payment_request.as_deref())
            .filter(|raw| !raw.trim().is_empty())
    }

    pub fn has_make_payment_response(&self) -> bool {
        self.fields()
            .and_then(|f| f.make_payment_response.as_deref())
            .map(|raw| !raw.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn merchant_account(&self) -> Option<&str> {
        self.fields()
            .and_then(|f| f.adyen_merchant_account.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn project_key(&self) -> Option<&str> {
        self.fields()
            .and_then(|f| f.commercetools_project_key.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}
