use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::common::{LocalizedString, Money, Reference};

/// Cart snapshot as returned by the commerce platform.
///
/// Only the parts needed to build provider line items are modelled; any other
/// field of the platform's cart representation is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
}

impl Cart {
    pub fn line_item_count(&self) -> usize {
        self.line_items.len()
    }

    /// Whether the cart references the payment with the given id.
    pub fn references_payment(&self, payment_id: &str) -> bool {
        self.payment_info
            .as_ref()
            .map(|info| info.payments.iter().any(|p| p.id == payment_id))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(default)]
    pub payments: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ProductVariant>,
    pub price: Price,
    pub quantity: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<TaxRate>,
}

impl LineItem {
    /// Price of a single unit after product discounts.
    pub fn unit_price(&self) -> &Money {
        self.price
            .discounted
            .as_ref()
            .map(|d| &d.value)
            .unwrap_or(&self.price.value)
    }

    pub fn sku(&self) -> Option<&str> {
        self.variant.as_ref().and_then(|v| v.sku.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted: Option<DiscountedPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedPrice {
    pub value: Money,
}

/// Tax rate applied to a line item; `amount` is a fraction (`0.19` for 19 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub amount: Decimal,
    pub included_in_price: bool,
}

/// Envelope of a paged cart query.
#[derive(Debug, Clone, Deserialize)]
pub struct CartQueryResponse {
    #[serde(default)]
    pub results: Vec<Cart>,
}
