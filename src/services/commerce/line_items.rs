use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::errors::ServiceError;
use crate::models::common::localized_value;
use crate::models::{LineItem, ProviderLineItem};

const FALLBACK_DESCRIPTION: &str = "item";

/// Maps cart line items to provider line items, one to one and in cart order.
///
/// Amounts are per unit in minor units. The unit price is gross when the tax
/// rate is included in the price and net otherwise; the missing side is
/// derived with half-away-from-zero rounding so that
/// `amount_excluding_tax + tax_amount == amount_including_tax` always holds.
///
/// When the cart gives a line `totalPrice` (which includes cart discounts),
/// the unit price is taken from it so that unit price times quantity equals
/// the cart's line total. A total that does not split evenly over the
/// quantity is rejected.
pub fn map_cart_line_items(
    items: &[LineItem],
    locale: Option<&str>,
) -> Result<Vec<ProviderLineItem>, ServiceError> {
    items.iter().map(|item| map_line_item(item, locale)).collect()
}

fn map_line_item(item: &LineItem, locale: Option<&str>) -> Result<ProviderLineItem, ServiceError> {
    let unit = Decimal::from(unit_amount(item)?);
    let (rate, included) = match &item.tax_rate {
        Some(tax) => (tax.amount, tax.included_in_price),
        None => (Decimal::ZERO, false),
    };

    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ServiceError::MalformedRequest(format!(
            "line item {} has tax rate {} outside 0..1",
            item.id, rate
        )));
    }

    let (gross, net) = if included {
        let net = round_minor(unit / (Decimal::ONE + rate));
        (unit, net)
    } else {
        let gross = unit + round_minor(unit * rate);
        (gross, unit)
    };

    Ok(ProviderLineItem {
        id: item.sku().unwrap_or(&item.id).to_string(),
        description: localized_value(&item.name, locale)
            .unwrap_or(FALLBACK_DESCRIPTION)
            .to_string(),
        quantity: item.quantity,
        amount_including_tax: to_minor(gross, &item.id)?,
        amount_excluding_tax: to_minor(net, &item.id)?,
        tax_amount: to_minor(gross - net, &item.id)?,
        tax_percentage: to_minor(round_minor(rate * dec!(10000)), &item.id)?,
    })
}

/// Unit price in minor units, on the same side of tax as the cart price.
fn unit_amount(item: &LineItem) -> Result<i64, ServiceError> {
    let unit = item.unit_price().cent_amount;
    let total = match &item.total_price {
        Some(total) if item.quantity > 0 => total.cent_amount,
        _ => return Ok(unit),
    };

    let quantity = i64::try_from(item.quantity).map_err(|_| {
        ServiceError::MalformedRequest(format!(
            "line item {} has a quantity out of range",
            item.id
        ))
    })?;
    if unit.checked_mul(quantity) == Some(total) {
        return Ok(unit);
    }
    if total % quantity != 0 {
        return Err(ServiceError::MalformedRequest(format!(
            "line item {} total {} does not split evenly over quantity {}",
            item.id, total, quantity
        )));
    }

    debug!(
        line_item_id = %item.id,
        unit,
        total,
        quantity,
        "Line total differs from unit price; using discounted unit price"
    );
    Ok(total / quantity)
}

fn round_minor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn to_minor(value: Decimal, line_item_id: &str) -> Result<i64, ServiceError> {
    value.to_i64().ok_or_else(|| {
        ServiceError::MalformedRequest(format!(
            "line item {} has an amount out of range",
            line_item_id
        ))
    })
}
