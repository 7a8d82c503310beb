//! Decides whether a make-payment request gets the cart's line items.

/// Payment methods the provider only accepts with line items.
const LINE_ITEM_METHODS: &[&str] = &[
    "klarna",
    "klarna_paynow",
    "klarna_account",
    "klarna_b2b",
    "affirm",
    "afterpaytouch",
    "clearpay",
    "ratepay",
    "ratepay_directdebit",
    "zip",
    "paybright",
    "walley",
    "walley_b2b",
];

/// Method families matched by prefix, e.g. `afterpay_default`, `facilypay_3x`.
const LINE_ITEM_METHOD_PREFIXES: &[&str] = &["afterpay_", "facilypay_"];

/// Whether the provider requires line items for this payment method type.
pub fn requires_line_items(payment_method_type: &str) -> bool {
    let method = payment_method_type.trim().to_ascii_lowercase();
    LINE_ITEM_METHODS.contains(&method.as_str())
        || LINE_ITEM_METHOD_PREFIXES
            .iter()
            .any(|prefix| method.starts_with(prefix))
}

/// Resolves the line item decision. An explicit flag on the request wins,
/// then the method's requirement, then the merchant account's default.
pub fn should_add_line_items(
    payment_method_type: &str,
    explicit_flag: Option<bool>,
    module_default: bool,
) -> bool {
    match explicit_flag {
        Some(flag) => flag,
        None if requires_line_items(payment_method_type) => true,
        None => module_default,
    }
}
