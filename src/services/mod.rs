// Make-payment pipeline
pub mod enrichment;
pub mod interactions;
pub mod payments;

// Commerce platform (carts, line items)
pub mod commerce;

// External Services
pub mod adyen;

pub use adyen::{AdyenClient, PaymentProvider};
pub use commerce::{CartLookup, CtpCartService};
pub use payments::PaymentHandler;
