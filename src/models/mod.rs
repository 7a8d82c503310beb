// Commerce platform resources
pub mod cart;
pub mod common;
pub mod payment;

// Provider payloads and update actions
pub mod payment_request;
pub mod update_action;

pub use cart::{Cart, LineItem, TaxRate};
pub use common::{Money, Reference, TypeKeyReference};
pub use payment::PaymentRecord;
pub use payment_request::{PaymentRequest, ProviderLineItem};
pub use update_action::{UpdateAction, UpdateActions};
