/// Commerce platform side of the bridge: cart lookup and line item mapping
pub mod cart_service;
pub mod line_items;

pub use cart_service::{CartLookup, CtpCartService};
pub use line_items::map_cart_line_items;
