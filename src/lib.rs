//! Payment Bridge Library
//!
//! Bridges the commerce platform's payment records and the payment provider's
//! checkout API: make-payment requests are enriched with cart line items,
//! dispatched, and the exchange is returned as update actions.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::auth::CtpTokenProvider;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::{AdyenClient, CtpCartService, PaymentHandler};

/// Shared HTTP client for the commerce platform and the provider
pub fn build_http_client(config: &AppConfig) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ServiceError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Wires the production pipeline: HTTP cart lookup and provider client
/// sharing one HTTP client and token cache.
pub fn build_payment_handler(config: Arc<AppConfig>) -> Result<PaymentHandler, ServiceError> {
    let client = build_http_client(&config)?;
    let tokens = Arc::new(CtpTokenProvider::new());

    let carts = CtpCartService::new(client.clone(), tokens, Arc::clone(&config));
    let provider = AdyenClient::new(client, config);

    Ok(PaymentHandler::new(Arc::new(carts), Arc::new(provider)))
}
