use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::{
    auth::CtpTokenProvider,
    config::AppConfig,
    errors::ServiceError,
    models::{cart::CartQueryResponse, Cart},
};

/// Retrieves the cart a payment belongs to.
#[async_trait]
pub trait CartLookup: Send + Sync {
    /// Fetches the single cart whose `paymentInfo` references `reference`.
    ///
    /// With `strict` set, more than one matching cart is an
    /// [`ServiceError::AmbiguousResult`]; otherwise the first match is used.
    async fn fetch_cart_by_reference(
        &self,
        project_key: &str,
        reference: &str,
        strict: bool,
    ) -> Result<Cart, ServiceError>;
}

/// Cart lookup against the commerce platform's HTTP API.
///
/// Carts are queried with
/// `GET {api_url}/{project_key}/carts?where=paymentInfo(payments(id="{reference}"))`
/// using a client-credentials bearer token of the project.
#[derive(Clone)]
pub struct CtpCartService {
    client: reqwest::Client,
    tokens: Arc<CtpTokenProvider>,
    config: Arc<AppConfig>,
}

impl CtpCartService {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<CtpTokenProvider>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            client,
            tokens,
            config,
        }
    }

    async fn query_carts(
        &self,
        project_key: &str,
        reference: &str,
    ) -> Result<CartQueryResponse, ServiceError> {
        let project = self.config.ctp_project(project_key).ok_or_else(|| {
            ServiceError::Configuration(format!(
                "commercetools project {} is not configured",
                project_key
            ))
        })?;

        let mut url = Url::parse(&format!(
            "{}/{}/carts",
            project.api_url.trim_end_matches('/'),
            project_key
        ))
        .map_err(|e| {
            ServiceError::Configuration(format!(
                "commercetools project {} has an invalid API URL: {}",
                project_key, e
            ))
        })?;
        url.query_pairs_mut().append_pair(
            "where",
            &format!("paymentInfo(payments(id=\"{}\"))", reference),
        );

        let token = self.tokens.access_token(project).await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                error!(project_key, reference, "Cart query failed: {}", e);
                ServiceError::UpstreamUnavailable(format!(
                    "cart query for payment {} in project {} failed",
                    reference, project_key
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate(project_key, &token).await;
        }
        if !status.is_success() {
            error!(project_key, reference, status = %status, "Cart query rejected");
            return Err(ServiceError::UpstreamUnavailable(format!(
                "cart query for payment {} in project {} returned {}",
                reference, project_key, status
            )));
        }

        response.json::<CartQueryResponse>().await.map_err(|e| {
            error!(project_key, reference, "Cart query returned an unreadable body: {}", e);
            ServiceError::UpstreamUnavailable(format!(
                "cart query for payment {} in project {} returned an unreadable body",
                reference, project_key
            ))
        })
    }
}

#[async_trait]
impl CartLookup for CtpCartService {
    #[instrument(skip(self))]
    async fn fetch_cart_by_reference(
        &self,
        project_key: &str,
        reference: &str,
        strict: bool,
    ) -> Result<Cart, ServiceError> {
        let found = self.query_carts(project_key, reference).await?;
        let cart = select_single_cart(found.results, project_key, reference, strict)?;
        info!(
            cart_id = %cart.id,
            line_items = cart.line_item_count(),
            "Found cart for payment"
        );
        Ok(cart)
    }
}

/// Applies the one-cart-per-payment rule to a query result. Carts that do not
/// reference the payment are ignored.
pub fn select_single_cart(
    carts: Vec<Cart>,
    project_key: &str,
    reference: &str,
    strict: bool,
) -> Result<Cart, ServiceError> {
    let (carts, unrelated): (Vec<_>, Vec<_>) = carts
        .into_iter()
        .partition(|cart| cart.references_payment(reference));
    if !unrelated.is_empty() {
        warn!(
            project_key,
            reference,
            ignored = unrelated.len(),
            "Cart query returned carts not referencing the payment"
        );
    }

    let count = carts.len();
    let mut carts = carts.into_iter();
    let first = carts.next().ok_or_else(|| {
        ServiceError::NotFound(format!(
            "no cart references payment {} in project {}",
            reference, project_key
        ))
    })?;

    if count > 1 {
        if strict {
            return Err(ServiceError::AmbiguousResult(format!(
                "{} carts reference payment {} in project {}",
                count, reference, project_key
            )));
        }
        warn!(
            project_key,
            reference,
            count,
            cart_id = %first.id,
            "Several carts reference the payment; using the first"
        );
    }

    Ok(first)
}
