//! The store's catalog-read and cart-write API.

use std::rc::Rc;

use async_trait::async_trait;
use builder_commerce::catalog::{Item, ProductsEnvelope};
use builder_commerce::order::BatchAddRequest;
use builder_commerce::{CategoryKey, OrderLine};
use serde::{Deserialize, Serialize};

use crate::{FetchClient, FetchError, HttpTransport, Response};

/// Header carrying the catalog read nonce.
pub const REQUEST_NONCE_HEADER: &str = "X-Request-Nonce";
/// Header carrying the cart write nonce.
pub const CART_NONCE_HEADER: &str = "X-Cart-Nonce";

/// Where the store lives and how its endpoints are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// API root, e.g. `https://shop.example/wp-json/builder/v1`.
    pub base_url: String,
    /// Cart page the shopper lands on after a submission.
    pub cart_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_nonce: Option<String>,
    #[serde(default = "default_products_path")]
    pub products_path: String,
    #[serde(default = "default_batch_path")]
    pub batch_path: String,
    #[serde(default = "default_legacy_batch_path")]
    pub legacy_batch_path: String,
    #[serde(default = "default_item_path")]
    pub item_path: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_products_path() -> String {
    "/products".to_string()
}

fn default_batch_path() -> String {
    "/cart/add-items".to_string()
}

fn default_legacy_batch_path() -> String {
    "/legacy/cart/add-items".to_string()
}

fn default_item_path() -> String {
    "/cart/add-item".to_string()
}

fn default_per_page() -> u32 {
    100
}

impl EndpointConfig {
    /// Create a configuration with default endpoint paths.
    pub fn new(base_url: impl Into<String>, cart_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            cart_url: cart_url.into(),
            request_nonce: None,
            cart_nonce: None,
            products_path: default_products_path(),
            batch_path: default_batch_path(),
            legacy_batch_path: default_legacy_batch_path(),
            item_path: default_item_path(),
            per_page: default_per_page(),
        }
    }

    pub fn with_request_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.request_nonce = Some(nonce.into());
        self
    }

    pub fn with_cart_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.cart_nonce = Some(nonce.into());
        self
    }

    /// Path of a batch endpoint.
    pub fn batch_path(&self, endpoint: BatchEndpoint) -> &str {
        match endpoint {
            BatchEndpoint::Primary => &self.batch_path,
            BatchEndpoint::Legacy => &self.legacy_batch_path,
        }
    }
}

/// The two batch-add endpoint generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchEndpoint {
    Primary,
    Legacy,
}

/// Read side: one category's items.
#[async_trait(?Send)]
pub trait CatalogApi {
    /// Fetch every item listed under `key`. Non-2xx is an error.
    async fn fetch_category(&self, key: &CategoryKey) -> Result<Vec<Item>, FetchError>;
}

/// Write side: adding order lines to the shopper's cart.
///
/// Both calls return the raw response so the caller can tell a missing
/// endpoint (404) from other rejections.
#[async_trait(?Send)]
pub trait CartApi {
    async fn add_items(
        &self,
        endpoint: BatchEndpoint,
        lines: &[OrderLine],
    ) -> Result<Response, FetchError>;

    async fn add_item(&self, line: &OrderLine) -> Result<Response, FetchError>;
}

/// [`CatalogApi`] and [`CartApi`] over HTTP.
#[derive(Clone)]
pub struct StoreClient {
    client: FetchClient,
    config: EndpointConfig,
}

impl StoreClient {
    pub fn new(transport: Rc<dyn HttpTransport>, config: EndpointConfig) -> Self {
        let client = FetchClient::new(transport)
            .with_base_url(config.base_url.clone())
            .with_default_header("Accept", "application/json");
        Self { client, config }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }
}

#[async_trait(?Send)]
impl CatalogApi for StoreClient {
    async fn fetch_category(&self, key: &CategoryKey) -> Result<Vec<Item>, FetchError> {
        let envelope: ProductsEnvelope = self
            .client
            .get(&self.config.products_path)
            .query("category", key.as_str())
            .query("per_page", self.config.per_page.to_string())
            .optional_header(REQUEST_NONCE_HEADER, self.config.request_nonce.as_deref())
            .send()
            .await?
            .error_for_status()?
            .json()?;

        let mut items = Vec::with_capacity(envelope.len());
        for decoded in envelope.into_items() {
            match decoded {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(category = %key, error = %e, "dropping invalid item"),
            }
        }
        Ok(items)
    }
}

#[async_trait(?Send)]
impl CartApi for StoreClient {
    async fn add_items(
        &self,
        endpoint: BatchEndpoint,
        lines: &[OrderLine],
    ) -> Result<Response, FetchError> {
        self.client
            .post(self.config.batch_path(endpoint))
            .optional_header(CART_NONCE_HEADER, self.config.cart_nonce.as_deref())
            .with_credentials()
            .json(&BatchAddRequest { items: lines })?
            .send()
            .await
    }

    async fn add_item(&self, line: &OrderLine) -> Result<Response, FetchError> {
        self.client
            .post(&self.config.item_path)
            .optional_header(CART_NONCE_HEADER, self.config.cart_nonce.as_deref())
            .with_credentials()
            .json(line)?
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, Request};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    struct Scripted {
        responses: RefCell<VecDeque<Result<Response, FetchError>>>,
        seen: RefCell<Vec<Request>>,
    }

    impl Scripted {
        fn push(&self, response: Result<Response, FetchError>) {
            self.responses.borrow_mut().push_back(response);
        }
    }

    #[async_trait(?Send)]
    impl HttpTransport for Scripted {
        async fn send(&self, request: Request) -> Result<Response, FetchError> {
            self.seen.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Response::with_status(500)))
        }
    }

    fn store(transport: Rc<Scripted>) -> StoreClient {
        let config = EndpointConfig::new("https://shop.test/api", "https://shop.test/cart")
            .with_request_nonce("read-1")
            .with_cart_nonce("cart-1");
        StoreClient::new(transport, config)
    }

    #[tokio::test]
    async fn test_fetch_category_request_shape() {
        let transport = Rc::new(Scripted::default());
        transport.push(Response::json_ok(&serde_json::json!({
            "body": [
                { "id": 1, "name": "Ryzen 5 7600", "price": "199.00", "categories": [{ "slug": "cpu" }] },
                { "name": "missing id" },
                { "id": 2, "name": "Ryzen 9 7950X", "price": 549 }
            ]
        })));

        let items = store(transport.clone())
            .fetch_category(&CategoryKey::new("cpu"))
            .await
            .unwrap();

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let seen = transport.seen.borrow();
        assert_eq!(seen[0].method, Method::Get);
        assert_eq!(
            seen[0].url,
            "https://shop.test/api/products?category=cpu&per_page=100"
        );
        assert_eq!(seen[0].header(REQUEST_NONCE_HEADER), Some("read-1"));
        assert!(!seen[0].include_credentials);
    }

    #[tokio::test]
    async fn test_fetch_category_non_2xx_is_error() {
        let transport = Rc::new(Scripted::default());
        transport.push(Ok(Response::with_status(403)));

        let err = store(transport)
            .fetch_category(&CategoryKey::new("gpu"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_missing_body_is_empty_category() {
        let transport = Rc::new(Scripted::default());
        transport.push(Response::json_ok(&serde_json::json!({})));

        let items = store(transport)
            .fetch_category(&CategoryKey::new("fans"))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entries_are_dropped() {
        let transport = Rc::new(Scripted::default());
        transport.push(Response::json_ok(&serde_json::json!({
            "body": [
                { "id": 1, "name": "Core i5", "price": "189.00" },
                { "id": 2, "name": "No pictures", "price": "99", "images": null },
                { "id": 3, "name": "Odd options", "attributes": [{ "slug": "pa_x", "options": [[1]] }] },
                { "id": 4, "name": "", "price": "10" },
                { "id": 5, "name": "Core i7", "price": 329 }
            ]
        })));

        let items = store(transport)
            .fetch_category(&CategoryKey::new("cpu"))
            .await
            .unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "5"]);
    }

    #[tokio::test]
    async fn test_batch_endpoints_and_body() {
        let transport = Rc::new(Scripted::default());
        transport.push(Ok(Response::with_status(404)));
        transport.push(Ok(Response::with_status(201)));
        let store = store(transport.clone());
        let lines = vec![OrderLine::single("1"), OrderLine::single("2")];

        let primary = store.add_items(BatchEndpoint::Primary, &lines).await.unwrap();
        let legacy = store.add_items(BatchEndpoint::Legacy, &lines).await.unwrap();
        assert!(primary.is_not_found());
        assert!(legacy.is_success());

        let seen = transport.seen.borrow();
        assert_eq!(seen[0].url, "https://shop.test/api/cart/add-items");
        assert_eq!(seen[1].url, "https://shop.test/api/legacy/cart/add-items");
        for request in seen.iter() {
            assert_eq!(request.method, Method::Post);
            assert!(request.include_credentials);
            assert_eq!(request.header(CART_NONCE_HEADER), Some("cart-1"));
        }
        let body: serde_json::Value = seen[0].json_body().unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "items": [
                { "id": "1", "quantity": 1 },
                { "id": "2", "quantity": 1 }
            ]})
        );
    }

    #[tokio::test]
    async fn test_add_item_body() {
        let transport = Rc::new(Scripted::default());
        transport.push(Ok(Response::with_status(200)));

        store(transport.clone())
            .add_item(&OrderLine::single("9"))
            .await
            .unwrap();

        let seen = transport.seen.borrow();
        assert_eq!(seen[0].url, "https://shop.test/api/cart/add-item");
        let body: serde_json::Value = seen[0].json_body().unwrap();
        assert_eq!(body, serde_json::json!({ "id": "9", "quantity": 1 }));
    }

    #[test]
    fn test_endpoint_config_defaults() {
        let config: EndpointConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://shop.test/api",
            "cart_url": "https://shop.test/cart"
        }))
        .unwrap();
        assert_eq!(config.per_page, 100);
        assert_eq!(config.batch_path(BatchEndpoint::Primary), "/cart/add-items");
        assert_eq!(config.request_nonce, None);
    }
}
