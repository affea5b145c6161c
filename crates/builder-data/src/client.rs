//! Base-URL aware client over an [`HttpTransport`].

use std::rc::Rc;

use crate::{FetchError, HttpTransport, Method, RequestBuilder, Response};

/// HTTP client for outbound store requests.
///
/// Resolves relative paths against a base URL and stamps default headers on
/// every request before handing it to the transport.
#[derive(Clone)]
pub struct FetchClient {
    base_url: Option<String>,
    default_headers: Vec<(String, String)>,
    transport: Rc<dyn HttpTransport>,
}

impl FetchClient {
    /// Create a client over `transport`.
    pub fn new(transport: Rc<dyn HttpTransport>) -> Self {
        Self {
            base_url: None,
            default_headers: Vec::new(),
            transport,
        }
    }

    /// Prepend `base_url` to every relative request path.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a header that will be included in all requests.
    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> ClientRequestBuilder<'_> {
        self.request(Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(&self, url: impl Into<String>) -> ClientRequestBuilder<'_> {
        self.request(Method::Post, url)
    }

    /// Create a request with an explicit method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> ClientRequestBuilder<'_> {
        let mut builder = RequestBuilder::new(method, self.resolve(&url.into()));
        for (key, value) in &self.default_headers {
            builder = builder.header(key.clone(), value.clone());
        }
        ClientRequestBuilder {
            builder,
            transport: self.transport.as_ref(),
        }
    }

    /// Resolve a path against the base URL; absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.starts_with("http://") && !url.starts_with("https://") => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            }
            _ => url.to_string(),
        }
    }
}

/// A request builder bound to a client's transport.
pub struct ClientRequestBuilder<'a> {
    builder: RequestBuilder,
    transport: &'a dyn HttpTransport,
}

impl ClientRequestBuilder<'_> {
    /// Add a header to the request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.header(key, value);
        self
    }

    /// Add a header only when a value is present.
    pub fn optional_header(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.header(key, value),
            None => self,
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.query(key, value);
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, FetchError> {
        self.builder = self.builder.json(value)?;
        Ok(self)
    }

    /// Send cookies/session credentials.
    pub fn with_credentials(mut self) -> Self {
        self.builder = self.builder.with_credentials();
        self
    }

    /// Send the request and return the response, whatever its status.
    pub async fn send(self) -> Result<Response, FetchError> {
        let request = self.builder.build();
        tracing::trace!(method = request.method.as_str(), url = %request.url, "sending request");
        self.transport.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use async_trait::async_trait;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Echo {
        seen: RefCell<Vec<Request>>,
    }

    #[async_trait(?Send)]
    impl HttpTransport for Echo {
        async fn send(&self, request: Request) -> Result<Response, FetchError> {
            self.seen.borrow_mut().push(request);
            Ok(Response::with_status(204))
        }
    }

    #[test]
    fn test_resolve_against_base() {
        let client = FetchClient::new(Rc::new(Echo::default())).with_base_url("https://shop.test/api/");
        assert_eq!(client.resolve("/products"), "https://shop.test/api/products");
        assert_eq!(client.resolve("cart/add-item"), "https://shop.test/api/cart/add-item");
        assert_eq!(client.resolve("https://other.test/x"), "https://other.test/x");
    }

    #[tokio::test]
    async fn test_default_headers_reach_transport() {
        let echo = Rc::new(Echo::default());
        let client = FetchClient::new(echo.clone())
            .with_base_url("https://shop.test")
            .with_default_header("Accept", "application/json");

        let resp = client
            .get("/products")
            .optional_header("X-Request-Nonce", Some("abc"))
            .optional_header("X-Skipped", None)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status, 204);
        let seen = echo.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].header("accept"), Some("application/json"));
        assert_eq!(seen[0].header("x-request-nonce"), Some("abc"));
        assert_eq!(seen[0].header("x-skipped"), None);
    }
}
