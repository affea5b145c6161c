//! HTTP request builder.

use serde::Serialize;

use crate::FetchError;

/// HTTP methods used against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Convert to HTTP method string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A fully built request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Absolute URL including the encoded query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Send cookies/session credentials with the request.
    pub include_credentials: bool,
}

impl Request {
    /// Get a header value (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Decode the body as JSON.
    pub fn json_body<T: serde::de::DeserializeOwned>(&self) -> Result<T, FetchError> {
        let body = self.body.as_deref().unwrap_or_default();
        Ok(serde_json::from_slice(body)?)
    }
}

/// A builder for constructing HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    include_credentials: bool,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            include_credentials: false,
        }
    }

    /// Add a header, replacing any previous value for the same name.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
        self
    }

    /// Append a query parameter. Repeated keys are kept in order.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, FetchError> {
        let json = serde_json::to_vec(value)?;
        let mut builder = self.header("Content-Type", "application/json");
        builder.body = Some(json);
        Ok(builder)
    }

    /// Send cookies/session credentials with the request.
    pub fn with_credentials(mut self) -> Self {
        self.include_credentials = true;
        self
    }

    /// Set the Accept header.
    pub fn accept(self, content_type: impl Into<String>) -> Self {
        self.header("Accept", content_type)
    }

    /// Finish the request, encoding the query string onto the URL.
    pub fn build(self) -> Request {
        let url = if self.query.is_empty() {
            self.url
        } else {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            let separator = if self.url.contains('?') { '&' } else { '?' };
            format!("{}{}{}", self.url, separator, encoded)
        };

        Request {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
            include_credentials: self.include_credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_encoding() {
        let req = RequestBuilder::new(Method::Get, "https://shop.test/api/products")
            .query("category", "air cooler")
            .query("per_page", "100")
            .build();
        assert_eq!(
            req.url,
            "https://shop.test/api/products?category=air+cooler&per_page=100"
        );
    }

    #[test]
    fn test_query_appends_to_existing() {
        let req = RequestBuilder::new(Method::Get, "https://shop.test/cart?lang=en")
            .query("add-to-cart", "1")
            .query("add-to-cart", "2")
            .build();
        assert_eq!(req.url, "https://shop.test/cart?lang=en&add-to-cart=1&add-to-cart=2");
    }

    #[test]
    fn test_header_replaced_case_insensitively() {
        let req = RequestBuilder::new(Method::Get, "https://shop.test")
            .header("x-cart-nonce", "old")
            .header("X-Cart-Nonce", "new")
            .build();
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("X-CART-NONCE"), Some("new"));
    }

    #[test]
    fn test_json_body() {
        let req = RequestBuilder::new(Method::Post, "https://shop.test/cart/add-item")
            .json(&serde_json::json!({ "id": "5", "quantity": 1 }))
            .unwrap()
            .with_credentials()
            .build();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.include_credentials);
        let body: serde_json::Value = req.json_body().unwrap();
        assert_eq!(body["id"], "5");
    }
}
