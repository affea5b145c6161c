//! Transports that put a [`Request`] on the wire.
//!
//! Spin's outbound HTTP is used inside the WASM component; native builds
//! (the CLI, integration runs) go through `reqwest`.

use async_trait::async_trait;

use crate::{FetchError, Request, Response};

/// Sends one request and returns the raw response.
///
/// A non-2xx answer is still `Ok`; only failures to obtain a response at
/// all are errors.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, FetchError>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::ReqwestTransport;

#[cfg(target_arch = "wasm32")]
pub use spin::SpinTransport;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::HttpTransport;
    use crate::{FetchError, Method, Request, Response};

    /// Native transport with a persistent cookie store, so credentialed
    /// cart calls share one session.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(timeout: Duration) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .cookie_store(true)
                .timeout(timeout)
                .build()
                .map_err(|e| FetchError::RequestError(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait(?Send)]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: Request) -> Result<Response, FetchError> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
            };

            let mut builder = self.client.request(method, &request.url);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::RequestError(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::RequestError(e.to_string()))?;

            Ok(Response::new(status, headers, body.to_vec()))
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod spin {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use spin_sdk::http::{Method as SpinMethod, Request as SpinRequest, Response as SpinResponse};

    use super::HttpTransport;
    use crate::{FetchError, Method, Request, Response};

    /// Spin outbound HTTP. Credentials ride on the forwarded headers.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SpinTransport;

    #[async_trait(?Send)]
    impl HttpTransport for SpinTransport {
        async fn send(&self, request: Request) -> Result<Response, FetchError> {
            let method = match request.method {
                Method::Get => SpinMethod::Get,
                Method::Post => SpinMethod::Post,
            };

            let mut builder = SpinRequest::builder();
            builder.method(method);
            builder.uri(&request.url);
            for (key, value) in &request.headers {
                builder.header(key.as_str(), value.as_str());
            }
            let outgoing = builder.body(request.body.unwrap_or_default()).build();

            let response: SpinResponse = spin_sdk::http::send(outgoing)
                .await
                .map_err(|e| FetchError::RequestError(e.to_string()))?;

            let status = *response.status();
            let headers: HashMap<String, String> = response
                .headers()
                .map(|(k, v)| (k.to_string(), v.as_str().unwrap_or("").to_string()))
                .collect();

            Ok(Response::new(status, headers, response.into_body()))
        }
    }
}
