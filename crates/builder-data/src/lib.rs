//! HTTP client and store API contract for the bundle builder.
//!
//! Provides a small builder API over a pluggable transport, plus the typed
//! catalog-read and cart-write calls the selection engine drives.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use std::time::Duration;
//! use builder_data::{CatalogApi, EndpointConfig, ReqwestTransport, StoreClient};
//!
//! let transport = Rc::new(ReqwestTransport::new(Duration::from_secs(10))?);
//! let config = EndpointConfig::new("https://shop.example/api", "https://shop.example/cart")
//!     .with_request_nonce(nonce);
//! let store = StoreClient::new(transport, config);
//!
//! let cpus = store.fetch_category(&"cpu".into()).await?;
//! ```

mod client;
mod error;
mod request;
mod response;
mod store;
mod transport;

pub use client::{ClientRequestBuilder, FetchClient};
pub use error::FetchError;
pub use request::{Method, Request, RequestBuilder};
pub use response::Response;
pub use store::{
    BatchEndpoint, CartApi, CatalogApi, EndpointConfig, StoreClient, CART_NONCE_HEADER,
    REQUEST_NONCE_HEADER,
};
pub use transport::HttpTransport;

#[cfg(not(target_arch = "wasm32"))]
pub use transport::ReqwestTransport;

#[cfg(target_arch = "wasm32")]
pub use transport::SpinTransport;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BatchEndpoint, CartApi, CatalogApi, EndpointConfig, FetchError, HttpTransport, Response,
        StoreClient,
    };
}
