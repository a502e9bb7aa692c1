//! Platform API access
//!
//! Transport, authenticated fetch, the request pipeline, error
//! classification and the typed queries built on top of them.

pub mod base;
pub mod classify;
pub mod client;
pub mod codes;
pub mod destiny;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod pipeline;
pub mod transport;

pub use classify::{classify, Connectivity, ErrorCategory, NetworkStatus};
pub use client::{ApiClient, ServerResponse, DEFAULT_API_BASE};
pub use codes::PlatformErrorCode;
pub use error::{ApiError, PlatformError, ServiceError};
pub use fetch::AuthenticatedFetcher;
pub use pipeline::{ApiRequest, Pipeline};
pub use transport::{Fetcher, HttpRequest, RawResponse, ReqwestFetcher};
