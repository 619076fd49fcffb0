//! Backend inventory/sensor API client for OnTap.
//!
//! Every call is a single-shot async request that resolves with a value or
//! fails with a [`ClientError`] carrying a status classification.
//!
//! - `ResourceClient`: dyn-compatible trait consumed by the sync engine
//! - `HttpResourceClient`: reqwest implementation against the REST backend
//! - `MockResourceClient`: scripted in-memory implementation for tests
//!   (`mock` feature)

pub mod client;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{BoxFuture, ResourceClient};
pub use error::{ClientError, ClientResult};
pub use http::{HttpClientConfig, HttpResourceClient};
#[cfg(any(test, feature = "mock"))]
pub use mock::{Endpoint, MockResourceClient};
