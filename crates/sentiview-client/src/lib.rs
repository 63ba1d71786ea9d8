#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Sentiview Client
//!
//! The I/O half of the Sentiview data layer:
//!
//! - [`transport`]: the HTTP seam and its reqwest implementation
//! - [`fetcher`]: global-parameter injection, retries and decoding
//! - [`cache`]: keyed response cache with in-flight de-duplication
//! - [`block`]: chart blocks that follow the global filter
//! - [`pages`]: the chart catalog, one module per dashboard page
//! - [`upload`]: JSON review upload and data-mode switching

pub mod block;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod pages;
pub mod transport;
pub mod upload;

// Re-exports for convenience
pub use block::{Block, DynBlock, KeySpec, PropsBlock};
pub use cache::{QueryCache, QueryOptions, QueryOverrides, QueryState, SharedResult};
pub use client::SentiviewClient;
pub use config::ClientConfig;
pub use error::{Error, HttpError, Result};
pub use fetcher::{Fetcher, RetryPolicy};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use upload::{UploadItem, UploadMode, UploadResponse};
