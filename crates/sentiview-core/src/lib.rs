#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Sentiview Core
//!
//! Shared state and query composition for the Sentiview dashboard data layer:
//!
//! - [`filter`]: the global filter store (period, date range, tags, rating, text)
//! - [`source`]: the data-source selection store
//! - [`query`]: metric queries, parameter merging and request-key normalization
//! - [`format`]: ru-RU number formatting used by KPI cards and tables
//! - [`config`]: TOML configuration with environment overrides

pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod query;
pub mod source;

mod proptests;

// Re-exports for convenience
pub use config::SentiviewConfig;
pub use error::{Error, Result};
pub use filter::{DateRange, ExtraFilters, ExtraFiltersPatch, FilterState, FilterStore, PeriodKey};
pub use query::{MetricQuery, ParamValue, QueryParams, RawKey, RequestConfig, RequestKey, TagsStrategy};
pub use source::{SourceStore, SourceValue};
