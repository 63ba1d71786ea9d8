#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Sentiview Views
//!
//! Typed backend payloads and the pure functions that turn them into
//! chart-ready view models. Nothing here performs I/O.
//!
//! - [`line`]: key/value timeseries → line charts
//! - [`heatmap`]: tag correlation matrices and colour palettes
//! - [`pie`], [`scatter`], [`treemap`], [`pareto`], [`wordcloud`]
//! - [`kpi`]: KPI cards
//! - [`bars`]: cluster bars (sentiment histograms)
//! - [`reviews`]: comment table rows and counts
//! - [`search`]: theme search results
//! - [`filters`]: distinct tags and available filter values
//! - [`issues`]: critical issue lists
//! - [`palette`]: fixed line colours

pub mod bars;
pub mod filters;
pub mod heatmap;
pub mod issues;
pub mod kpi;
pub mod line;
pub mod palette;
pub mod pareto;
pub mod pie;
pub mod primitives;
pub mod reviews;
pub mod scatter;
pub mod search;
pub mod treemap;
pub mod wordcloud;

mod proptests;

pub use primitives::{Granularity, Id, MapContext, SentimentClass, TimeRange};
