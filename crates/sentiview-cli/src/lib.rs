//! # sentiview-cli
//!
//! Command-line front end for the Sentiview data layer:
//! - Load any catalog chart under the global filter and print it as JSON
//! - Inspect, change and persist the global filter and data sources
//! - Upload review files, appending or replacing across batches
//! - Manage the TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config_handlers;
pub mod error;

pub use error::{Error, Result};
