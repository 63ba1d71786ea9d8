//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sentiview_client::UploadMode;
use sentiview_core::{PeriodKey, SourceValue};

/// Sentiview - review sentiment dashboard data from the command line
#[derive(Parser, Debug)]
#[command(name = "sentiview", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SENTIVIEW_CONFIG")]
    pub config: Option<String>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load one chart and print its view model as JSON
    Fetch {
        /// Chart name (see `sentiview charts`)
        chart: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        chart_args: ChartFlags,
    },

    /// List chart names
    Charts,

    /// Show or change the persisted global filter
    Filters {
        #[command(subcommand)]
        action: FiltersAction,
    },

    /// Show or change the data sources
    Sources {
        /// New selection, comma separated (parsing, uploading)
        #[arg(long, value_delimiter = ',')]
        set: Option<Vec<SourceValue>>,
    },

    /// List every known tag
    Tags,

    /// Upload reviews from JSON files
    Upload {
        /// JSON files: `[{"id": 1, "text": "..."}]` or `{"data": [...]}`
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// How each file combines with the ones before it: `append` merges
        /// by id with later files winning, `replace` keeps only the last
        #[arg(long, default_value_t = UploadMode::Append)]
        mode: UploadMode,

        /// Upload date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `filters` subcommands.
#[derive(Subcommand, Debug)]
pub enum FiltersAction {
    /// Print the filter and the query it produces
    Show,
    /// Update the filter and persist it
    Set {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Clear every filter
    Reset,
    /// Acknowledge the backend's default date range
    Defaults,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Print a value by dotted key
    Get {
        /// Dotted key, e.g. `api.base_url`
        key: String,
    },
    /// Set a value by dotted key
    Set {
        /// Dotted key
        key: String,
        /// New value
        value: String,
    },
    /// Write a default config file
    Init {
        /// Target file (default: the resolved config path)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Global filter flags.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<String>,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<String>,

    /// Period preset: all, week, month, quarter, today, yesterday, custom
    #[arg(long)]
    pub period: Option<PeriodKey>,

    /// Tags, comma separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,

    /// Services, comma separated
    #[arg(long, value_delimiter = ',')]
    pub services: Option<Vec<String>>,

    /// Minimum rating
    #[arg(long)]
    pub rating: Option<f64>,

    /// Free-text filter
    #[arg(long)]
    pub text: Option<String>,

    /// Data sources, comma separated
    #[arg(long, value_delimiter = ',')]
    pub source: Option<Vec<SourceValue>>,
}

/// Chart-local flags.
#[derive(Args, Debug, Default, Clone)]
pub struct ChartFlags {
    /// Competitor bank for the dashboard charts
    #[arg(long)]
    pub concurrent: Option<String>,

    /// Single tag for finance and persona charts
    #[arg(long)]
    pub tag: Option<String>,

    /// Local tags for the tag timelines, comma separated
    #[arg(long, value_delimiter = ',')]
    pub local_tags: Vec<String>,

    /// Theme for the nearest-comments search
    #[arg(long)]
    pub theme: Option<String>,

    /// Review table page, one-based
    #[arg(long)]
    pub page: Option<u32>,

    /// Review table page size
    #[arg(long, default_value_t = 50)]
    pub page_size: u32,
}
