//! Command implementations.
//!
//! Each command works on a [`Session`]: a client whose filter and source
//! stores are hydrated from the state directory. Commands that change the
//! stores persist them before returning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use sentiview_client::pages::{self, ChartArgs, characteristics};
use sentiview_client::upload::normalize_payload;
use sentiview_client::{ClientConfig, ReqwestTransport, SentiviewClient, UploadItem, UploadMode, UploadResponse};
use sentiview_core::filter::parse_day;
use sentiview_core::query::select_global_query;
use sentiview_core::source::SourceState;
use sentiview_core::{DateRange, ExtraFiltersPatch, FilterState, FilterStore, MetricQuery, SentiviewConfig, SourceStore};
use sentiview_views::reviews::CommentTableQuery;

use crate::cli::{ChartFlags, Cli, Command, FilterArgs, FiltersAction};
use crate::config_handlers::handle_config_command;
use crate::error::{Error, Result};

// ============================================================================
// Entry point
// ============================================================================

/// Runs a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config { action } => Ok(handle_config_command(cli.config.as_deref(), action)?),
        command => {
            let config = SentiviewConfig::load(cli.config.as_deref())?;
            let session = Session::open(&config, cli.base_url.as_deref())?;
            execute(&session, command).await
        }
    }
}

async fn execute(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Fetch {
            chart,
            filters,
            chart_args,
        } => print_json(&fetch_chart(session, &chart, &filters, &chart_args).await?),
        Command::Charts => {
            for name in pages::CHART_NAMES {
                println!("{name}");
            }
            Ok(())
        }
        Command::Filters { action } => match action {
            FiltersAction::Show => print_json(&session.report()),
            FiltersAction::Set { filters } => {
                apply_filter_args(&session.client, &filters)?;
                session.save()?;
                print_json(&session.report())
            }
            FiltersAction::Reset => {
                session.client.filters().reset();
                session.save()?;
                print_json(&session.report())
            }
            FiltersAction::Defaults => print_json(&load_defaults(session).await?),
        },
        Command::Sources { set } => {
            if let Some(sources) = set {
                session.client.set_sources(sources);
                session.save()?;
            }
            print_json(&session.client.sources().snapshot())
        }
        Command::Tags => print_json(&distinct_tags(session).await?),
        Command::Upload { files, mode, date } => {
            print_json(&upload(session, &files, mode, date.as_deref()).await?)
        }
        Command::Config { .. } => Err(Error::usage("config commands do not take a session")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

/// A client plus the directory its stores persist to.
pub struct Session {
    /// The client.
    pub client: SentiviewClient,
    /// Where filters and sources are saved.
    pub state_dir: PathBuf,
}

/// What `filters show` prints.
#[derive(Debug, Serialize)]
pub struct FilterReport {
    /// Current filter.
    pub filters: FilterState,
    /// Selected sources and upload meta.
    pub sources: SourceState,
    /// The global query the filter produces.
    pub query: MetricQuery,
}

impl Session {
    /// Builds the client from config and hydrates its stores.
    pub fn open(config: &SentiviewConfig, base_url: Option<&str>) -> Result<Self> {
        let mut client_config = ClientConfig::from_config(config, |var| std::env::var(var).ok())?;
        if let Some(url) = base_url {
            client_config.base_url = url.to_string();
        }
        let transport = Arc::new(ReqwestTransport::new(&client_config)?);
        let client = SentiviewClient::with_transport(
            transport,
            FilterStore::new(),
            SourceStore::new(),
            client_config.defaults.clone(),
        );
        Self::hydrated(client, config.state_dir()?)
    }

    /// Hydrates `client`'s stores from `state_dir`.
    pub fn hydrated(client: SentiviewClient, state_dir: PathBuf) -> Result<Self> {
        client.filters().hydrate(&state_dir)?;
        client.sources().hydrate(&state_dir)?;
        tracing::debug!(dir = %state_dir.display(), "session state loaded");
        Ok(Self { client, state_dir })
    }

    /// Persists both stores.
    pub fn save(&self) -> Result<()> {
        self.client.filters().save(&self.state_dir)?;
        self.client.sources().save(&self.state_dir)?;
        Ok(())
    }

    /// The current filter, sources and resulting query.
    pub fn report(&self) -> FilterReport {
        let filters = self.client.filters().snapshot();
        let sources = self.client.sources().snapshot();
        let query = select_global_query(&filters, &sources.sources);
        FilterReport {
            filters,
            sources,
            query,
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Applies filter flags to the client's stores.
pub fn apply_filter_args(client: &SentiviewClient, args: &FilterArgs) -> Result<()> {
    let store = client.filters();
    if let Some(period) = args.period {
        store.set_period(period);
    }
    match (args.from.as_deref(), args.to.as_deref()) {
        (Some(from), to) => {
            let from = parse_day(from)?;
            let to = to.map(parse_day).transpose()?.unwrap_or(from);
            store.set_range(Some(DateRange::new(from, to)?));
        }
        (None, Some(_)) => return Err(Error::usage("--to needs --from")),
        (None, None) => {}
    }

    let mut patch = ExtraFiltersPatch::default();
    if let Some(rating) = args.rating {
        patch = patch.rating(Some(rating));
    }
    if let Some(tags) = &args.tags {
        patch = patch.tags(tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()));
    }
    if let Some(services) = &args.services {
        patch = patch.services(services.iter().cloned());
    }
    if let Some(text) = &args.text {
        patch = patch.text(text.as_str());
    }
    if !patch.is_empty() {
        store.set_extra(patch);
    }

    if let Some(sources) = &args.source {
        client.set_sources(sources.clone());
    }
    Ok(())
}

/// Chart inputs from the command line.
pub fn chart_args(flags: &ChartFlags) -> ChartArgs {
    let table = match flags.page {
        Some(page) => CommentTableQuery::default().with_page(page, flags.page_size),
        None => CommentTableQuery {
            limit: Some(flags.page_size),
            ..CommentTableQuery::default()
        },
    };
    ChartArgs {
        concurrent: flags.concurrent.clone(),
        tags: flags.local_tags.clone(),
        tag: flags.tag.clone(),
        theme: flags.theme.clone(),
        table,
    }
}

#[derive(Debug, Serialize)]
struct DefaultsReport {
    applied: bool,
    default_range: Option<DateRange>,
}

async fn load_defaults(session: &Session) -> Result<DefaultsReport> {
    let (values, applied) = session.client.load_filter_defaults().await?;
    if applied {
        session.save()?;
    }
    Ok(DefaultsReport {
        applied,
        default_range: values.value.default_range(),
    })
}

// ============================================================================
// Charts
// ============================================================================

/// Loads one chart with the given flags applied for this run only.
pub async fn fetch_chart(session: &Session, chart: &str, filters: &FilterArgs, flags: &ChartFlags) -> Result<Value> {
    apply_filter_args(&session.client, filters)?;
    let block = pages::chart(chart, &chart_args(flags))
        .ok_or_else(|| Error::usage(format!("unknown chart '{chart}', see `sentiview charts`")))?;
    tracing::info!(chart = block.name(), "fetching chart");
    Ok(block.load_json(&session.client).await?.unwrap_or(Value::Null))
}

async fn distinct_tags(session: &Session) -> Result<Vec<String>> {
    let tags = characteristics::distinct_tags().load(&session.client).await?;
    Ok(tags.map(|t| t.tags).unwrap_or_default())
}

// ============================================================================
// Upload
// ============================================================================

/// Reads and validates an upload file.
pub fn read_items(path: &Path) -> Result<Vec<UploadItem>> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Input {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&raw).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize_payload(&json)?)
}

/// Reads `files` in order, combining each with the previous ones per `mode`.
pub fn collect_items(files: &[PathBuf], mode: UploadMode) -> Result<Vec<UploadItem>> {
    let mut items = Vec::new();
    for file in files {
        items = mode.combine(items, read_items(file)?);
    }
    Ok(items)
}

/// The upload date: `date` if given, else today.
pub fn upload_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(raw) => Ok(parse_day(raw)?),
        None => Ok(Local::now().date_naive()),
    }
}

async fn upload(session: &Session, files: &[PathBuf], mode: UploadMode, date: Option<&str>) -> Result<UploadResponse> {
    let items = collect_items(files, mode)?;
    let date = upload_date(date)?;
    let response = session.client.upload_json(&items, date).await?;
    session.save()?;
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sentiview_core::{PeriodKey, SourceValue};

    fn session(dir: &tempfile::TempDir) -> Session {
        let client = SentiviewClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        Session::hydrated(client, dir.path().to_path_buf()).unwrap()
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    // ------------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------------

    #[test]
    fn test_apply_filter_args() {
        let dir = tempfile::TempDir::new().unwrap();
        let session = session(&dir);
        let args = FilterArgs {
            from: Some("2025-02-01".into()),
            to: Some("2025-02-28".into()),
            tags: Some(vec!["Кэшбэк".into(), " ".into()]),
            rating: Some(3.0),
            source: Some(vec![SourceValue::Uploading]),
            ..FilterArgs::default()
        };
        apply_filter_args(&session.client, &args).unwrap();

        let report = session.report();
        assert_eq!(report.filters.period, PeriodKey::All);
        assert_eq!(report.query.start_date.as_deref(), Some("2025-02-01"));
        assert_eq!(report.query.end_date.as_deref(), Some("2025-02-28"));
        assert_eq!(report.query.tags, Some(vec!["Кэшбэк".to_string()]));
        assert_eq!(report.query.min_rating, Some(3.0));
        assert_eq!(report.sources.sources, vec![SourceValue::Uploading]);
    }

    #[test]
    fn test_single_day_range() {
        let dir = tempfile::TempDir::new().unwrap();
        let session = session(&dir);
        let args = FilterArgs {
            from: Some("2025-03-08".into()),
            ..FilterArgs::default()
        };
        apply_filter_args(&session.client, &args).unwrap();
        let query = session.report().query;
        assert_eq!(query.start_date, query.end_date);
    }

    #[test]
    fn test_to_without_from_is_usage_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = FilterArgs {
            to: Some("2025-03-08".into()),
            ..FilterArgs::default()
        };
        let err = apply_filter_args(&session(&dir).client, &args).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = FilterArgs {
            from: Some("2025-03-08".into()),
            to: Some("2025-03-01".into()),
            ..FilterArgs::default()
        };
        assert!(apply_filter_args(&session(&dir).client, &args).is_err());
    }

    #[test]
    fn test_filters_persist_between_sessions() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let first = session(&dir);
            let args = FilterArgs {
                text: Some("ипотека".into()),
                ..FilterArgs::default()
            };
            apply_filter_args(&first.client, &args).unwrap();
            first.save().unwrap();
        }
        let second = session(&dir);
        assert_eq!(second.report().filters.extra.text, "ипотека");
    }

    #[test]
    fn test_chart_args_paging() {
        let flags = ChartFlags {
            page: Some(3),
            page_size: 20,
            ..ChartFlags::default()
        };
        let args = chart_args(&flags);
        assert_eq!(args.table.offset, Some(40));

        let args = chart_args(&ChartFlags { page_size: 10, ..ChartFlags::default() });
        assert_eq!(args.table.limit, Some(10));
        assert_eq!(args.table.offset, Some(0));
    }

    #[test]
    fn test_chart_args_concurrent() {
        let flags = ChartFlags {
            concurrent: Some("Сбер".into()),
            ..ChartFlags::default()
        };
        assert_eq!(chart_args(&flags).concurrent.as_deref(), Some("Сбер"));
        assert!(chart_args(&ChartFlags::default()).concurrent.is_none());
    }

    #[tokio::test]
    async fn test_fetch_unknown_chart() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = fetch_chart(&session(&dir), "nope", &FilterArgs::default(), &ChartFlags::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown chart"));
    }

    // ------------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------------

    #[test]
    fn test_collect_items_merges_by_id() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = write(&dir, "a.json", r#"[{"id": 1, "text": "old"}, {"id": 2, "text": "b"}]"#);
        let second = write(&dir, "b.json", r#"{"data": [{"id": 1, "text": "new"}, {"id": 3, "text": "c"}]}"#);

        let files = vec![first, second];

        let items = collect_items(&files, UploadMode::Append).unwrap();
        let texts: Vec<_> = items.iter().map(|i| (i.id, i.text.as_str())).collect();
        assert_eq!(texts, vec![(1, "new"), (2, "b"), (3, "c")]);

        let items = collect_items(&files, UploadMode::Replace).unwrap();
        let texts: Vec<_> = items.iter().map(|i| (i.id, i.text.as_str())).collect();
        assert_eq!(texts, vec![(1, "new"), (3, "c")]);
    }

    #[test]
    fn test_read_items_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let bad_json = write(&dir, "bad.json", "{not json");
        assert!(matches!(read_items(&bad_json).unwrap_err(), Error::Json { .. }));

        let bad_shape = write(&dir, "shape.json", r#"[{"id": "x", "text": "a"}]"#);
        assert!(matches!(read_items(&bad_shape).unwrap_err(), Error::Client(_)));

        let missing = dir.path().join("missing.json");
        assert!(matches!(read_items(&missing).unwrap_err(), Error::Input { .. }));
    }

    #[test]
    fn test_upload_date() {
        assert_eq!(
            upload_date(Some("2025-06-01")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert!(upload_date(Some("01.06.2025")).is_err());
        assert!(upload_date(None).is_ok());
    }
}
