//! Global filter store.
//!
//! Every chart on every page is filtered by one shared [`FilterState`]: a
//! period preset, an optional inclusive [`DateRange`] and a set of
//! [`ExtraFilters`] (tags, services, minimum rating, free text).
//! [`FilterStore`] owns that state, broadcasts changes over a watch channel
//! and persists itself as JSON under [`FILTERS_STORAGE_KEY`].
//!
//! # Usage
//!
//! ```rust
//! use sentiview_core::filter::{ExtraFiltersPatch, FilterStore, PeriodKey};
//!
//! let store = FilterStore::new();
//! assert_eq!(store.snapshot().period, PeriodKey::Custom);
//!
//! store.set_extra(ExtraFiltersPatch::default().tags(["cards"]));
//! store.set_period(PeriodKey::All);
//! assert!(store.period().is_none());
//! assert!(store.user_touched());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Storage key (and file stem) of the persisted filter state.
pub const FILTERS_STORAGE_KEY: &str = "global-filters-v1";

/// Range selected before the store is first touched.
pub const DEFAULT_CUSTOM_FROM: (i32, u32, u32) = (2024, 1, 1);
/// End of the range selected before the store is first touched.
pub const DEFAULT_CUSTOM_TO: (i32, u32, u32) = (2025, 5, 31);

// ============================================================================
// PeriodKey
// ============================================================================

/// Period presets offered by the filter bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKey {
    /// No date restriction.
    #[default]
    All,
    /// Monday through Sunday of the current week.
    Week,
    /// The current calendar month.
    Month,
    /// The current calendar quarter.
    Quarter,
    /// Today only.
    Today,
    /// Yesterday only.
    Yesterday,
    /// A user-picked range.
    Custom,
}

impl PeriodKey {
    /// Computes the range a preset covers relative to `today`.
    ///
    /// `All` and `Custom` have no intrinsic range.
    pub fn range_for(self, today: NaiveDate) -> Option<DateRange> {
        match self {
            PeriodKey::Today => Some(DateRange::single(today)),
            PeriodKey::Yesterday => today.pred_opt().map(DateRange::single),
            PeriodKey::Week => {
                let offset = u64::from(today.weekday().num_days_from_monday());
                let from = today.checked_sub_days(Days::new(offset))?;
                let to = from.checked_add_days(Days::new(6))?;
                Some(DateRange { from, to })
            }
            PeriodKey::Month => {
                let from = today.with_day(1)?;
                Some(DateRange {
                    from,
                    to: last_day_of_month(from)?,
                })
            }
            PeriodKey::Quarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                let from = NaiveDate::from_ymd_opt(today.year(), first_month, 1)?;
                let last_month = NaiveDate::from_ymd_opt(today.year(), first_month + 2, 1)?;
                Some(DateRange {
                    from,
                    to: last_day_of_month(last_month)?,
                })
            }
            PeriodKey::All | PeriodKey::Custom => None,
        }
    }

    /// Lower-case name as used on the wire and in the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKey::All => "all",
            PeriodKey::Week => "week",
            PeriodKey::Month => "month",
            PeriodKey::Quarter => "quarter",
            PeriodKey::Today => "today",
            PeriodKey::Yesterday => "yesterday",
            PeriodKey::Custom => "custom",
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PeriodKey::All),
            "week" => Ok(PeriodKey::Week),
            "month" => Ok(PeriodKey::Month),
            "quarter" => Ok(PeriodKey::Quarter),
            "today" => Ok(PeriodKey::Today),
            "yesterday" => Ok(PeriodKey::Yesterday),
            "custom" => Ok(PeriodKey::Custom),
            other => Err(Error::validation_field(
                "period",
                format!("unknown period '{other}'"),
            )),
        }
    }
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    first.checked_add_months(Months::new(1))?.pred_opt()
}

// ============================================================================
// DateRange
// ============================================================================

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day.
    pub from: NaiveDate,
    /// Last day (inclusive).
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::validation_field(
                "range",
                format!("range start {from} is after end {to}"),
            ));
        }
        Ok(Self { from, to })
    }

    /// A range covering one day.
    pub fn single(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// The `days`-long window ending today (`today - days ..= today`).
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let from = today.checked_sub_days(Days::new(days)).unwrap_or(today);
        Self { from, to: today }
    }

    /// The range used before any user interaction.
    pub fn default_custom() -> Option<Self> {
        let (fy, fm, fd) = DEFAULT_CUSTOM_FROM;
        let (ty, tm, td) = DEFAULT_CUSTOM_TO;
        Some(Self {
            from: NaiveDate::from_ymd_opt(fy, fm, fd)?,
            to: NaiveDate::from_ymd_opt(ty, tm, td)?,
        })
    }

    /// Start of `from` and end of `to` as UTC ISO-8601 timestamps.
    pub fn to_iso_pair(&self) -> (String, String) {
        let start = self.from.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .to
            .and_time(NaiveTime::MIN)
            .checked_add_signed(chrono::Duration::milliseconds(86_399_999))
            .unwrap_or_else(|| self.to.and_time(NaiveTime::MIN))
            .and_utc();
        (
            start.to_rfc3339_opts(SecondsFormat::Millis, true),
            end.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }

    /// Parses a pair of timestamps (or plain dates) back into a range.
    pub fn from_iso_pair(from: &str, to: &str) -> Result<Self> {
        Self::new(parse_day(from)?, parse_day(to)?)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar day.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| ts.date_naive())
        .map_err(|_| Error::invalid_date(trimmed))
}

// ============================================================================
// ExtraFilters
// ============================================================================

/// Non-date filters shared by every chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraFilters {
    /// Minimum rating; `None` means unset.
    pub rating: Option<f64>,
    /// Selected tags.
    pub tags: Vec<String>,
    /// Free-text filter (sent untrimmed).
    pub text: String,
    /// Selected services.
    pub services: Vec<String>,
    /// Explicit comment ids.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment_ids: Vec<String>,
    /// Competitor bank for the comparison page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<String>,
}

impl Default for ExtraFilters {
    fn default() -> Self {
        Self {
            rating: Some(0.0),
            tags: Vec::new(),
            text: String::new(),
            services: Vec::new(),
            comment_ids: Vec::new(),
            concurrent: None,
        }
    }
}

/// Partial update for [`ExtraFilters`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraFiltersPatch {
    /// New rating (`Some(None)` clears it).
    pub rating: Option<Option<f64>>,
    /// New tags.
    pub tags: Option<Vec<String>>,
    /// New text.
    pub text: Option<String>,
    /// New services.
    pub services: Option<Vec<String>>,
    /// New comment ids.
    pub comment_ids: Option<Vec<String>>,
    /// New competitor (`Some(None)` clears it).
    pub concurrent: Option<Option<String>>,
}

impl ExtraFiltersPatch {
    /// Sets the minimum rating.
    pub fn rating(mut self, rating: Option<f64>) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Sets the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the free-text filter.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the services.
    pub fn services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = Some(services.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the comment ids.
    pub fn comment_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the competitor.
    pub fn concurrent(mut self, concurrent: Option<String>) -> Self {
        self.concurrent = Some(concurrent);
        self
    }

    /// Returns `true` when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Shallow-merges the patch into `extra`.
    pub fn apply_to(self, extra: &mut ExtraFilters) {
        if let Some(rating) = self.rating {
            extra.rating = rating;
        }
        if let Some(tags) = self.tags {
            extra.tags = tags;
        }
        if let Some(text) = self.text {
            extra.text = text;
        }
        if let Some(services) = self.services {
            extra.services = services;
        }
        if let Some(ids) = self.comment_ids {
            extra.comment_ids = ids;
        }
        if let Some(concurrent) = self.concurrent {
            extra.concurrent = concurrent;
        }
    }
}

// ============================================================================
// FilterState
// ============================================================================

/// Current value of the global filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// Active period preset.
    pub period: PeriodKey,
    /// Active range, if any.
    pub range: Option<DateRange>,
    /// Non-date filters.
    pub extra: ExtraFilters,
}

impl FilterState {
    /// State before any user interaction: the default custom range.
    pub fn initial() -> Self {
        Self {
            period: PeriodKey::Custom,
            range: DateRange::default_custom(),
            extra: ExtraFilters::default(),
        }
    }

    /// State after [`FilterStore::reset`].
    pub fn cleared() -> Self {
        Self {
            period: PeriodKey::All,
            range: None,
            extra: ExtraFilters::default(),
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Filter state in the shape request builders consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestParams {
    /// Active period preset.
    pub period: PeriodKey,
    /// Start of the range as an ISO timestamp.
    pub from: Option<String>,
    /// End of the range as an ISO timestamp.
    pub to: Option<String>,
    /// Non-date filters.
    pub extra: ExtraFilters,
}

// ============================================================================
// FilterStore
// ============================================================================

/// Thread-safe handle to the global filter.
///
/// Cheap to clone (Arc internals). Every mutation is broadcast to all
/// subscribers via a watch channel.
#[derive(Clone)]
pub struct FilterStore {
    inner: Arc<FilterStoreInner>,
}

struct FilterStoreInner {
    tx: watch::Sender<FilterState>,
    is_hydrated: AtomicBool,
    initialized_with_defaults: AtomicBool,
    user_touched: AtomicBool,
}

impl FilterStore {
    /// Creates a store holding [`FilterState::initial`].
    pub fn new() -> Self {
        Self::with_state(FilterState::initial())
    }

    /// Creates a store holding `state`.
    pub fn with_state(state: FilterState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            inner: Arc::new(FilterStoreInner {
                tx,
                is_hydrated: AtomicBool::new(false),
                initialized_with_defaults: AtomicBool::new(false),
                user_touched: AtomicBool::new(false),
            }),
        }
    }

    /// Current filter value.
    pub fn snapshot(&self) -> FilterState {
        self.inner.tx.borrow().clone()
    }

    /// The active date range, if any.
    pub fn period(&self) -> Option<DateRange> {
        self.inner.tx.borrow().range
    }

    /// Whether persisted state has been loaded.
    pub fn is_hydrated(&self) -> bool {
        self.inner.is_hydrated.load(Ordering::SeqCst)
    }

    /// Whether backend default dates have been acknowledged.
    pub fn initialized_with_defaults(&self) -> bool {
        self.inner.initialized_with_defaults.load(Ordering::SeqCst)
    }

    /// Whether the user changed anything since the last reset.
    pub fn user_touched(&self) -> bool {
        self.inner.user_touched.load(Ordering::SeqCst)
    }

    /// Subscribe to filter changes.
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.inner.tx.subscribe()
    }

    /// Applies a preset relative to the local current date.
    pub fn set_period(&self, period: PeriodKey) {
        self.set_period_at(period, Local::now().date_naive());
    }

    /// Applies a preset relative to `today`.
    pub fn set_period_at(&self, period: PeriodKey, today: NaiveDate) {
        let range = period.range_for(today);
        log::debug!("Filter period → {period} ({range:?})");
        self.inner.tx.send_modify(|state| {
            state.period = period;
            state.range = range;
        });
        self.touch();
    }

    /// Sets an explicit range; the preset switches to `all`.
    pub fn set_range(&self, range: Option<DateRange>) {
        log::debug!("Filter range → {range:?}");
        self.inner.tx.send_modify(|state| {
            state.period = PeriodKey::All;
            state.range = range;
        });
        self.touch();
    }

    /// Merges a partial update into the extra filters.
    pub fn set_extra(&self, patch: ExtraFiltersPatch) {
        log::debug!("Filter extra patch → {patch:?}");
        self.inner.tx.send_modify(|state| patch.apply_to(&mut state.extra));
        self.touch();
    }

    /// Clears everything back to `all` with default extras.
    pub fn reset(&self) {
        log::info!("Filters reset");
        self.inner.tx.send_replace(FilterState::cleared());
        self.inner.user_touched.store(false, Ordering::SeqCst);
        self.inner
            .initialized_with_defaults
            .store(false, Ordering::SeqCst);
    }

    /// Acknowledges backend-provided default dates.
    ///
    /// Only marks the store as initialized when it is hydrated, not yet
    /// initialized and untouched; the range itself is never rewritten.
    /// Returns whether the flag was set.
    pub fn apply_default_dates(&self, defaults: Option<DateRange>) -> bool {
        if !self.is_hydrated() || self.initialized_with_defaults() || self.user_touched() {
            return false;
        }
        log::debug!("Default dates acknowledged: {defaults:?}");
        self.inner
            .initialized_with_defaults
            .store(true, Ordering::SeqCst);
        true
    }

    /// The filter in request-builder form.
    pub fn select_request_params(&self) -> RequestParams {
        let state = self.snapshot();
        let (from, to) = match state.range {
            Some(range) => {
                let (from, to) = range.to_iso_pair();
                (Some(from), Some(to))
            }
            None => (None, None),
        };
        RequestParams {
            period: state.period,
            from,
            to,
            extra: state.extra,
        }
    }

    fn touch(&self) {
        self.inner.user_touched.store(true, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Location of the persisted state inside `dir`.
    pub fn storage_path(dir: &Path) -> PathBuf {
        dir.join(format!("{FILTERS_STORAGE_KEY}.json"))
    }

    /// Writes the current state to `dir`, returning the file written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let state = self.snapshot();
        let persisted = PersistedFilters {
            value: Some(PersistedValue {
                period: Some(state.period),
                range: state.range.map(|r| r.to_iso_pair()),
                extra: Some(state.extra),
            }),
            initialized_with_defaults: self.initialized_with_defaults(),
            user_touched: self.user_touched(),
        };
        let path = Self::storage_path(dir);
        write_json(&path, &persisted)?;
        log::debug!("Saved filters to {}", path.display());
        Ok(path)
    }

    /// Loads persisted state from `dir`.
    ///
    /// A missing file keeps the current state. A file that cannot be read
    /// or parsed, and any missing field, falls back to cleared defaults.
    /// The store is always hydrated afterwards.
    pub fn hydrate(&self, dir: &Path) -> Result<()> {
        let path = Self::storage_path(dir);
        match read_optional(&path) {
            Ok(None) => log::debug!("No persisted filters at {}", path.display()),
            Ok(Some(raw)) => {
                let persisted = serde_json::from_str::<PersistedFilters>(&raw).unwrap_or_else(|e| {
                    log::warn!("Ignoring unreadable filters at {}: {e}", path.display());
                    PersistedFilters::default()
                });
                self.apply_persisted(persisted);
            }
            Err(e) => {
                log::warn!("Ignoring unreadable filters: {e}");
                self.apply_persisted(PersistedFilters::default());
            }
        }
        self.inner.is_hydrated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn apply_persisted(&self, persisted: PersistedFilters) {
        let value = persisted.value.unwrap_or_default();
        let range = value.range.and_then(|(from, to)| {
            DateRange::from_iso_pair(&from, &to)
                .map_err(|e| log::warn!("Dropping persisted range: {e}"))
                .ok()
        });
        self.inner.tx.send_replace(FilterState {
            period: value.period.unwrap_or_default(),
            range,
            extra: value.extra.unwrap_or_default(),
        });
        self.inner
            .initialized_with_defaults
            .store(persisted.initialized_with_defaults, Ordering::SeqCst);
        self.inner
            .user_touched
            .store(persisted.user_touched, Ordering::SeqCst);
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStore")
            .field("value", &*self.inner.tx.borrow())
            .field("is_hydrated", &self.is_hydrated())
            .field("user_touched", &self.user_touched())
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedFilters {
    #[serde(default)]
    value: Option<PersistedValue>,
    #[serde(default)]
    initialized_with_defaults: bool,
    #[serde(default)]
    user_touched: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedValue {
    #[serde(default)]
    period: Option<PeriodKey>,
    #[serde(default)]
    range: Option<(String, String)>,
    #[serde(default)]
    extra: Option<ExtraFilters>,
}

pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| Error::io(path, e))
}
