use crate::application::bootstrap::bootstrap_workspace;
use crate::application::feed::{FeedFailure, FeedOutcome, FeedService, RetryPolicy};
use crate::application::submission::{build_submission_draft, SubmissionDraft};
use crate::domain::cohort::infer_cohort_label;
use crate::domain::free_slots::find_free_slots;
use crate::domain::models::{localize, monday_of, Event, Interval, ManualBlock, Suggestion, WeeklySummary};
use crate::domain::summary::{suggest_blocks, weekly_summary};
use crate::infrastructure::block_store::{InMemoryManualBlockRepository, ManualBlockRepository};
use crate::infrastructure::config::ConfigBundle;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_client::{CalendarFeedClient, ReqwestCalendarFeedClient};
use crate::infrastructure::feed_url::{build_feed_url, week_start_from_feed_url};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

const MAX_TARGET_HOURS: f64 = 168.0;
const LOCAL_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

pub struct AppState {
    config_dir: PathBuf,
    config: ConfigBundle,
    feed_client: Arc<dyn CalendarFeedClient>,
    retry_policy: RetryPolicy,
    manual_blocks: Arc<dyn ManualBlockRepository>,
    runtime: Mutex<RuntimeState>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Ok(Self {
            config_dir: bootstrap.config_dir,
            config: bootstrap.config,
            feed_client: Arc::new(ReqwestCalendarFeedClient::new()),
            retry_policy: RetryPolicy::default(),
            manual_blocks: Arc::new(InMemoryManualBlockRepository::default()),
            runtime: Mutex::new(RuntimeState::default()),
        })
    }

    pub fn with_feed_client(mut self, feed_client: Arc<dyn CalendarFeedClient>) -> Self {
        self.feed_client = feed_client;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config(&self) -> &ConfigBundle {
        &self.config
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        error!(command, error = %error, "command failed");
        error.to_string()
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    weeks: HashMap<String, LoadedWeek>,
}

#[derive(Debug, Clone)]
struct LoadedWeek {
    feed_url: String,
    week_start: NaiveDate,
    target_hours: f64,
    events: Vec<Event>,
    cohort_label: String,
    feed: FeedStatusResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Cohort(String),
    Url(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CohortResponse {
    pub name: String,
    pub resources: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedStatusResponse {
    pub state: String,
    pub failure: Option<FeedFailure>,
}

impl FeedStatusResponse {
    fn from_outcome(outcome: &FeedOutcome) -> Self {
        let state = match outcome {
            FeedOutcome::Loaded(_) => "loaded",
            FeedOutcome::Empty => "empty",
            FeedOutcome::Failed(_) => "failed",
        };
        Self {
            state: state.to_string(),
            failure: outcome.failure().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ManualBlockResponse {
    pub index: usize,
    pub start: String,
    pub end: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekReportResponse {
    pub session_id: String,
    pub cohort_label: String,
    pub feed_url: String,
    pub week_start: String,
    pub feed: FeedStatusResponse,
    pub target_hours: f64,
    pub target_met: bool,
    pub summary: WeeklySummary,
    pub events: Vec<Event>,
    pub manual_blocks: Vec<ManualBlockResponse>,
    pub free_slots: Vec<Interval>,
    pub suggestions: Vec<Suggestion>,
    pub submission: Option<SubmissionDraft>,
}

pub fn list_cohorts_impl(state: &AppState) -> Result<Vec<CohortResponse>, InfraError> {
    Ok(state
        .config
        .cohorts
        .cohorts
        .iter()
        .map(|(name, resources)| CohortResponse {
            name: name.clone(),
            resources: resources.clone(),
        })
        .collect())
}

pub async fn load_week_impl(
    state: &AppState,
    session_id: String,
    source: FeedSource,
    week: Option<String>,
    target_hours: Option<f64>,
) -> Result<WeekReportResponse, InfraError> {
    let session_id = normalize_session_id(&session_id)?;
    let tz = state.config.timezone()?;
    let target_hours = resolve_target_hours(state, target_hours)?;

    let requested_week = week
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(parse_week_input)
        .transpose()?;

    let (feed_url, week_start) = match source {
        FeedSource::Cohort(name) => {
            let week_start = requested_week.unwrap_or_else(|| current_monday(tz));
            let resources = state.config.resources_for(&name)?;
            let url = build_feed_url(
                &state.config.app.feed_base_url,
                resources,
                state.config.app.project_id,
                week_start,
            )?;
            (url.to_string(), monday_of(week_start))
        }
        FeedSource::Url(url) => {
            let url = url.trim().to_string();
            if url.is_empty() {
                return Err(InfraError::InvalidInput(
                    "feed url must not be empty".to_string(),
                ));
            }
            let week_start = requested_week
                .or_else(|| week_start_from_feed_url(&url))
                .unwrap_or_else(|| current_monday(tz));
            (url, monday_of(week_start))
        }
    };

    let outcome = FeedService::new(Arc::clone(&state.feed_client))
        .with_retry_policy(state.retry_policy.clone())
        .load_week(&feed_url, week_start, tz)
        .await;
    let feed = FeedStatusResponse::from_outcome(&outcome);
    let events = outcome.into_events();
    let cohort_label = infer_cohort_label(&events);
    info!(
        session_id = %session_id,
        %week_start,
        events = events.len(),
        feed_state = %feed.state,
        "week loaded"
    );

    let loaded = LoadedWeek {
        feed_url,
        week_start,
        target_hours,
        events,
        cohort_label,
        feed,
    };
    let previous_week = {
        let mut runtime = lock_runtime(state)?;
        runtime
            .weeks
            .insert(session_id.clone(), loaded.clone())
            .map(|previous| previous.week_start)
    };
    if previous_week.is_some_and(|previous| previous != week_start) {
        state.manual_blocks.clear(&session_id)?;
    }

    build_report(state, &session_id, &loaded, tz)
}

pub fn weekly_report_impl(
    state: &AppState,
    session_id: String,
) -> Result<WeekReportResponse, InfraError> {
    let session_id = normalize_session_id(&session_id)?;
    let loaded = loaded_week(state, &session_id)?;
    build_report(state, &session_id, &loaded, state.config.timezone()?)
}

pub fn add_manual_block_impl(
    state: &AppState,
    session_id: String,
    start: String,
    end: String,
) -> Result<WeekReportResponse, InfraError> {
    let session_id = normalize_session_id(&session_id)?;
    let tz = state.config.timezone()?;
    let loaded = loaded_week(state, &session_id)?;
    let start = parse_datetime_input(&start, "start", tz)?;
    let end = parse_datetime_input(&end, "end", tz)?;
    let block = ManualBlock::new(start, end).map_err(InfraError::InvalidInput)?;

    state.manual_blocks.append(&session_id, block)?;
    build_report(state, &session_id, &loaded, tz)
}

pub fn accept_suggestion_impl(
    state: &AppState,
    session_id: String,
    index: usize,
) -> Result<WeekReportResponse, InfraError> {
    let session_id = normalize_session_id(&session_id)?;
    let tz = state.config.timezone()?;
    let loaded = loaded_week(state, &session_id)?;
    let report = build_report(state, &session_id, &loaded, tz)?;
    let suggestion = report.suggestions.get(index).ok_or_else(|| {
        InfraError::InvalidInput(format!(
            "suggestion index {index} is out of range ({} available)",
            report.suggestions.len()
        ))
    })?;

    state.manual_blocks.append(&session_id, suggestion.block)?;
    build_report(state, &session_id, &loaded, tz)
}

pub fn remove_manual_block_impl(
    state: &AppState,
    session_id: String,
    index: usize,
) -> Result<WeekReportResponse, InfraError> {
    let session_id = normalize_session_id(&session_id)?;
    let tz = state.config.timezone()?;
    let loaded = loaded_week(state, &session_id)?;
    if state.manual_blocks.remove_at(&session_id, index)?.is_none() {
        return Err(InfraError::InvalidInput(format!(
            "manual block index {index} is out of range"
        )));
    }
    build_report(state, &session_id, &loaded, tz)
}

pub fn list_manual_blocks_impl(
    state: &AppState,
    session_id: String,
) -> Result<Vec<ManualBlockResponse>, InfraError> {
    let session_id = normalize_session_id(&session_id)?;
    let tz = state.config.timezone()?;
    let blocks = state.manual_blocks.list(&session_id)?;
    Ok(to_block_responses(&blocks, tz))
}

pub fn submission_draft_impl(
    state: &AppState,
    session_id: String,
) -> Result<Option<SubmissionDraft>, InfraError> {
    Ok(weekly_report_impl(state, session_id)?.submission)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekEdits {
    /// `START/END` pairs, see [`add_manual_block_impl`].
    pub additions: Vec<String>,
    pub removals: Vec<usize>,
    pub acceptances: Vec<usize>,
}

/// Additions, then removals, then accepted suggestions. Each index refers to
/// the blocks or suggestions left by the previous edit.
pub fn apply_week_edits_impl(
    state: &AppState,
    session_id: String,
    edits: WeekEdits,
) -> Result<WeekReportResponse, InfraError> {
    for addition in &edits.additions {
        let (start, end) = addition.split_once('/').ok_or_else(|| {
            InfraError::InvalidInput(format!("manual block must be START/END, got '{addition}'"))
        })?;
        add_manual_block_impl(state, session_id.clone(), start.to_string(), end.to_string())?;
    }
    for &index in &edits.removals {
        remove_manual_block_impl(state, session_id.clone(), index)?;
    }
    for &index in &edits.acceptances {
        accept_suggestion_impl(state, session_id.clone(), index)?;
    }
    weekly_report_impl(state, session_id)
}

fn build_report(
    state: &AppState,
    session_id: &str,
    loaded: &LoadedWeek,
    tz: Tz,
) -> Result<WeekReportResponse, InfraError> {
    let blocks = state.manual_blocks.list(session_id)?;
    let summary = weekly_summary(&loaded.events, &blocks, loaded.target_hours);
    let free_slots = find_free_slots(
        &loaded.events,
        loaded.week_start,
        &blocks,
        &state.config.policies.work_hours,
        tz,
    );
    let suggestions = suggest_blocks(&free_slots, &summary);
    let submission = build_submission_draft(
        &loaded.cohort_label,
        loaded.week_start,
        &blocks,
        &summary,
        loaded.target_hours,
        tz,
        state.config.notification_recipient(),
    );

    Ok(WeekReportResponse {
        session_id: session_id.to_string(),
        cohort_label: loaded.cohort_label.clone(),
        feed_url: loaded.feed_url.clone(),
        week_start: loaded.week_start.format("%Y-%m-%d").to_string(),
        feed: loaded.feed.clone(),
        target_hours: loaded.target_hours,
        target_met: summary.is_target_met(),
        summary,
        events: loaded.events.clone(),
        manual_blocks: to_block_responses(&blocks, tz),
        free_slots,
        suggestions,
        submission,
    })
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime state lock poisoned: {error}")))
}

fn loaded_week(state: &AppState, session_id: &str) -> Result<LoadedWeek, InfraError> {
    lock_runtime(state)?
        .weeks
        .get(session_id)
        .cloned()
        .ok_or_else(|| {
            InfraError::InvalidInput(format!("no week loaded for session '{session_id}'"))
        })
}

fn normalize_session_id(session_id: &str) -> Result<String, InfraError> {
    let normalized = session_id.trim();
    if normalized.is_empty() {
        return Err(InfraError::InvalidInput(
            "session id must not be empty".to_string(),
        ));
    }
    Ok(normalized.to_string())
}

fn resolve_target_hours(state: &AppState, target_hours: Option<f64>) -> Result<f64, InfraError> {
    let target = target_hours.unwrap_or(state.config.policies.weekly_target_hours);
    if !(0.0..=MAX_TARGET_HOURS).contains(&target) {
        return Err(InfraError::InvalidInput(format!(
            "target hours must be within 0..={MAX_TARGET_HOURS}, got {target}"
        )));
    }
    Ok(target)
}

fn current_monday(tz: Tz) -> NaiveDate {
    monday_of(Utc::now().with_timezone(&tz).date_naive())
}

fn parse_week_input(value: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|error| InfraError::InvalidInput(format!("week must be YYYY-MM-DD: {error}")))
}

fn parse_datetime_input(value: &str, field_name: &str, tz: Tz) -> Result<DateTime<Utc>, InfraError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = LOCAL_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            InfraError::InvalidInput(format!(
                "{field_name} must be RFC3339 or YYYY-MM-DDTHH:MM, got '{value}'"
            ))
        })?;
    localize(tz, naive).ok_or_else(|| {
        InfraError::InvalidInput(format!("{field_name} '{value}' does not exist in {tz}"))
    })
}

fn to_block_responses(blocks: &[ManualBlock], tz: Tz) -> Vec<ManualBlockResponse> {
    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| ManualBlockResponse {
            index,
            start: block.start.with_timezone(&tz).to_rfc3339(),
            end: block.end.with_timezone(&tz).to_rfc3339(),
            hours: block.hours(),
        })
        .collect()
}
