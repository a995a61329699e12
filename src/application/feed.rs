use crate::domain::models::Event;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_client::CalendarFeedClient;
use crate::infrastructure::ics_parser::parse_week_events;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    pub fn with_backoff(max_attempts: u8, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFailureKind {
    Unavailable,
    Unparseable,
    InvalidRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedFailure {
    pub kind: FeedFailureKind,
    pub message: String,
}

impl FeedFailure {
    fn from_error(error: InfraError) -> Self {
        let kind = match error {
            InfraError::FeedUnparseable(_) => FeedFailureKind::Unparseable,
            InfraError::InvalidInput(_) | InfraError::InvalidConfig(_) => {
                FeedFailureKind::InvalidRequest
            }
            InfraError::FeedUnavailable(_)
            | InfraError::UnknownCohort(_)
            | InfraError::Io(_)
            | InfraError::Json(_) => FeedFailureKind::Unavailable,
        };
        Self {
            kind,
            message: error.to_string(),
        }
    }
}

/// [`FeedOutcome::into_events`] collapses `Empty` and `Failed` to an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Loaded(Vec<Event>),
    Empty,
    Failed(FeedFailure),
}

impl FeedOutcome {
    pub fn into_events(self) -> Vec<Event> {
        match self {
            FeedOutcome::Loaded(events) => events,
            FeedOutcome::Empty | FeedOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn failure(&self) -> Option<&FeedFailure> {
        match self {
            FeedOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

pub struct FeedService<C>
where
    C: CalendarFeedClient + ?Sized,
{
    feed_client: Arc<C>,
    retry_policy: RetryPolicy,
}

impl<C> FeedService<C>
where
    C: CalendarFeedClient + ?Sized,
{
    pub fn new(feed_client: Arc<C>) -> Self {
        Self {
            feed_client,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub async fn load_week(&self, feed_url: &str, week_start: NaiveDate, tz: Tz) -> FeedOutcome {
        let document = match self.fetch_with_retry(feed_url).await {
            Ok(document) => document,
            Err(error) => {
                warn!(feed_url, error = %error, "calendar feed could not be fetched");
                return FeedOutcome::Failed(FeedFailure::from_error(error));
            }
        };

        match parse_week_events(&document, week_start, tz) {
            Ok(events) if events.is_empty() => {
                debug!(feed_url, %week_start, "calendar feed has no events this week");
                FeedOutcome::Empty
            }
            Ok(events) => {
                debug!(feed_url, %week_start, count = events.len(), "calendar feed loaded");
                FeedOutcome::Loaded(events)
            }
            Err(error) => {
                warn!(feed_url, error = %error, "calendar feed could not be parsed");
                FeedOutcome::Failed(FeedFailure::from_error(error))
            }
        }
    }

    async fn fetch_with_retry(&self, feed_url: &str) -> Result<String, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.feed_client.fetch_document(feed_url).await {
                Ok(document) => return Ok(document),
                Err(error) if Self::should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    debug!(attempt, delay_ms = delay, error = %error, "retrying calendar feed");
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn should_retry(error: &InfraError) -> bool {
        matches!(error, InfraError::FeedUnavailable(_))
    }
}
