use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Below this many remaining hours the weekly target counts as met.
pub const TARGET_TOLERANCE_HOURS: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
}

impl Event {
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.interval().validate()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        let interval = Self { start, end };
        interval.validate()?;
        Ok(interval)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.end <= self.start {
            return Err("interval.end must be after interval.start".to_string());
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn hours(&self) -> f64 {
        duration_hours(self.duration())
    }
}

pub type ManualBlock = Interval;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeeklySummary {
    pub occupied_hours: f64,
    pub break_hours: f64,
    pub added_hours: f64,
    pub total_hours: f64,
    pub remaining_hours: f64,
}

impl WeeklySummary {
    pub fn course_hours(&self) -> f64 {
        self.occupied_hours + self.break_hours
    }

    pub fn is_target_met(&self) -> bool {
        self.remaining_hours <= TARGET_TOLERANCE_HOURS
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub slot: Interval,
    pub block: ManualBlock,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkHours {
    pub start: String,
    pub end: String,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            start: "08:00".to_string(),
            end: "18:00".to_string(),
        }
    }
}

impl WorkHours {
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.start, "policy.work_hours.start")?;
        validate_hhmm(&self.end, "policy.work_hours.end")?;
        if parse_hhmm(&self.end) <= parse_hhmm(&self.start) {
            return Err("policy.work_hours.end must be after policy.work_hours.start".to_string());
        }
        Ok(())
    }

    pub fn window_on(&self, date: NaiveDate, tz: Tz) -> Option<Interval> {
        let start = localize(tz, date.and_time(parse_hhmm(&self.start)?))?;
        let end = localize(tz, date.and_time(parse_hhmm(&self.end)?))?;
        Interval::new(start, end).ok()
    }
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn duration_hours(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 3600.0
}

/// Converts a local wall-clock time to UTC, taking the earlier instant for
/// ambiguous times and skipping forward over a DST gap.
pub fn localize(tz: Tz, local: chrono::NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(value) => Some(value.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match tz.from_local_datetime(&(local + Duration::hours(1))) {
            LocalResult::Single(value) => Some(value.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        },
    }
}

fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    let mut split = value.split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}
