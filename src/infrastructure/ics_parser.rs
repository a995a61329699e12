use crate::domain::models::{localize, Event, Interval};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use tracing::debug;

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const PARAM_TZID: &str = "TZID";
const PARAM_VALUE: &str = "VALUE";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CalendarTime {
    Timed(DateTime<Utc>),
    DateOnly,
}

/// `[Monday 00:00, next Monday 00:00)` in local time.
pub fn week_window(week_start: NaiveDate, tz: Tz) -> Result<Interval, InfraError> {
    let start = local_midnight(week_start, tz)?;
    let end = local_midnight(week_start + Duration::days(7), tz)?;
    Interval::new(start, end).map_err(InfraError::InvalidInput)
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, InfraError> {
    localize(tz, date.and_time(chrono::NaiveTime::MIN))
        .ok_or_else(|| InfraError::InvalidInput(format!("no local midnight on {date} in {tz}")))
}

pub fn parse_week_events(
    document: &str,
    week_start: NaiveDate,
    tz: Tz,
) -> Result<Vec<Event>, InfraError> {
    let window = week_window(week_start, tz)?;
    let reader = ical::IcalParser::new(document.as_bytes());

    let mut calendars = 0usize;
    let mut events = Vec::new();
    for calendar in reader {
        let calendar = calendar
            .map_err(|error| InfraError::FeedUnparseable(format!("iCalendar parse error: {error}")))?;
        calendars += 1;
        for component in &calendar.events {
            let Some(event) = decode_event(component) else {
                continue;
            };
            if event.start >= window.start && event.start < window.end {
                events.push(event);
            }
        }
    }

    if calendars == 0 {
        return Err(InfraError::FeedUnparseable(
            "document contains no VCALENDAR".to_string(),
        ));
    }
    Ok(events)
}

fn decode_event(component: &IcalEvent) -> Option<Event> {
    let mut start = None;
    let mut end = None;
    let mut title = String::new();
    let mut description = None;

    for property in &component.properties {
        match property.name.to_ascii_uppercase().as_str() {
            "DTSTART" => start = Some(parse_calendar_time(property)),
            "DTEND" => end = Some(parse_calendar_time(property)),
            "SUMMARY" => title = property.value.as_deref().map(unescape_text).unwrap_or_default(),
            "DESCRIPTION" => description = property.value.as_deref().map(unescape_text),
            _ => {}
        }
    }

    let start = match start {
        Some(Ok(CalendarTime::Timed(start))) => start,
        Some(Ok(CalendarTime::DateOnly)) => {
            debug!(title = %title, "dropping all-day calendar entry");
            return None;
        }
        Some(Err(error)) => {
            debug!(title = %title, error = %error, "dropping event with invalid DTSTART");
            return None;
        }
        None => {
            debug!(title = %title, "dropping event without DTSTART");
            return None;
        }
    };
    let Some(Ok(CalendarTime::Timed(end))) = end else {
        debug!(title = %title, "dropping event without a timed DTEND");
        return None;
    };

    let event = Event {
        start,
        end,
        title,
        description,
    };
    if let Err(error) = event.validate() {
        debug!(title = %event.title, error = %error, "dropping event with empty time range");
        return None;
    }
    Some(event)
}

fn parse_calendar_time(property: &Property) -> Result<CalendarTime, String> {
    let value = property
        .value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("{} has no value", property.name))?;

    let is_date_param = param(property, PARAM_VALUE)
        .map(|kind| kind.eq_ignore_ascii_case("DATE"))
        .unwrap_or(false);
    if is_date_param || !value.contains('T') {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(|_| CalendarTime::DateOnly)
            .map_err(|error| format!("invalid date '{value}': {error}"));
    }

    if let Some(utc_value) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        let naive = parse_naive(utc_value)?;
        return Ok(CalendarTime::Timed(Utc.from_utc_datetime(&naive)));
    }

    let naive = parse_naive(value)?;
    let zone = param(property, PARAM_TZID).and_then(|name| name.trim().parse::<Tz>().ok());
    match zone {
        Some(zone) => localize(zone, naive)
            .map(CalendarTime::Timed)
            .ok_or_else(|| format!("'{value}' does not exist in {zone}")),
        // Floating times are read as UTC.
        None => Ok(CalendarTime::Timed(Utc.from_utc_datetime(&naive))),
    }
}

fn parse_naive(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .map_err(|error| format!("invalid date-time '{value}': {error}"))
}

fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|value| value.trim_matches('"'))
}

fn unescape_text(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}
