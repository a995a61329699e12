use crate::domain::load::merge_intervals;
use crate::domain::models::{monday_of, Event, Interval, ManualBlock, WorkHours};
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

/// Free gaps shorter than this are not worth suggesting.
pub const MIN_FREE_SLOT: Duration = Duration::minutes(30);

const WORKING_DAYS: i64 = 5;

/// Weekdays only; weekend constraints are ignored here but still count as load.
pub fn find_free_slots(
    events: &[Event],
    week_start: NaiveDate,
    manual_blocks: &[ManualBlock],
    work_hours: &WorkHours,
    tz: Tz,
) -> Vec<Interval> {
    let constraints: Vec<Interval> = events
        .iter()
        .map(Event::interval)
        .chain(manual_blocks.iter().copied())
        .collect();
    if constraints.is_empty() {
        return Vec::new();
    }
    let blocked = merge_intervals(constraints);

    let monday = monday_of(week_start);
    let mut slots = Vec::new();
    for day_offset in 0..WORKING_DAYS {
        let date = monday + Duration::days(day_offset);
        let Some(window) = work_hours.window_on(date, tz) else {
            continue;
        };
        let day_blocked = blocked
            .iter()
            .filter(|interval| interval.start.with_timezone(&tz).date_naive() == date);
        slots.extend(free_slots_in_window(window, day_blocked));
    }
    slots
}

fn free_slots_in_window<'a>(
    window: Interval,
    blocked: impl Iterator<Item = &'a Interval>,
) -> Vec<Interval> {
    let mut slots = Vec::new();
    let mut cursor = window.start;
    for interval in blocked {
        if interval.start >= window.end {
            break;
        }
        if interval.start > cursor && interval.start - cursor >= MIN_FREE_SLOT {
            slots.push(Interval {
                start: cursor,
                end: interval.start,
            });
        }
        if interval.end > cursor {
            cursor = interval.end;
        }
    }
    if window.end > cursor && window.end - cursor >= MIN_FREE_SLOT {
        slots.push(Interval {
            start: cursor,
            end: window.end,
        });
    }
    slots
}
