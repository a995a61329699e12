use crate::domain::models::{duration_hours, Event, Interval};
use crate::domain::title::are_similar;
use chrono::Duration;

/// Similar sessions starting closer than this to a kept session are
/// parallel group sessions and count once.
pub const PARALLEL_SESSION_WINDOW: Duration = Duration::hours(5);

/// Gaps between occupied blocks up to this length count toward the load.
pub const MAX_COUNTED_BREAK: Duration = Duration::minutes(15);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StudentLoad {
    pub occupied_hours: f64,
    pub break_hours: f64,
}

pub fn calculate_student_load(events: &[Event]) -> StudentLoad {
    if events.is_empty() {
        return StudentLoad::default();
    }

    let kept = dedupe_parallel_sessions(events);
    let merged = merge_intervals(kept.iter().map(|event| event.interval()).collect());

    let mut load = StudentLoad::default();
    for (index, block) in merged.iter().enumerate() {
        load.occupied_hours += block.hours();
        if index > 0 {
            let gap = block.start - merged[index - 1].end;
            if gap > Duration::zero() && gap <= MAX_COUNTED_BREAK {
                load.break_hours += duration_hours(gap);
            }
        }
    }
    load
}

/// Keeps the first session of every group of similar titles starting within
/// [`PARALLEL_SESSION_WINDOW`] of it. Returned in start order.
pub fn dedupe_parallel_sessions(events: &[Event]) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|event| event.start);

    let mut skipped = vec![false; sorted.len()];
    let mut kept = Vec::with_capacity(sorted.len());
    for index in 0..sorted.len() {
        if skipped[index] {
            continue;
        }
        let current = sorted[index];
        kept.push(current);

        for (offset, candidate) in sorted[index + 1..].iter().enumerate() {
            if candidate.start - current.start >= PARALLEL_SESSION_WINDOW {
                break;
            }
            if are_similar(&current.title, &candidate.title) {
                skipped[index + 1 + offset] = true;
            }
        }
    }

    kept.sort_by_key(|event| event.start);
    kept
}

/// Sorts by start and folds overlapping intervals into maximal blocks.
/// Intervals that merely touch stay separate.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|interval| interval.start);
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if interval.start < last.end {
                if interval.end > last.end {
                    last.end = interval.end;
                }
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn event(title: &str, start: &str, end: &str) -> Event {
        Event {
            start: at(start),
            end: at(end),
            title: title.to_string(),
            description: None,
        }
    }

    fn assert_hours(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected} hours, got {actual}"
        );
    }

    #[test]
    fn empty_week_has_no_load() {
        assert_eq!(calculate_student_load(&[]), StudentLoad::default());
    }

    #[test]
    fn weekend_session_counts_toward_load() {
        let events = vec![
            event("Algorithmique", "2026-02-16T08:00:00Z", "2026-02-16T10:00:00Z"),
            // Saturday.
            event("Rattrapage Réseaux", "2026-02-21T09:00:00Z", "2026-02-21T12:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.occupied_hours, 5.0);
        assert_hours(load.break_hours, 0.0);

        let saturday_only = calculate_student_load(&events[1..]);
        assert_hours(saturday_only.occupied_hours, 3.0);
    }

    #[test]
    fn parallel_group_session_is_dropped_from_load() {
        let events = vec![
            event("Algorithmique TD G1", "2026-02-16T08:00:00Z", "2026-02-16T10:00:00Z"),
            event("Algorithmique TD G2", "2026-02-16T09:00:00Z", "2026-02-16T11:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        // The second group is dropped entirely, so only the first 2h remain.
        assert_hours(load.occupied_hours, 2.0);
        assert_hours(load.break_hours, 0.0);
    }

    #[test]
    fn overlapping_distinct_courses_merge_into_one_block() {
        let events = vec![
            event("Algorithmique", "2026-02-16T08:00:00Z", "2026-02-16T10:00:00Z"),
            event("Bases de données", "2026-02-16T09:00:00Z", "2026-02-16T11:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.occupied_hours, 3.0);
    }

    #[test]
    fn duplicates_outside_window_are_counted_separately() {
        let events = vec![
            event("Algorithmique TD G1", "2026-02-16T08:00:00Z", "2026-02-16T10:00:00Z"),
            event("Algorithmique TD G2", "2026-02-16T14:00:00Z", "2026-02-16T16:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.occupied_hours, 4.0);
    }

    #[test]
    fn duplicate_exactly_at_window_edge_is_kept() {
        let events = vec![
            event("Anglais", "2026-02-16T08:00:00Z", "2026-02-16T09:00:00Z"),
            event("Anglais", "2026-02-16T13:00:00Z", "2026-02-16T14:00:00Z"),
        ];
        assert_eq!(dedupe_parallel_sessions(&events).len(), 2);
    }

    #[test]
    fn distinct_courses_within_window_are_not_deduplicated() {
        let events = vec![
            event("Algorithmique", "2026-02-16T08:00:00Z", "2026-02-16T09:00:00Z"),
            event("Bases de données", "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.occupied_hours, 2.0);
        assert_eq!(dedupe_parallel_sessions(&events).len(), 2);
    }

    #[test]
    fn short_gaps_count_as_breaks_and_long_gaps_do_not() {
        let events = vec![
            event("Algorithmique", "2026-02-16T08:00:00Z", "2026-02-16T09:00:00Z"),
            event("Bases de données", "2026-02-16T09:10:00Z", "2026-02-16T10:10:00Z"),
            event("Réseaux", "2026-02-16T10:30:00Z", "2026-02-16T11:30:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.occupied_hours, 3.0);
        assert_hours(load.break_hours, 10.0 / 60.0);
    }

    #[test]
    fn break_of_exactly_fifteen_minutes_counts() {
        let events = vec![
            event("Algorithmique", "2026-02-16T08:00:00Z", "2026-02-16T09:00:00Z"),
            event("Réseaux", "2026-02-16T09:15:00Z", "2026-02-16T10:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.break_hours, 0.25);
    }

    #[test]
    fn touching_sessions_add_no_break() {
        let events = vec![
            event("Algorithmique", "2026-02-16T08:00:00Z", "2026-02-16T09:00:00Z"),
            event("Réseaux", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z"),
        ];
        let load = calculate_student_load(&events);
        assert_hours(load.occupied_hours, 2.0);
        assert_hours(load.break_hours, 0.0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let events = vec![
            event("Réseaux", "2026-02-16T13:00:00Z", "2026-02-16T15:00:00Z"),
            event("Algorithmique TD G2", "2026-02-16T08:30:00Z", "2026-02-16T10:00:00Z"),
            event("Algorithmique TD G1", "2026-02-16T08:00:00Z", "2026-02-16T10:00:00Z"),
        ];
        let mut reversed = events.clone();
        reversed.reverse();
        assert_eq!(
            calculate_student_load(&events),
            calculate_student_load(&reversed)
        );
        assert_hours(calculate_student_load(&events).occupied_hours, 4.0);
    }

    #[test]
    fn merge_intervals_keeps_touching_intervals_apart() {
        let merged = merge_intervals(vec![
            Interval {
                start: at("2026-02-16T10:00:00Z"),
                end: at("2026-02-16T11:00:00Z"),
            },
            Interval {
                start: at("2026-02-16T08:00:00Z"),
                end: at("2026-02-16T10:00:00Z"),
            },
            Interval {
                start: at("2026-02-16T08:30:00Z"),
                end: at("2026-02-16T09:00:00Z"),
            },
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].end, at("2026-02-16T10:00:00Z"));
        assert_eq!(merged[1].start, at("2026-02-16T10:00:00Z"));
    }
}
