use crate::domain::load::calculate_student_load;
use crate::domain::models::{
    duration_hours, Event, Interval, ManualBlock, Suggestion, WeeklySummary,
};
use chrono::Duration;

pub fn weekly_summary(
    events: &[Event],
    manual_blocks: &[ManualBlock],
    target_hours: f64,
) -> WeeklySummary {
    let load = calculate_student_load(events);
    let added_hours: f64 = manual_blocks.iter().map(Interval::hours).sum();
    let total_hours = load.occupied_hours + load.break_hours + added_hours;
    WeeklySummary {
        occupied_hours: load.occupied_hours,
        break_hours: load.break_hours,
        added_hours,
        total_hours,
        remaining_hours: (target_hours - total_hours).max(0.0),
    }
}

/// Sizes each free slot down to the hours still missing. Each suggestion is
/// sized independently, so accepting one shrinks the others only once the
/// summary is recomputed. Empty once the target is met.
pub fn suggest_blocks(free_slots: &[Interval], summary: &WeeklySummary) -> Vec<Suggestion> {
    if summary.is_target_met() {
        return Vec::new();
    }
    let remaining = Duration::seconds((summary.remaining_hours * 3600.0).round() as i64);
    free_slots
        .iter()
        .filter_map(|slot| {
            let length = slot.duration().min(remaining);
            let block = Interval::new(slot.start, slot.start + length).ok()?;
            Some(Suggestion {
                slot: *slot,
                block,
                hours: duration_hours(length),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::free_slots::find_free_slots;
    use crate::domain::models::WorkHours;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use chrono_tz::Europe::Paris;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    fn local(day_offset: i64, hour: u32, minute: u32) -> DateTime<Utc> {
        let date = monday() + Duration::days(day_offset);
        Paris
            .from_local_datetime(&date.and_hms_opt(hour, minute, 0).expect("valid time"))
            .single()
            .expect("unambiguous local time")
            .with_timezone(&Utc)
    }

    fn event(title: &str, day_offset: i64, from: (u32, u32), to: (u32, u32)) -> Event {
        Event {
            start: local(day_offset, from.0, from.1),
            end: local(day_offset, to.0, to.1),
            title: title.to_string(),
            description: Some("M1 MIAGE".to_string()),
        }
    }

    fn assert_hours(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected} hours, got {actual}"
        );
    }

    fn busy_week() -> Vec<Event> {
        (0..5)
            .flat_map(|day| {
                vec![
                    event("Algorithmique", day, (8, 0), (9, 20)),
                    event("Réseaux", day, (9, 32), (10, 52)),
                    event("Anglais", day, (11, 4), (12, 24)),
                ]
            })
            .collect()
    }

    #[test]
    fn empty_week_needs_the_whole_target() {
        let summary = weekly_summary(&[], &[], 35.0);
        assert_hours(summary.total_hours, 0.0);
        assert_hours(summary.remaining_hours, 35.0);
        assert!(!summary.is_target_met());
    }

    #[test]
    fn end_to_end_week_with_manual_block() {
        let events = busy_week();
        let manual = vec![
            Interval::new(local(2, 14, 0), local(2, 17, 0)).expect("valid manual block"),
        ];

        let summary = weekly_summary(&events, &manual, 35.0);
        assert_hours(summary.occupied_hours, 20.0);
        assert_hours(summary.break_hours, 2.0);
        assert_hours(summary.added_hours, 3.0);
        assert_hours(summary.total_hours, 25.0);
        assert_hours(summary.remaining_hours, 10.0);

        let slots = find_free_slots(&events, monday(), &manual, &WorkHours::default(), Paris);
        let suggestions = suggest_blocks(&slots, &summary);
        assert!(!suggestions.is_empty());
        assert!(suggestions.iter().all(|suggestion| suggestion.hours >= 0.5));
        for suggestion in &suggestions {
            assert!(suggestion.block.end <= suggestion.slot.end);
            assert!(suggestion.block.start == suggestion.slot.start);
        }
    }

    #[test]
    fn weekend_session_adds_load_but_not_free_slots() {
        let weekday = vec![event("Algorithmique", 0, (8, 0), (10, 0))];
        let mut with_saturday = weekday.clone();
        with_saturday.push(event("Rattrapage Réseaux", 5, (9, 0), (12, 0)));

        let summary = weekly_summary(&with_saturday, &[], 35.0);
        assert_hours(summary.occupied_hours, 5.0);
        assert_hours(summary.total_hours, 5.0);
        assert_hours(summary.remaining_hours, 30.0);

        let slots = find_free_slots(&with_saturday, monday(), &[], &WorkHours::default(), Paris);
        let weekday_slots = find_free_slots(&weekday, monday(), &[], &WorkHours::default(), Paris);
        assert_eq!(slots, weekday_slots);
        let saturday = monday() + Duration::days(5);
        assert!(slots
            .iter()
            .all(|slot| slot.start.with_timezone(&Paris).date_naive() < saturday));
    }

    #[test]
    fn manual_block_overlapping_a_session_is_counted_in_full() {
        let events = vec![event("Algorithmique", 0, (8, 0), (12, 0))];
        let manual =
            vec![Interval::new(local(0, 10, 0), local(0, 14, 0)).expect("valid manual block")];

        let summary = weekly_summary(&events, &manual, 35.0);
        assert_hours(summary.occupied_hours, 4.0);
        assert_hours(summary.break_hours, 0.0);
        assert_hours(summary.added_hours, 4.0);
        assert_hours(summary.total_hours, 8.0);
        assert_eq!(summary.occupied_hours, weekly_summary(&events, &[], 35.0).occupied_hours);
    }

    #[test]
    fn exceeding_the_target_clamps_remaining_to_zero() {
        let manual =
            vec![Interval::new(local(0, 8, 0), local(4, 18, 0)).expect("valid manual block")];
        let summary = weekly_summary(&[], &manual, 35.0);
        assert_hours(summary.remaining_hours, 0.0);
        assert!(summary.is_target_met());
        assert!(suggest_blocks(&[manual[0]], &summary).is_empty());
    }

    #[test]
    fn suggestions_are_capped_to_remaining_hours() {
        let summary = WeeklySummary {
            occupied_hours: 33.0,
            break_hours: 0.5,
            added_hours: 0.0,
            total_hours: 33.5,
            remaining_hours: 1.5,
        };
        let slots = vec![
            Interval::new(local(0, 8, 0), local(0, 18, 0)).expect("valid slot"),
            Interval::new(local(1, 8, 0), local(1, 9, 0)).expect("valid slot"),
        ];
        let suggestions = suggest_blocks(&slots, &summary);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].block.end, local(0, 9, 30));
        assert_hours(suggestions[0].hours, 1.5);
        assert_eq!(suggestions[1].block.end, local(1, 9, 0));
        assert_hours(suggestions[1].hours, 1.0);
    }
}
