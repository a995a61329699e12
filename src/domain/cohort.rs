use crate::domain::models::Event;
use std::collections::HashMap;

/// A word joins the label when it appears at its position in more than this
/// share of description lines.
pub const COHORT_LABEL_THRESHOLD: f64 = 0.7;

pub const FALLBACK_COHORT_LABEL: &str = "Formation";

/// Derives a programme name from the leading words the event descriptions
/// have in common.
pub fn infer_cohort_label(events: &[Event]) -> String {
    let lines: Vec<&str> = events
        .iter()
        .filter_map(|event| event.description.as_deref())
        .filter_map(first_non_blank_line)
        .collect();
    if lines.is_empty() {
        return FALLBACK_COHORT_LABEL.to_string();
    }

    let tokenized: Vec<Vec<&str>> = lines
        .iter()
        .map(|line| line.split_whitespace().collect())
        .collect();
    let total_lines = lines.len() as f64;

    let mut common_words = Vec::new();
    for position in 0.. {
        let words_at_position: Vec<&str> = tokenized
            .iter()
            .filter_map(|words| words.get(position).copied())
            .collect();
        let Some((word, count)) = most_frequent(&words_at_position) else {
            break;
        };
        if count as f64 / total_lines > COHORT_LABEL_THRESHOLD {
            common_words.push(word);
        } else {
            break;
        }
    }

    let label = common_words
        .join(" ")
        .trim_matches(is_label_separator)
        .to_string();
    if !label.is_empty() {
        return label;
    }

    most_frequent(&lines)
        .map(|(line, _)| line.to_string())
        .unwrap_or_else(|| FALLBACK_COHORT_LABEL.to_string())
}

fn is_label_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '_' | '-' | '\u{2010}'..='\u{2015}')
}

fn first_non_blank_line(description: &str) -> Option<&str> {
    description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

fn most_frequent<'a>(values: &[&'a str]) -> Option<(&'a str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut best: Option<(&'a str, usize)> = None;
    for &value in values {
        let count = counts.get(value).copied().unwrap_or(0);
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn with_description(description: Option<&str>) -> Event {
        let start = DateTime::parse_from_rfc3339("2026-02-16T08:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        Event {
            start,
            end: start + chrono::Duration::hours(1),
            title: "Cours".to_string(),
            description: description.map(ToOwned::to_owned),
        }
    }

    fn events(descriptions: &[&str]) -> Vec<Event> {
        descriptions
            .iter()
            .map(|description| with_description(Some(description)))
            .collect()
    }

    #[test]
    fn common_leading_words_form_the_label() {
        let events = events(&[
            "\nM1 MIAGE — Algorithmique\nDUPONT Jean",
            "M1 MIAGE — Réseaux\n",
            "M1 MIAGE — Anglais",
            "M1 MIAGE Bases de données",
        ]);
        assert_eq!(infer_cohort_label(&events), "M1 MIAGE");
    }

    #[test]
    fn minority_lines_do_not_break_the_prefix() {
        let events = events(&[
            "M1 MIAGE groupe A",
            "M1 MIAGE groupe B",
            "M1 MIAGE groupe C",
            "M1 MIAGE",
            "Réunion de rentrée",
        ]);
        // 4 of 5 lines share "M1 MIAGE"; position 2 has "groupe" in 3 of 5.
        assert_eq!(infer_cohort_label(&events), "M1 MIAGE");
    }

    #[test]
    fn prefix_shared_by_exactly_seventy_percent_is_not_enough() {
        let mut lines = vec![
            "L3 Info", "L3 Maths", "L3 Info", "L3 Physique", "L3 Info", "L3 Chimie", "L3 Bio",
            "M1 MIAGE", "M2 Data", "DU Cyber",
        ];
        // 7 of 10 lines start with "L3".
        assert_eq!(infer_cohort_label(&events(&lines)), "L3 Info");

        // 8 of 10 lines.
        lines[9] = "L3 Géo";
        assert_eq!(infer_cohort_label(&events(&lines)), "L3");
    }

    #[test]
    fn separators_are_trimmed_from_the_label() {
        let events = events(&["L3 - Info", "L3 - Maths", "L3 - Physique"]);
        assert_eq!(infer_cohort_label(&events), "L3");
    }

    #[test]
    fn falls_back_to_most_frequent_line_without_common_prefix() {
        let events = events(&["Alpha", "Beta", "Beta", "Gamma"]);
        assert_eq!(infer_cohort_label(&events), "Beta");
    }

    #[test]
    fn tie_on_whole_lines_goes_to_first_seen() {
        let events = events(&["Alpha one", "Beta two", "Gamma three"]);
        assert_eq!(infer_cohort_label(&events), "Alpha one");
    }

    #[test]
    fn missing_or_blank_descriptions_use_fallback() {
        assert_eq!(infer_cohort_label(&[]), FALLBACK_COHORT_LABEL);
        let events = vec![with_description(None), with_description(Some("  \n \n"))];
        assert_eq!(infer_cohort_label(&events), FALLBACK_COHORT_LABEL);
    }

    #[test]
    fn separator_only_prefix_falls_back_to_line() {
        let events = events(&["- Alpha", "- Beta", "- Beta"]);
        assert_eq!(infer_cohort_label(&events), "- Beta");
    }
}
