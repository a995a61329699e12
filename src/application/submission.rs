use crate::domain::models::{ManualBlock, WeeklySummary};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionDraft {
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    pub mailto: String,
}

pub fn build_submission_draft(
    cohort_label: &str,
    week_start: NaiveDate,
    manual_blocks: &[ManualBlock],
    summary: &WeeklySummary,
    target_hours: f64,
    tz: Tz,
    recipient: Option<&str>,
) -> Option<SubmissionDraft> {
    if !summary.is_target_met() {
        return None;
    }

    let week = week_start.format("%d/%m/%Y");
    let subject = format!("Saisie heures complémentaires [{cohort_label}] - Semaine du {week}");

    let mut body = format!(
        "Bonjour,\n\nConcernant la formation {cohort_label}, voici les créneaux complémentaires \
         à saisir pour la semaine du {week} :\n\n"
    );
    if manual_blocks.is_empty() {
        body.push_str(&format!(
            "Aucune heure supplémentaire à saisir cette semaine ({target_hours}h atteintes via l'emploi du temps).\n"
        ));
    } else {
        let mut sorted = manual_blocks.to_vec();
        sorted.sort_by_key(|block| block.start);
        for block in &sorted {
            let start = block.start.with_timezone(&tz);
            let end = block.end.with_timezone(&tz);
            body.push_str(&format!(
                "- {}: {} - {} ({:.2}h)\n",
                start.format("%d/%m"),
                start.format("%Hh%M"),
                end.format("%Hh%M"),
                block.hours()
            ));
        }
    }
    body.push_str("\nCordialement.");

    let recipient = recipient
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    let mailto = format!(
        "mailto:{}?subject={}&body={}",
        recipient.as_deref().unwrap_or_default(),
        urlencoding::encode(&subject),
        urlencoding::encode(&body)
    );

    Some(SubmissionDraft {
        recipient,
        subject,
        body,
        mailto,
    })
}
