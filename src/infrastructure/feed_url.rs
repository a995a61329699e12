use crate::domain::models::monday_of;
use crate::infrastructure::error::InfraError;
use chrono::{Duration, NaiveDate};
use url::Url;

const DATE_FORMAT: &str = "%Y-%m-%d";
const FIRST_DATE_PARAM: &str = "firstDate";

pub fn build_feed_url(
    base_url: &str,
    resources: &str,
    project_id: u32,
    week_start: NaiveDate,
) -> Result<Url, InfraError> {
    let resources = resources.trim();
    if resources.is_empty() {
        return Err(InfraError::InvalidConfig(
            "feed resources must not be empty".to_string(),
        ));
    }

    let monday = monday_of(week_start);
    let sunday = monday + Duration::days(6);
    let mut url = Url::parse(base_url.trim())
        .map_err(|error| InfraError::InvalidConfig(format!("invalid feed base url: {error}")))?;
    url.query_pairs_mut()
        .append_pair("resources", resources)
        .append_pair("projectId", &project_id.to_string())
        .append_pair("calType", "ical")
        .append_pair(FIRST_DATE_PARAM, &monday.format(DATE_FORMAT).to_string())
        .append_pair("lastDate", &sunday.format(DATE_FORMAT).to_string());
    Ok(url)
}

pub fn week_start_from_feed_url(feed_url: &str) -> Option<NaiveDate> {
    let url = Url::parse(feed_url.trim()).ok()?;
    let first_date = url
        .query_pairs()
        .find(|(key, _)| key == FIRST_DATE_PARAM)
        .map(|(_, value)| value.into_owned())?;
    NaiveDate::parse_from_str(first_date.trim(), DATE_FORMAT)
        .ok()
        .map(monday_of)
}
