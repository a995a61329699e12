use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait CalendarFeedClient: Send + Sync {
    async fn fetch_document(&self, feed_url: &str) -> Result<String, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestCalendarFeedClient {
    client: Client,
}

impl ReqwestCalendarFeedClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("calendar feed error: http {}", status.as_u16())
        } else {
            let excerpt: String = body.trim().chars().take(200).collect();
            format!("calendar feed error: http {}; body={excerpt}", status.as_u16())
        };
        InfraError::FeedUnavailable(message)
    }
}

#[async_trait]
impl CalendarFeedClient for ReqwestCalendarFeedClient {
    async fn fetch_document(&self, feed_url: &str) -> Result<String, InfraError> {
        let feed_url = feed_url.trim();
        if feed_url.is_empty() {
            return Err(InfraError::InvalidInput(
                "feed url must not be empty".to_string(),
            ));
        }

        let response = self.client.get(feed_url).send().await.map_err(|error| {
            InfraError::FeedUnavailable(format!("network error while fetching feed: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::FeedUnavailable(format!("failed reading feed response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_are_reported_as_unavailable() {
        let error = ReqwestCalendarFeedClient::http_error(reqwest::StatusCode::BAD_GATEWAY, "");
        match error {
            InfraError::FeedUnavailable(message) => assert!(message.contains("502")),
            other => panic!("expected unavailable feed, got {other:?}"),
        }

        let long_body = "x".repeat(500);
        let error =
            ReqwestCalendarFeedClient::http_error(reqwest::StatusCode::NOT_FOUND, &long_body);
        match error {
            InfraError::FeedUnavailable(message) => {
                assert!(message.contains("404"));
                assert!(message.len() < 300);
            }
            other => panic!("expected unavailable feed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_url_is_rejected_before_any_request() {
        let client = ReqwestCalendarFeedClient::new();
        let result = client.fetch_document("   ").await;
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));
    }
}
