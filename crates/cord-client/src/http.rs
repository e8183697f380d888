//! REST collaborator
//!
//! Independent transport from the gateway socket. Exposes the generic
//! `request` contract plus thin typed helpers; rate-limit responses are
//! retried after the server-advised delay, up to a small budget.

use crate::error::HttpError;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Retries allowed for rate-limited requests before surfacing an error
const RATE_LIMIT_RETRIES: u32 = 3;

/// Fallback delay when a rate-limit response carries no retry_after
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Authenticated REST client for the platform API
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl RestClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, HttpError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    /// Issue one request and return the response body as JSON.
    ///
    /// Rate-limit responses (429) sleep for the advised `retry_after`
    /// and retry; other non-success statuses surface as [`HttpError::Api`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, HttpError> {
        let url = self.base.join(path.trim_start_matches('/'))?;

        for attempt in 0..=RATE_LIMIT_RETRIES {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("Authorization", format!("Bot {}", self.token));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let payload: Value = response.json().await.unwrap_or(Value::Null);
                let delay = payload
                    .get("retry_after")
                    .and_then(Value::as_f64)
                    .filter(|secs| *secs >= 0.0)
                    .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs_f64);
                tracing::warn!(
                    path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(HttpError::Unauthorized);
            }
            if status == StatusCode::FORBIDDEN {
                return Err(HttpError::Forbidden);
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(HttpError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return Ok(response.json().await?);
        }

        Err(HttpError::RateLimited {
            retries: RATE_LIMIT_RETRIES,
        })
    }

    /// GET a path and decode the response into a typed object
    pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let value = self.request(Method::GET, path, None).await?;
        serde_json::from_value(value).map_err(|e| HttpError::Api {
            status: 200,
            body: format!("response decode failed: {e}"),
        })
    }

    /// POST a JSON body to a path
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, HttpError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// DELETE a path
    pub async fn delete(&self, path: &str) -> Result<Value, HttpError> {
        self.request(Method::DELETE, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            RestClient::new("not a url", "t"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_path_joins_against_base() {
        let client = RestClient::new("https://api.test/v1/", "t").unwrap();
        let url = client.base.join("guilds/1").unwrap();
        assert_eq!(url.as_str(), "https://api.test/v1/guilds/1");
    }
}
