use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ConsoleApiConfig;
use crate::error::{status_message, ConsoleApiError};
use crate::payload::{decode_feed_response, FeedRequest, FeedResponse};
use crate::retry::{is_retryable, retry_delay};
use crate::transport::FeedTransport;
use crate::url::feed_url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP client for the console feed endpoint.
///
/// Holds a single connection pool for the whole session so consecutive poll
/// cycles reuse the keep-alive connection.
#[derive(Debug)]
pub struct ConsoleFeedClient {
    http: Client,
    config: ConsoleApiConfig,
    feed_url: String,
}

impl ConsoleFeedClient {
    pub fn new(config: ConsoleApiConfig) -> Result<Self, ConsoleApiError> {
        let feed_url = feed_url(&config.endpoint, config.vps_id)?;
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            config,
            feed_url,
        })
    }

    pub fn config(&self) -> &ConsoleApiConfig {
        &self.config
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn build_request(&self, request: &FeedRequest) -> reqwest::RequestBuilder {
        self.http
            .post(&self.feed_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(request.to_form_body())
    }

    /// Single attempt: send, read the full body, decode.
    pub async fn send_once(&self, request: &FeedRequest) -> Result<FeedResponse, ConsoleApiError> {
        let response = self.build_request(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            status = status.as_u16(),
            sent_keys = request.keys.len(),
            body_len = body.len(),
            "console feed response"
        );

        if !status.is_success() {
            let message = status_message(status, &String::from_utf8_lossy(&body));
            return Err(ConsoleApiError::Status(status, message));
        }

        decode_feed_response(&body)
    }

    /// Send with up to `config.max_retries` additional attempts on retryable failures.
    pub async fn send_with_retry(
        &self,
        request: &FeedRequest,
    ) -> Result<FeedResponse, ConsoleApiError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.config.max_retries && is_retryable(&error) => {
                    let delay = retry_delay(attempt);
                    warn!(attempt, ?delay, %error, "console feed failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if attempt > 0 => {
                    return Err(ConsoleApiError::RetryExhausted {
                        attempts: attempt + 1,
                        last: Box::new(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl FeedTransport for ConsoleFeedClient {
    fn feed(
        &self,
        request: FeedRequest,
    ) -> impl Future<Output = Result<FeedResponse, ConsoleApiError>> {
        async move { self.send_with_retry(&request).await }
    }
}
