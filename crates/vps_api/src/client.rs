use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::{VpsApiConfig, AUTH_TOKEN_HEADER};
use crate::error::VpsApiError;
use crate::schema::{parse_console_token, parse_vps_show, Envelope, IssuedToken, VpsLocation};

const JSON_CONTENT_TYPE: &str = "application/json";

fn resource_base(base_url: &str, version: &str) -> Result<String, VpsApiError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(VpsApiError::InvalidUrl("API URL is empty".to_owned()));
    }
    let version = version.trim().trim_start_matches('v');
    Ok(format!("{trimmed}/v{version}"))
}

fn checked(url: String) -> Result<Url, VpsApiError> {
    let parsed = Url::parse(&url).map_err(|err| VpsApiError::InvalidUrl(format!("{url}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(VpsApiError::InvalidUrl(format!(
            "unsupported scheme '{other}' in {url}"
        ))),
    }
}

/// `GET` target showing a VPS together with its node and location.
pub fn vps_url(base_url: &str, version: &str, vps_id: u64) -> Result<Url, VpsApiError> {
    let mut url = checked(format!("{}/vpses/{vps_id}", resource_base(base_url, version)?))?;
    url.query_pairs_mut()
        .append_pair("_meta[includes]", "node__location");
    Ok(url)
}

/// `POST` target issuing a console token for a VPS.
pub fn console_token_url(base_url: &str, version: &str, vps_id: u64) -> Result<Url, VpsApiError> {
    checked(format!(
        "{}/vpses/{vps_id}/console_token",
        resource_base(base_url, version)?
    ))
}

#[derive(Debug)]
pub struct VpsApiClient {
    http: Client,
    config: VpsApiConfig,
}

impl VpsApiClient {
    pub fn new(config: VpsApiConfig) -> Result<Self, VpsApiError> {
        resource_base(&config.base_url, &config.version)?;
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &VpsApiConfig {
        &self.config
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(ACCEPT, JSON_CONTENT_TYPE);
        match &self.config.auth_token {
            Some(token) => builder.header(AUTH_TOKEN_HEADER, token),
            None => builder,
        }
    }

    pub fn locate_request(&self, vps_id: u64) -> Result<RequestBuilder, VpsApiError> {
        let url = vps_url(&self.config.base_url, &self.config.version, vps_id)?;
        Ok(self.authorize(self.http.get(url)))
    }

    pub fn console_token_request(&self, vps_id: u64) -> Result<RequestBuilder, VpsApiError> {
        let url = console_token_url(&self.config.base_url, &self.config.version, vps_id)?;
        let body = serde_json::to_vec(&json!({ "console_token": {} }))?;
        Ok(self
            .authorize(self.http.post(url))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body))
    }

    /// Find the node hosting `vps_id` and its console router.
    pub async fn locate(&self, vps_id: u64) -> Result<VpsLocation, VpsApiError> {
        let body = self.send(self.locate_request(vps_id)?).await?;
        let location = parse_vps_show(&body)?;
        debug!(vps_id, node = %location.node_domain, "located VPS");
        Ok(location)
    }

    /// Issue a fresh console token for `vps_id`.
    pub async fn issue_console_token(&self, vps_id: u64) -> Result<IssuedToken, VpsApiError> {
        let body = self.send(self.console_token_request(vps_id)?).await?;
        let token = parse_console_token(&body)?;
        debug!(vps_id, expiration = %token.expiration, "issued console token");
        Ok(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, VpsApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), body_len = body.len(), "API response");

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(status_error(status, &body))
        }
    }
}

/// Prefer the envelope's own failure message; HaveAPI sends one with most
/// error statuses.
fn status_error(status: StatusCode, body: &[u8]) -> VpsApiError {
    if let Ok(envelope) = serde_json::from_slice::<Envelope<serde_json::Value>>(body) {
        if let Err(err @ VpsApiError::Api(_)) = envelope.into_result("response") {
            return err;
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    let message = if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text
    };
    VpsApiError::Status(status, message)
}
