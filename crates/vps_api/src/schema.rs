//! Response shapes of the VPS management API.

use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::VpsApiError;

/// Every HaveAPI answer is wrapped in this envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub response: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl<T> Envelope<T> {
    pub fn into_result(self, field: &'static str) -> Result<T, VpsApiError> {
        if !self.status {
            return Err(VpsApiError::Api(failure_message(
                self.message.as_deref(),
                self.errors.as_ref(),
            )));
        }
        self.response.ok_or(VpsApiError::MissingField(field))
    }
}

fn failure_message(message: Option<&str>, errors: Option<&Value>) -> String {
    let mut text = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("request failed")
        .to_string();

    if let Some(Value::Object(fields)) = errors {
        let details: Vec<String> = fields
            .iter()
            .map(|(name, value)| match value {
                Value::Array(items) => {
                    let items: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                    format!("{name}: {}", items.join(", "))
                }
                other => format!("{name}: {other}"),
            })
            .collect();
        if !details.is_empty() {
            text.push_str(" (");
            text.push_str(&details.join("; "));
            text.push(')');
        }
    }
    text
}

#[derive(Debug, Deserialize)]
pub struct VpsShow {
    pub vps: Vps,
}

#[derive(Debug, Deserialize)]
pub struct Vps {
    pub id: u64,
    pub node: Option<Node>,
}

#[derive(Debug, Deserialize)]
pub struct Node {
    pub domain_name: String,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub label: String,
    pub remote_console_server: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsoleTokenCreate {
    pub console_token: ConsoleToken,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConsoleToken {
    pub token: String,
    pub expiration: String,
}

/// Where a VPS lives and how to reach its console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpsLocation {
    pub vps_id: u64,
    pub node_domain: String,
    pub location_label: String,
    pub console_server: String,
}

impl TryFrom<Vps> for VpsLocation {
    type Error = VpsApiError;

    fn try_from(vps: Vps) -> Result<Self, Self::Error> {
        let node = vps.node.ok_or(VpsApiError::MissingField("vps.node"))?;
        let location = node
            .location
            .ok_or(VpsApiError::MissingField("vps.node.location"))?;
        let console_server = location
            .remote_console_server
            .filter(|url| !url.trim().is_empty())
            .ok_or(VpsApiError::MissingField(
                "vps.node.location.remote_console_server",
            ))?;
        Ok(Self {
            vps_id: vps.id,
            node_domain: node.domain_name,
            location_label: location.label,
            console_server,
        })
    }
}

/// A console token with its parsed expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expiration: OffsetDateTime,
}

impl TryFrom<ConsoleToken> for IssuedToken {
    type Error = VpsApiError;

    fn try_from(raw: ConsoleToken) -> Result<Self, Self::Error> {
        let expiration = console_api::parse_expiration(&raw.expiration)?;
        Ok(Self {
            token: raw.token,
            expiration,
        })
    }
}

pub fn parse_vps_show(body: &[u8]) -> Result<VpsLocation, VpsApiError> {
    let envelope: Envelope<VpsShow> = serde_json::from_slice(body)?;
    envelope.into_result("vps")?.vps.try_into()
}

pub fn parse_console_token(body: &[u8]) -> Result<IssuedToken, VpsApiError> {
    let envelope: Envelope<ConsoleTokenCreate> = serde_json::from_slice(body)?;
    envelope.into_result("console_token")?.console_token.try_into()
}
