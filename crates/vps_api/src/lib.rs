//! Minimal client for the VPS management API.
//!
//! Only the two calls a console session needs: locating the node that hosts a
//! VPS (and with it the console router URL), and issuing a console token.
//! Responses use the HaveAPI envelope `{status, response, message, errors}`.

pub mod client;
pub mod config;
pub mod error;
pub mod schema;

pub use client::{console_token_url, vps_url, VpsApiClient};
pub use config::{VpsApiConfig, AUTH_TOKEN_HEADER, DEFAULT_API_URL, DEFAULT_API_VERSION};
pub use error::VpsApiError;
pub use schema::{ConsoleToken, IssuedToken, VpsLocation};
