//! Transport-only client for the remote console router.
//!
//! This crate owns the wire contract of the console feed endpoint: URL
//! construction, form encoding of buffered keystrokes, decoding of output
//! chunks, and the HTTP client that carries one poll cycle. It contains no
//! terminal handling and no token issuance.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod retry;
pub mod session;
pub mod transport;
pub mod url;

pub use client::ConsoleFeedClient;
pub use config::ConsoleApiConfig;
pub use error::ConsoleApiError;
pub use payload::{decode_feed_response, FeedRequest, FeedResponse};
pub use session::{parse_expiration, ConsoleSessionInfo};
pub use transport::FeedTransport;
pub use url::feed_url;
