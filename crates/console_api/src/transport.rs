use std::future::Future;

use crate::error::ConsoleApiError;
use crate::payload::{FeedRequest, FeedResponse};

/// One request/response round trip against the console router.
///
/// The poll loop holds at most one returned future at a time; implementations
/// do not need to support overlapping calls.
pub trait FeedTransport {
    fn feed(
        &self,
        request: FeedRequest,
    ) -> impl Future<Output = Result<FeedResponse, ConsoleApiError>>;
}
