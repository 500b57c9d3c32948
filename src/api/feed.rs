//! Home feed

use crate::error::Result;
use crate::models::FeedResponse;

use super::{ApiClient, Query};

/// Page size the backend uses when none is given
pub const DEFAULT_FEED_LIMIT: u32 = 10;

impl ApiClient {
    /// Fetch a page of the home feed
    pub async fn feed(&self, cursor: Option<&str>, limit: u32) -> Result<FeedResponse> {
        let path = Query::new()
            .push_opt("cursor", cursor)
            .push_opt("limit", (limit != DEFAULT_FEED_LIMIT).then_some(limit))
            .apply("/feed");
        self.get(&path).await
    }
}
