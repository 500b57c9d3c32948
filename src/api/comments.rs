//! Comments

use serde::de::IgnoredAny;

use crate::error::Result;
use crate::models::{Comment, CommentList, NewComment};

use super::{ApiClient, Query};

const DEFAULT_COMMENT_LIMIT: u32 = 10;

impl ApiClient {
    /// Fetch a page of comments on a post
    pub async fn comments(&self, post_id: i64, cursor: Option<&str>, limit: u32) -> Result<CommentList> {
        let path = Query::new()
            .push_opt("cursor", cursor)
            .push_opt("limit", (limit != DEFAULT_COMMENT_LIMIT).then_some(limit))
            .apply(&format!("/posts/{post_id}/comments"));
        self.get(&path).await
    }

    /// Comment on a post, or reply to `parent_comment_id`
    pub async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> Result<Comment> {
        let body = NewComment {
            content: content.to_string(),
            parent_comment_id,
        };
        self.post(&format!("/posts/{post_id}/comments"), &body).await
    }

    /// Delete a comment
    pub async fn delete_comment(&self, post_id: i64, comment_id: i64) -> Result<()> {
        let _: IgnoredAny = self
            .delete(&format!("/posts/{post_id}/comments/{comment_id}"))
            .await?;
        Ok(())
    }
}
