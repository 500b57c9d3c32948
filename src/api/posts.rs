//! Posts and likes

use serde::de::IgnoredAny;

use crate::error::Result;
use crate::models::{FeedResponse, NewPost, Post};

use super::{ApiClient, Query};

/// Page size for a user's post grid
pub const USER_POSTS_LIMIT: u32 = 12;

impl ApiClient {
    /// Fetch one post
    pub async fn post_detail(&self, post_id: i64) -> Result<Post> {
        self.get(&format!("/posts/{post_id}")).await
    }

    /// Publish a post from already uploaded media
    pub async fn create_post(&self, caption: Option<&str>, media_urls: Vec<String>) -> Result<Post> {
        self.post("/posts", &NewPost::new(caption, media_urls)).await
    }

    /// Delete one of the current user's posts
    pub async fn delete_post(&self, post_id: i64) -> Result<()> {
        let _: IgnoredAny = self.delete(&format!("/posts/{post_id}")).await?;
        Ok(())
    }

    /// Like a post
    pub async fn like_post(&self, post_id: i64) -> Result<()> {
        let _: IgnoredAny = self.post_empty(&format!("/posts/{post_id}/likes")).await?;
        Ok(())
    }

    /// Remove a like
    pub async fn unlike_post(&self, post_id: i64) -> Result<()> {
        let _: IgnoredAny = self.delete(&format!("/posts/{post_id}/likes")).await?;
        Ok(())
    }

    /// A user's posts, newest first
    pub async fn user_posts(&self, user_id: i64, cursor: Option<&str>) -> Result<FeedResponse> {
        let path = Query::new()
            .push_opt("cursor", cursor)
            .push("limit", USER_POSTS_LIMIT)
            .apply(&format!("/users/{user_id}/posts"));
        self.get(&path).await
    }
}
