//! Comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// A comment or reply on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID
    pub id: i64,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Text
    pub content: String,
    /// Parent comment for replies
    #[serde(default)]
    pub parent_comment_id: Option<i64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Author
    pub author: UserSummary,
}

/// A page of comments
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentList {
    /// Comments on this page
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Cursor for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Whether more pages exist
    #[serde(default)]
    pub has_more: bool,
}

/// Body of `POST /posts/{id}/comments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    /// Text
    pub content: String,
    /// Parent comment when replying
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<i64>,
}
