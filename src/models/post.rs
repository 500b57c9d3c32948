//! Post and feed models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// Kind of a media attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video clip
    Video,
}

/// Media attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Media ID
    pub id: i64,
    /// Public URL
    pub media_url: String,
    /// Image or video
    pub media_type: MediaKind,
    /// Order within the post
    pub position: u32,
}

/// A post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post ID
    pub id: i64,
    /// Author user ID
    pub user_id: i64,
    /// Caption text
    #[serde(default)]
    pub caption: Option<String>,
    /// Number of likes
    #[serde(default)]
    pub like_count: u64,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Attached media, ordered by position
    #[serde(default)]
    pub media: Vec<Media>,
    /// Author
    pub author: UserSummary,
    /// Whether the current user liked this post
    #[serde(default)]
    pub is_liked: bool,
}

/// A page of the home feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedResponse {
    /// Posts on this page
    #[serde(default)]
    pub posts: Vec<Post>,
    /// Cursor for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Whether more pages exist
    #[serde(default)]
    pub has_more: bool,
}

/// Body of `POST /posts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    /// Caption, omitted when blank
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Public URLs of already uploaded media
    pub media_urls: Vec<String>,
}

impl NewPost {
    /// Build a post body, trimming the caption and dropping it when blank
    pub fn new(caption: Option<&str>, media_urls: Vec<String>) -> Self {
        let caption = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Self {
            caption,
            media_urls,
        }
    }
}
