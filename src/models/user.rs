//! User models

use serde::{Deserialize, Serialize};

/// The authenticated user (`GET /me`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: i64,
    /// Unique username
    pub username: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Profile bio
    #[serde(default)]
    pub bio: Option<String>,
    /// Whether onboarding is still pending
    #[serde(default)]
    pub is_new_user: bool,
    /// Number of followers
    #[serde(default)]
    pub follower_count: Option<u64>,
    /// Number of accounts followed
    #[serde(default)]
    pub following_count: Option<u64>,
    /// Number of posts
    #[serde(default)]
    pub post_count: Option<u64>,
}

impl User {
    /// Display name, falling back to the username
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

/// Compact user shown next to posts, comments and in search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID
    pub id: i64,
    /// Unique username
    pub username: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the current user follows this user
    #[serde(default)]
    pub is_following: bool,
}

/// A page of users (search, followers, following)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserList {
    /// Users on this page
    #[serde(default)]
    pub users: Vec<UserSummary>,
    /// Cursor for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Whether more pages exist
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id":7,"username":"linh"}"#).unwrap();
        assert_eq!(user.name(), "linh");
        assert!(!user.is_new_user);
        assert_eq!(user.follower_count, None);
    }
}
