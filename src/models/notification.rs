//! Notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone followed the user
    Follow,
    /// Someone liked a post
    Like,
    /// Someone commented on a post
    Comment,
}

/// Minimal actor info attached to notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User ID
    pub id: i64,
    /// Username
    pub username: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A single notification (follows)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID
    pub id: i64,
    /// Acting user ID
    pub actor_id: i64,
    /// Kind
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Related post
    #[serde(default)]
    pub post_id: Option<i64>,
    /// Related comment
    #[serde(default)]
    pub comment_id: Option<i64>,
    /// Read flag
    #[serde(default)]
    pub is_read: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Acting user
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Likes or comments on one post, grouped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedNotification {
    /// Group ID
    pub id: i64,
    /// Like or comment
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Related post
    #[serde(default)]
    pub post_id: Option<i64>,
    /// Most recent actors
    #[serde(default)]
    pub actors: Vec<Actor>,
    /// Total actors in the group
    #[serde(default)]
    pub total_count: u64,
    /// Time of the newest event
    pub latest_at: DateTime<Utc>,
    /// Read flag
    #[serde(default)]
    pub is_read: bool,
}

/// `GET /notifications`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationList {
    /// Follow notifications
    #[serde(default)]
    pub follows: Vec<Notification>,
    /// Grouped likes and comments
    #[serde(default)]
    pub aggregated: Vec<AggregatedNotification>,
    /// Unread total
    #[serde(default)]
    pub unread_count: u64,
}

/// `GET /notifications/unread-count`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UnreadCount {
    /// Unread total
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_list_parses() {
        let json = r#"{
            "follows": [{"id": 1, "actor_id": 4, "type": "follow", "is_read": false,
                         "created_at": "2025-03-01T10:00:00Z",
                         "actor": {"id": 4, "username": "minh", "display_name": null, "avatar_url": null}}],
            "aggregated": [{"id": 2, "type": "like", "post_id": 10, "actors": [],
                            "total_count": 5, "latest_at": "2025-03-01T11:00:00Z", "is_read": true}],
            "unread_count": 1
        }"#;
        let list: NotificationList = serde_json::from_str(json).unwrap();
        assert_eq!(list.follows[0].kind, NotificationKind::Follow);
        assert_eq!(list.aggregated[0].total_count, 5);
        assert_eq!(list.unread_count, 1);
    }
}
