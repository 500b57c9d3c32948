//! Notifications

use serde::de::IgnoredAny;
use serde_json::json;

use crate::error::Result;
use crate::models::{NotificationList, UnreadCount};

use super::{ApiClient, Query};

impl ApiClient {
    /// Latest notifications
    pub async fn notifications(&self, limit: u32) -> Result<NotificationList> {
        let path = Query::new().push("limit", limit).apply("/notifications");
        self.get(&path).await
    }

    /// Mark specific notifications as read
    pub async fn mark_notifications_read(&self, ids: &[i64]) -> Result<()> {
        let body = json!({ "notification_ids": ids });
        let _: IgnoredAny = self.patch("/notifications/read", Some(body)).await?;
        Ok(())
    }

    /// Mark everything as read
    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        let _: IgnoredAny = self.post_empty("/notifications/read-all").await?;
        Ok(())
    }

    /// Number of unread notifications
    pub async fn unread_count(&self) -> Result<u64> {
        let count: UnreadCount = self.get("/notifications/unread-count").await?;
        Ok(count.unread_count)
    }
}
