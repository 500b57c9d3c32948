//! Users, search and follows

use serde::de::IgnoredAny;

use crate::error::Result;
use crate::models::{UserList, UserSummary};

use super::{ApiClient, Query};

/// Page size for follower and following lists
pub const FOLLOW_LIST_LIMIT: u32 = 20;

impl ApiClient {
    /// Public profile of a user
    pub async fn user(&self, user_id: i64) -> Result<UserSummary> {
        self.get(&format!("/users/{user_id}")).await
    }

    /// Search users by username prefix; a blank query matches nobody
    pub async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let path = Query::new()
            .push("q", query)
            .push("limit", limit)
            .apply("/users/search");
        let list: UserList = self.get(&path).await?;
        Ok(list.users)
    }

    /// Users following `user_id`
    pub async fn followers(&self, user_id: i64, cursor: Option<&str>) -> Result<UserList> {
        self.follow_list(user_id, "followers", cursor).await
    }

    /// Users `user_id` follows
    pub async fn following(&self, user_id: i64, cursor: Option<&str>) -> Result<UserList> {
        self.follow_list(user_id, "following", cursor).await
    }

    async fn follow_list(&self, user_id: i64, which: &str, cursor: Option<&str>) -> Result<UserList> {
        let path = Query::new()
            .push_opt("cursor", cursor)
            .push("limit", FOLLOW_LIST_LIMIT)
            .apply(&format!("/users/{user_id}/{which}"));
        self.get(&path).await
    }

    /// Follow a user
    pub async fn follow(&self, user_id: i64) -> Result<()> {
        let _: IgnoredAny = self.post_empty(&format!("/users/{user_id}/follow")).await?;
        Ok(())
    }

    /// Unfollow a user
    pub async fn unfollow(&self, user_id: i64) -> Result<()> {
        let _: IgnoredAny = self.delete(&format!("/users/{user_id}/follow")).await?;
        Ok(())
    }
}
