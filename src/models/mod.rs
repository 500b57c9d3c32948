//! Data models for the feedline backend

mod comment;
mod media;
mod notification;
mod post;
mod user;

pub use comment::{Comment, CommentList, NewComment};
pub use media::{PresignBatch, PresignItem, PresignedUpload};
pub use notification::{
    Actor, AggregatedNotification, Notification, NotificationKind, NotificationList, UnreadCount,
};
pub use post::{FeedResponse, Media, MediaKind, NewPost, Post};
pub use user::{User, UserList, UserSummary};

