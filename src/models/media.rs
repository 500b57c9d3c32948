//! Presigned upload models

use serde::{Deserialize, Serialize};

/// One file to request an upload URL for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignItem {
    /// MIME type of the file
    pub content_type: String,
    /// Size in bytes, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A time-limited upload slot in object storage
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresignedUpload {
    /// URL to `PUT` the bytes to
    pub upload_url: String,
    /// URL the object is served from afterwards
    pub public_url: String,
    /// Object key
    pub key: String,
    /// Seconds until `upload_url` stops working
    pub expires_in: u64,
}

/// `POST /media/posts/presign/batch` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PresignBatch {
    /// One slot per requested item, same order
    #[serde(default)]
    pub items: Vec<PresignedUpload>,
}
