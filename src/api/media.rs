//! Presigned media uploads
//!
//! The presign call is an ordinary authenticated request. The upload itself
//! goes straight to object storage and never carries the bearer token.

use reqwest::header;
use serde_json::json;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{PresignBatch, PresignItem};

use super::ApiClient;

/// MIME type for an image path, by extension (JPEG when unknown)
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

impl ApiClient {
    /// Request upload URLs for a batch of files
    pub async fn presign_uploads(&self, items: &[PresignItem]) -> Result<PresignBatch> {
        self.post("/media/posts/presign/batch", &json!({ "items": items }))
            .await
    }

    /// `PUT` bytes to a presigned URL
    pub async fn upload_presigned(&self, upload_url: &str, content_type: &str, bytes: Vec<u8>) -> Result<()> {
        let response = self
            .http
            .put(upload_url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_response(status, &body));
        }

        tracing::debug!(status = status.as_u16(), "Media uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("a/b.PNG")), "image/png");
        assert_eq!(content_type_for_path(Path::new("x.gif")), "image/gif");
        assert_eq!(content_type_for_path(Path::new("x.webp")), "image/webp");
        assert_eq!(content_type_for_path(Path::new("x.jpeg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("noext")), "image/jpeg");
    }
}
