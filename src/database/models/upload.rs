use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    Image,
    Video,
    Document,
}

impl UploadType {
    /// Classification by MIME prefix: `image/*`, `video/*`, everything else is a document.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        if mime.starts_with("image/") {
            UploadType::Image
        } else if mime.starts_with("video/") {
            UploadType::Video
        } else {
            UploadType::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadType::Image => "image",
            UploadType::Video => "video",
            UploadType::Document => "document",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(UploadType::Image),
            "video" => Some(UploadType::Video),
            "document" => Some(UploadType::Document),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub public_id: String,
    pub original_name: String,
    pub size: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub student_id: Uuid,
    pub uploaded_by: Uuid,
    #[serde(rename = "type")]
    pub upload_type: UploadType,
    pub file: StoredFile,
    pub subject: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
