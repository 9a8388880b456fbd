//! Object storage for uploaded files. Records keep the returned URL and the
//! object path (`public_id`), which is what deletion needs later.

use async_trait::async_trait;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::models::UploadType;

pub mod memory;
pub mod supabase;

pub use memory::MemoryObjectStore;
pub use supabase::SupabaseStore;

/// MIME types accepted by every upload endpoint
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/avi",
    "video/mov",
    "video/quicktime",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object storage is not configured")]
    NotConfigured,

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },
}

/// A file received from a multipart request
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Where an object ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub path: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Recover the object path from a URL this store handed out
    fn path_from_url(&self, url: &str) -> Option<String>;
}

/// Remove an object in the background; failures are only logged
pub fn spawn_delete(objects: Arc<dyn ObjectStore>, path: String) {
    tokio::spawn(async move {
        match objects.delete(&path).await {
            Ok(()) => debug!("Deleted stored object {}", path),
            Err(e) => warn!("Failed to delete stored object {}: {}", path, e),
        }
    });
}

pub fn is_allowed_mime(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type.to_ascii_lowercase().as_str())
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.to_ascii_lowercase().starts_with("image/")
}

/// Extension of the original file name, or `fallback` when there is none
pub fn file_extension<'a>(original_name: &'a str, fallback: &'a str) -> &'a str {
    match original_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext,
        _ => fallback,
    }
}

/// `{millis}-{random}.{ext}`
fn unique_file_name(original_name: &str, fallback_ext: &str) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        random,
        file_extension(original_name, fallback_ext)
    )
}

pub fn student_upload_path(teacher_id: Uuid, student_id: Uuid, upload_type: UploadType, original_name: &str) -> String {
    format!(
        "student-uploads/{}/{}/{}/{}",
        teacher_id,
        student_id,
        upload_type.as_str(),
        unique_file_name(original_name, "file")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOwner {
    Teacher,
    Student,
}

pub fn profile_picture_path(owner: ProfileOwner, id: Uuid, original_name: &str) -> String {
    let folder = match owner {
        ProfileOwner::Teacher => "teachers",
        ProfileOwner::Student => "students",
    };
    format!("profiles/{}/{}/{}", folder, id, unique_file_name(original_name, "jpg"))
}

pub fn lesson_material_path(mime_type: &str, original_name: &str) -> String {
    let folder = match UploadType::from_mime(mime_type) {
        UploadType::Image => "images",
        UploadType::Video => "videos",
        UploadType::Document => "documents",
    };
    format!("lesson-materials/{}/{}", folder, unique_file_name(original_name, "file"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(is_allowed_mime("image/PNG"));
        assert!(is_allowed_mime("application/pdf"));
        assert!(!is_allowed_mime("application/x-msdownload"));
        assert!(!is_allowed_mime("text/html"));
    }

    #[test]
    fn extension_falls_back() {
        assert_eq!(file_extension("notes.final.pdf", "file"), "pdf");
        assert_eq!(file_extension("README", "file"), "file");
        assert_eq!(file_extension("photo.", "jpg"), "jpg");
    }

    #[test]
    fn student_upload_layout() {
        let (teacher, student) = (Uuid::new_v4(), Uuid::new_v4());
        let path = student_upload_path(teacher, student, UploadType::Video, "clip.mp4");
        let prefix = format!("student-uploads/{}/{}/video/", teacher, student);
        assert!(path.starts_with(&prefix), "{}", path);
        assert!(path.ends_with(".mp4"));

        let name = &path[prefix.len()..];
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest.len(), "abcdefghi.mp4".len());
    }

    #[test]
    fn profile_and_material_layouts() {
        let id = Uuid::new_v4();
        assert!(profile_picture_path(ProfileOwner::Student, id, "me").starts_with(&format!("profiles/students/{}/", id)));
        assert!(profile_picture_path(ProfileOwner::Teacher, id, "me").ends_with(".jpg"));
        assert!(lesson_material_path("application/pdf", "plan.pdf").starts_with("lesson-materials/documents/"));
        assert!(lesson_material_path("image/png", "board.png").starts_with("lesson-materials/images/"));
    }
}
