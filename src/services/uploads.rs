use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::{Page, Pagination, StoredFile, Upload, UploadType};
use crate::error::ApiError;
use crate::storage::{spawn_delete, student_upload_path, FileUpload};

use super::clean_optional;

/// Tags arrive either as a JSON array or as one comma separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    List(Vec<String>),
    Text(String),
}

impl Tags {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Tags::List(tags) => clean_tags(tags),
            Tags::Text(text) => parse_tags(&text),
        }
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a multipart `tags` field: `["a","b"]` or `a, b`.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
            return clean_tags(tags);
        }
    }
    clean_tags(raw.split(',').map(str::to_string).collect())
}

/// Text fields sent alongside the file
#[derive(Debug, Clone, Default)]
pub struct NewUpload {
    pub title: String,
    pub student_id: Uuid,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUploadRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub subject: Option<String>,
    pub tags: Option<Tags>,
}

#[derive(Debug, Deserialize)]
pub struct UploadListQuery {
    #[serde(rename = "type")]
    pub upload_type: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UploadList {
    pub uploads: Vec<Upload>,
    pub pagination: Pagination,
}

pub struct UploadService<'a> {
    state: &'a AppState,
}

impl<'a> UploadService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn create(&self, teacher_id: Uuid, fields: NewUpload, file: FileUpload) -> Result<Upload, ApiError> {
        let title = fields.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::invalid_field("title", "Title is required"));
        }
        let student = self
            .state
            .store
            .find_student(teacher_id, fields.student_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;

        let upload_type = UploadType::from_mime(&file.content_type);
        let path = student_upload_path(teacher_id, student.id, upload_type, &file.file_name);
        let size = file.size() as i64;
        let stored = self.state.objects.put(&path, file.bytes, &file.content_type).await?;

        let now = Utc::now();
        let upload = Upload {
            id: Uuid::new_v4(),
            title,
            description: clean_optional(fields.description),
            student_id: student.id,
            uploaded_by: teacher_id,
            upload_type,
            file: StoredFile {
                url: stored.url,
                public_id: stored.path,
                original_name: file.file_name,
                size,
                mime_type: file.content_type,
            },
            subject: clean_optional(fields.subject),
            tags: fields.tags.as_deref().map(parse_tags).unwrap_or_default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.state.store.insert_upload(&upload).await {
            spawn_delete(self.state.objects.clone(), upload.file.public_id.clone());
            return Err(err.into());
        }
        info!(
            "Stored {} upload {} for student {} ({} bytes)",
            upload_type.as_str(),
            upload.id,
            student.id,
            size
        );
        Ok(upload)
    }

    pub async fn list_for_student(&self, teacher_id: Uuid, student_id: Uuid, query: UploadListQuery) -> Result<UploadList, ApiError> {
        if self.state.store.find_student(teacher_id, student_id).await?.is_none() {
            return Err(ApiError::not_found("Student not found"));
        }
        let upload_type = match query.upload_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(value) => Some(
                UploadType::parse(value)
                    .ok_or_else(|| ApiError::bad_request("Type must be one of image, video or document"))?,
            ),
            None => None,
        };

        let page = Page::new(query.page, query.limit);
        let (uploads, total) = self
            .state
            .store
            .list_uploads_for_student(teacher_id, student_id, upload_type, page)
            .await?;
        Ok(UploadList {
            uploads,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn get(&self, teacher_id: Uuid, id: Uuid) -> Result<Upload, ApiError> {
        self.state
            .store
            .find_upload(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Upload not found"))
    }

    pub async fn update(&self, teacher_id: Uuid, id: Uuid, request: UpdateUploadRequest) -> Result<Upload, ApiError> {
        let mut upload = self.get(teacher_id, id).await?;

        if let Some(title) = request.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ApiError::invalid_field("title", "Title is required"));
            }
            upload.title = title;
        }
        if request.description.is_some() {
            upload.description = clean_optional(request.description);
        }
        if request.subject.is_some() {
            upload.subject = clean_optional(request.subject);
        }
        if let Some(tags) = request.tags {
            upload.tags = tags.into_vec();
        }
        upload.updated_at = Utc::now();

        self.state.store.update_upload(&upload).await?;
        Ok(upload)
    }

    /// Soft-delete the record, then drop the stored object in the background
    pub async fn delete(&self, teacher_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let upload = self.get(teacher_id, id).await?;
        if !self.state.store.deactivate_upload(teacher_id, id).await? {
            return Err(ApiError::not_found("Upload not found"));
        }
        spawn_delete(self.state.objects.clone(), upload.file.public_id);
        info!("Deleted upload {}", id);
        Ok(())
    }
}
