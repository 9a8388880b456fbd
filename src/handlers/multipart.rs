// handlers/multipart.rs - Multipart form reading with the upload limits applied
//
// Every upload endpoint goes through `read_form`, so the MIME allow-list, the
// per-file size cap and the file count cap are enforced in one place.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::storage::{is_allowed_mime, FileUpload};

/// Files and text fields of one multipart request
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: Vec<(String, FileUpload)>,
    fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Take the first file sent under `name`
    pub fn take_file(&mut self, name: &str) -> Option<FileUpload> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    /// Take a required file, or fail with `message`
    pub fn require_file(&mut self, name: &str, message: &str) -> Result<FileUpload, ApiError> {
        self.take_file(name).ok_or_else(|| ApiError::bad_request(message))
    }

    /// Trimmed text field; blank counts as absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn uuid(&self, name: &str) -> Result<Option<Uuid>, ApiError> {
        self.text(name)
            .map(|v| Uuid::parse_str(&v).map_err(|_| ApiError::invalid_field(name, format!("{} must be a valid id", name))))
            .transpose()
    }

    pub fn number(&self, name: &str) -> Result<Option<u32>, ApiError> {
        self.text(name)
            .map(|v| v.parse().map_err(|_| ApiError::invalid_field(name, format!("{} must be a number", name))))
            .transpose()
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("File too large. Maximum size is 50MB");
    }
    ApiError::bad_request(format!("Invalid multipart request: {}", err.body_text()))
}

/// Drain the request, checking each file against the configured limits
pub async fn read_form(mut multipart: Multipart, limits: &ApiConfig) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
            continue;
        };

        if form.files.len() >= limits.max_files_per_request {
            return Err(ApiError::bad_request(format!(
                "Too many files. Maximum is {} files per request",
                limits.max_files_per_request
            )));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_ascii_lowercase();
        if !is_allowed_mime(&content_type) {
            return Err(ApiError::bad_request(format!("File type {} is not allowed", content_type)));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > limits.max_upload_size_bytes {
            return Err(ApiError::payload_too_large(format!(
                "File too large. Maximum size is {}MB",
                limits.max_upload_size_bytes / (1024 * 1024)
            )));
        }

        form.files.push((
            name,
            FileUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            },
        ));
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_typed_fields() {
        let mut form = MultipartForm::default();
        form.fields.insert("title".into(), "  Homework ".into());
        form.fields.insert("blank".into(), "   ".into());
        form.fields.insert("questionCount".into(), "7".into());
        form.fields.insert("studentId".into(), "not-a-uuid".into());

        assert_eq!(form.text("title").as_deref(), Some("Homework"));
        assert_eq!(form.text("blank"), None);
        assert_eq!(form.number("questionCount").unwrap(), Some(7));
        assert_eq!(form.number("missing").unwrap(), None);
        assert_eq!(form.uuid("studentId").unwrap_err().status_code(), 400);
    }

    #[test]
    fn files_are_taken_once() {
        let mut form = MultipartForm::default();
        form.files.push((
            "file".into(),
            FileUpload {
                file_name: "a.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: vec![1],
            },
        ));
        assert!(form.take_file("file").is_some());
        assert!(form.take_file("file").is_none());
        assert_eq!(form.require_file("image", "Image is required").unwrap_err().status_code(), 400);
    }
}
