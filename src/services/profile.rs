use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::{ProfilePicture, Teacher, TeacherSettings};
use crate::error::ApiError;
use crate::storage::{is_image_mime, profile_picture_path, spawn_delete, FileUpload, ProfileOwner};

use super::clean_optional;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 20, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 100, message = "School name cannot exceed 100 characters"))]
    pub school: Option<String>,
    #[validate(length(max = 50, message = "Subject cannot exceed 50 characters"))]
    pub subject: Option<String>,
}

/// Recursively overlay `patch` onto `target`; non-object values replace.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

pub struct ProfileService<'a> {
    state: &'a AppState,
}

impl<'a> ProfileService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn update_profile(&self, teacher: &Teacher, request: UpdateProfileRequest) -> Result<Teacher, ApiError> {
        let mut teacher = teacher.clone();
        if let Some(name) = request.name {
            teacher.name = name.trim().to_string();
        }
        if request.phone.is_some() {
            teacher.phone = clean_optional(request.phone);
        }
        if request.school.is_some() {
            teacher.school = clean_optional(request.school);
        }
        if request.subject.is_some() {
            teacher.subject = clean_optional(request.subject);
        }
        teacher.updated_at = Utc::now();
        self.state.store.update_teacher(&teacher).await?;
        Ok(teacher)
    }

    /// Merge a partial settings document over the stored settings
    pub async fn update_settings(&self, teacher: &Teacher, patch: Value) -> Result<TeacherSettings, ApiError> {
        if !patch.is_object() {
            return Err(ApiError::bad_request("Settings must be a JSON object"));
        }

        let mut merged = serde_json::to_value(&teacher.settings)
            .map_err(|e| ApiError::internal("Failed to read settings", e))?;
        merge_json(&mut merged, patch);
        let settings: TeacherSettings = serde_json::from_value(merged)
            .map_err(|e| ApiError::invalid_field("settings", format!("Invalid settings: {}", e)))?;

        let mut teacher = teacher.clone();
        teacher.settings = settings.clone();
        teacher.updated_at = Utc::now();
        self.state.store.update_teacher(&teacher).await?;
        Ok(settings)
    }

    pub async fn upload_profile_picture(&self, teacher: &Teacher, file: FileUpload) -> Result<ProfilePicture, ApiError> {
        if !is_image_mime(&file.content_type) {
            return Err(ApiError::bad_request("Only image files are allowed for profile pictures"));
        }

        let path = profile_picture_path(ProfileOwner::Teacher, teacher.id, &file.file_name);
        let stored = self.state.objects.put(&path, file.bytes, &file.content_type).await?;
        let picture = ProfilePicture {
            url: stored.url,
            public_id: stored.path,
        };

        let mut teacher = teacher.clone();
        let previous = teacher.profile_picture.replace(picture.clone());
        teacher.updated_at = Utc::now();
        self.state.store.update_teacher(&teacher).await?;

        if let Some(previous) = previous.filter(|p| !p.public_id.is_empty()) {
            spawn_delete(self.state.objects.clone(), previous.public_id);
        }
        Ok(picture)
    }

    pub async fn delete_profile_picture(&self, teacher: &Teacher) -> Result<(), ApiError> {
        let mut teacher = teacher.clone();
        let previous = teacher
            .profile_picture
            .take()
            .ok_or_else(|| ApiError::not_found("No profile picture to delete"))?;

        teacher.updated_at = Utc::now();
        self.state.store.update_teacher(&teacher).await?;

        if !previous.public_id.is_empty() {
            spawn_delete(self.state.objects.clone(), previous.public_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::teacher::Theme;
    use crate::testing::{image_file, TestContext};
    use serde_json::json;

    #[test]
    fn merge_overlays_nested_objects() {
        let mut target = json!({"a": {"b": 1, "c": 2}, "d": 3});
        merge_json(&mut target, json!({"a": {"c": 5}, "e": 6}));
        assert_eq!(target, json!({"a": {"b": 1, "c": 5}, "d": 3, "e": 6}));
    }

    #[tokio::test]
    async fn settings_merge_keeps_untouched_fields() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let service = ProfileService::new(&ctx.state);

        let settings = service
            .update_settings(&teacher, json!({"appearance": {"theme": "dark"}}))
            .await
            .unwrap();
        assert_eq!(settings.appearance.theme, Theme::Dark);
        assert_eq!(settings.appearance.language, "en");

        let stored = ctx.state.store.find_teacher_by_id(teacher.id).await.unwrap().unwrap();
        assert_eq!(stored.settings.appearance.theme, Theme::Dark);

        let err = service
            .update_settings(&teacher, json!({"appearance": {"theme": "neon"}}))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn profile_picture_replaces_previous() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let service = ProfileService::new(&ctx.state);

        let first = service.upload_profile_picture(&teacher, image_file("me.png")).await.unwrap();
        assert!(first.public_id.starts_with(&format!("profiles/teachers/{}/", teacher.id)));

        let teacher = ctx.state.store.find_teacher_by_id(teacher.id).await.unwrap().unwrap();
        let second = service.upload_profile_picture(&teacher, image_file("me2.png")).await.unwrap();
        assert_ne!(first.public_id, second.public_id);
        assert!(ctx.objects.contains(&second.public_id).await);

        let err = service
            .upload_profile_picture(&teacher, crate::testing::pdf_file("cv.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn update_profile_clears_blank_fields() {
        let ctx = TestContext::new();
        let mut teacher = ctx.teacher().await;
        teacher.school = Some("Old School".into());

        let updated = ProfileService::new(&ctx.state)
            .update_profile(
                &teacher,
                UpdateProfileRequest {
                    name: Some(" Asha P ".into()),
                    phone: None,
                    school: Some("".into()),
                    subject: Some("Science".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Asha P");
        assert_eq!(updated.school, None);
        assert_eq!(updated.subject.as_deref(), Some("Science"));
    }
}
