use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{ProfilePicture, Teacher, TeacherSettings};
use crate::error::ApiError;
use crate::handlers::multipart::read_form;
use crate::middleware::{ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::profile::{ProfileService, UpdateProfileRequest};

/// GET /api/profile/profile
pub async fn get(Extension(AuthTeacher(teacher)): Extension<AuthTeacher>) -> ApiResult<Teacher> {
    Ok(ApiResponse::success(teacher))
}

/// PUT /api/profile/profile - Name, phone, school and subject
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Teacher> {
    let teacher = ProfileService::new(&state).update_profile(&teacher, request).await?;
    Ok(ApiResponse::success(teacher).message("Profile updated successfully"))
}

/// GET /api/profile/settings
pub async fn settings_get(Extension(AuthTeacher(teacher)): Extension<AuthTeacher>) -> ApiResult<TeacherSettings> {
    Ok(ApiResponse::success(teacher.settings))
}

/// PUT /api/profile/settings - Deep-merge a partial settings document
pub async fn settings_put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    body: Result<Json<Value>, axum::extract::rejection::JsonRejection>,
) -> ApiResult<TeacherSettings> {
    let Json(patch) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let settings = ProfileService::new(&state).update_settings(&teacher, patch).await?;
    Ok(ApiResponse::success(settings).message("Settings updated successfully"))
}

/// POST /api/profile/upload-profile-picture - Multipart `profilePicture` image
pub async fn picture_post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    multipart: Multipart,
) -> ApiResult<ProfilePicture> {
    let mut form = read_form(multipart, &state.config.api).await?;
    let file = match form.take_file("profilePicture") {
        Some(file) => file,
        None => form.require_file("file", "No image file provided")?,
    };
    let picture = ProfileService::new(&state).upload_profile_picture(&teacher, file).await?;
    Ok(ApiResponse::success(picture).message("Profile picture uploaded successfully"))
}

/// DELETE /api/profile/profile-picture
pub async fn picture_delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
) -> ApiResult<()> {
    ProfileService::new(&state).delete_profile_picture(&teacher).await?;
    Ok(ApiResponse::success(()).message("Profile picture deleted successfully"))
}
