use axum::extract::{Multipart, Path, State};
use axum::Extension;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Upload;
use crate::error::ApiError;
use crate::handlers::multipart::read_form;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::uploads::{NewUpload, UpdateUploadRequest, UploadList, UploadListQuery, UploadService};

/// POST /api/uploads - Multipart `file` plus title, studentId, description, subject, tags
pub async fn post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    multipart: Multipart,
) -> ApiResult<Upload> {
    let mut form = read_form(multipart, &state.config.api).await?;
    let file = form.require_file("file", "No file uploaded")?;

    let title = form
        .text("title")
        .ok_or_else(|| ApiError::invalid_field("title", "Title is required"))?;
    let student_id = form
        .uuid("studentId")?
        .ok_or_else(|| ApiError::invalid_field("studentId", "Student ID is required"))?;

    let fields = NewUpload {
        title,
        student_id,
        description: form.text("description"),
        subject: form.text("subject"),
        tags: form.text("tags"),
    };
    let upload = UploadService::new(&state).create(teacher.id, fields, file).await?;
    Ok(ApiResponse::created(upload).message("File uploaded successfully"))
}

/// GET /api/uploads/student/:studentId - Optional `?type=image|video|document`
pub async fn list_for_student(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(student_id): Path<Uuid>,
    ApiQuery(query): ApiQuery<UploadListQuery>,
) -> ApiResult<UploadList> {
    let uploads = UploadService::new(&state).list_for_student(teacher.id, student_id, query).await?;
    Ok(ApiResponse::success(uploads))
}

/// GET /api/uploads/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<Upload> {
    let upload = UploadService::new(&state).get(teacher.id, id).await?;
    Ok(ApiResponse::success(upload))
}

/// PUT /api/uploads/:id - Metadata only; the stored file is unchanged
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateUploadRequest>,
) -> ApiResult<Upload> {
    let upload = UploadService::new(&state).update(teacher.id, id, request).await?;
    Ok(ApiResponse::success(upload).message("Upload updated successfully"))
}

/// DELETE /api/uploads/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    UploadService::new(&state).delete(teacher.id, id).await?;
    Ok(ApiResponse::success(()).message("Upload deleted successfully"))
}
