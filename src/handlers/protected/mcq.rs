use axum::extract::{Multipart, Path, State};
use axum::Extension;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Mcq;
use crate::handlers::multipart::read_form;
use crate::middleware::{ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::mcq::{GenerateOptions, GeneratedMcq, GeneratorReport, McqService, SaveMcqRequest, UpdateMcqRequest};

/// GET /api/mcq/status - Whether question generation is usable right now
pub async fn status(State(state): State<AppState>) -> ApiResult<GeneratorReport> {
    Ok(ApiResponse::success(McqService::new(&state).status().await))
}

/// POST /api/mcq/generate - Multipart `image` plus questionCount, bookLanguage,
/// questionLanguage and standardId
pub async fn generate(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    multipart: Multipart,
) -> ApiResult<GeneratedMcq> {
    let mut form = read_form(multipart, &state.config.api).await?;
    let image = form.require_file("image", "No image file provided")?;
    let options = GenerateOptions {
        question_count: form.number("questionCount")?,
        book_language: form.text("bookLanguage"),
        question_language: form.text("questionLanguage"),
        standard_id: form.uuid("standardId")?,
    };

    let generated = McqService::new(&state).generate(teacher.id, image, options).await?;
    let message = format!("Generated {} questions successfully", generated.questions.len());
    Ok(ApiResponse::success(generated).message(message))
}

/// POST /api/mcq/save
pub async fn save(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<SaveMcqRequest>,
) -> ApiResult<Mcq> {
    let mcq = McqService::new(&state).save(teacher.id, request).await?;
    Ok(ApiResponse::created(mcq).message("MCQ saved successfully"))
}

/// GET /api/mcq/standard/:standardId
pub async fn list_by_standard(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(standard_id): Path<Uuid>,
) -> ApiResult<Vec<Mcq>> {
    let mcqs = McqService::new(&state).list_by_standard(teacher.id, standard_id).await?;
    Ok(ApiResponse::success(mcqs))
}

/// GET /api/mcq/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<Mcq> {
    let mcq = McqService::new(&state).get(teacher.id, id).await?;
    Ok(ApiResponse::success(mcq))
}

/// PUT /api/mcq/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateMcqRequest>,
) -> ApiResult<Mcq> {
    let mcq = McqService::new(&state).update(teacher.id, id, request).await?;
    Ok(ApiResponse::success(mcq).message("MCQ updated successfully"))
}

/// DELETE /api/mcq/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    McqService::new(&state).delete(teacher.id, id).await?;
    Ok(ApiResponse::success(()).message("MCQ deleted successfully"))
}
