use axum::extract::{Multipart, Path, State};
use axum::Extension;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{LessonPlan, Material};
use crate::handlers::multipart::read_form;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::lesson_plans::{
    CreateLessonPlanRequest, LessonPlanQuery, LessonPlanService, RemoveMaterialRequest, UpdateLessonPlanRequest,
};

/// GET /api/lesson-plans - Filter by date, date range, completion or subject
pub async fn list(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ApiQuery(query): ApiQuery<LessonPlanQuery>,
) -> ApiResult<Vec<LessonPlan>> {
    let plans = LessonPlanService::new(&state).list(teacher.id, query).await?;
    Ok(ApiResponse::success(plans))
}

/// GET /api/lesson-plans/today
pub async fn today(State(state): State<AppState>, Extension(teacher): Extension<AuthTeacher>) -> ApiResult<Vec<LessonPlan>> {
    let plans = LessonPlanService::new(&state).today(teacher.id).await?;
    Ok(ApiResponse::success(plans))
}

/// GET /api/lesson-plans/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<LessonPlan> {
    let plan = LessonPlanService::new(&state).get(teacher.id, id).await?;
    Ok(ApiResponse::success(plan))
}

/// POST /api/lesson-plans
pub async fn post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<CreateLessonPlanRequest>,
) -> ApiResult<LessonPlan> {
    let plan = LessonPlanService::new(&state).create(teacher.id, request).await?;
    Ok(ApiResponse::created(plan).message("Lesson plan created successfully"))
}

/// PUT /api/lesson-plans/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateLessonPlanRequest>,
) -> ApiResult<LessonPlan> {
    let plan = LessonPlanService::new(&state).update(teacher.id, id, request).await?;
    Ok(ApiResponse::success(plan).message("Lesson plan updated successfully"))
}

/// DELETE /api/lesson-plans/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    LessonPlanService::new(&state).delete(teacher.id, id).await?;
    Ok(ApiResponse::success(()).message("Lesson plan deleted successfully"))
}

/// PATCH /api/lesson-plans/:id/toggle-completion
pub async fn toggle_completion(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<LessonPlan> {
    let plan = LessonPlanService::new(&state).toggle_completion(teacher.id, id).await?;
    let message = if plan.completed {
        "Lesson plan marked as completed"
    } else {
        "Lesson plan marked as incomplete"
    };
    Ok(ApiResponse::success(plan).message(message))
}

/// DELETE /api/lesson-plans/:id/material - Body names the material by index or content
pub async fn remove_material(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RemoveMaterialRequest>,
) -> ApiResult<LessonPlan> {
    let plan = LessonPlanService::new(&state).remove_material(teacher.id, id, request).await?;
    Ok(ApiResponse::success(plan).message("Material removed successfully"))
}

/// POST /api/lesson-plans/upload-material - Multipart `file`
pub async fn upload_material(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Material> {
    let mut form = read_form(multipart, &state.config.api).await?;
    let file = form.require_file("file", "No file uploaded")?;
    let material = LessonPlanService::new(&state).upload_material(file).await?;
    Ok(ApiResponse::success(material).message("Material uploaded successfully"))
}
