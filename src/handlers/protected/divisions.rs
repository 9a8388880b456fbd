use axum::extract::{Path, State};
use axum::Extension;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::divisions::{CreateDivisionRequest, DivisionService, DivisionView, UpdateDivisionRequest};

/// GET /api/divisions/by-standard/:standardId
pub async fn list_by_standard(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(standard_id): Path<Uuid>,
) -> ApiResult<Vec<DivisionView>> {
    let divisions = DivisionService::new(&state).list_by_standard(teacher.id, standard_id).await?;
    Ok(ApiResponse::success(divisions))
}

/// GET /api/divisions/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<DivisionView> {
    let division = DivisionService::new(&state).get(teacher.id, id).await?;
    Ok(ApiResponse::success(division))
}

/// POST /api/divisions - Create, or reactivate a deleted division of the same name
pub async fn post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<CreateDivisionRequest>,
) -> ApiResult<DivisionView> {
    let (division, reactivated) = DivisionService::new(&state).create(teacher.id, request).await?;
    let message = if reactivated {
        "Division reactivated successfully"
    } else {
        "Division created successfully"
    };
    Ok(ApiResponse::created(division).message(message))
}

/// PUT /api/divisions/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateDivisionRequest>,
) -> ApiResult<DivisionView> {
    let division = DivisionService::new(&state).update(teacher.id, id, request).await?;
    Ok(ApiResponse::success(division).message("Division updated successfully"))
}

/// DELETE /api/divisions/:id - Soft-delete with its students
pub async fn delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let students = DivisionService::new(&state).delete(teacher.id, id).await?;
    let message = format!(
        "Division deleted successfully ({} students also moved to inactive)",
        students
    );
    Ok(ApiResponse::success(json!({ "deactivatedStudents": students })).message(message))
}
