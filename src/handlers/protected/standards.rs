use axum::extract::{Path, State};
use axum::Extension;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Standard;
use crate::middleware::{ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::standards::{CreateStandardRequest, StandardDeleted, StandardService, UpdateStandardRequest};

/// GET /api/standards - Active standards of the signed-in teacher
pub async fn list(State(state): State<AppState>, Extension(teacher): Extension<AuthTeacher>) -> ApiResult<Vec<Standard>> {
    let standards = StandardService::new(&state).list(teacher.id).await?;
    Ok(ApiResponse::success(standards))
}

/// GET /api/standards/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<Standard> {
    let standard = StandardService::new(&state).get(teacher.id, id).await?;
    Ok(ApiResponse::success(standard))
}

/// POST /api/standards - Create, or reactivate a deleted standard of the same name
pub async fn post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<CreateStandardRequest>,
) -> ApiResult<Standard> {
    let (standard, reactivated) = StandardService::new(&state).create(teacher.id, request).await?;
    let message = if reactivated {
        "Standard reactivated successfully"
    } else {
        "Standard created successfully"
    };
    Ok(ApiResponse::created(standard).message(message))
}

/// PUT /api/standards/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStandardRequest>,
) -> ApiResult<Standard> {
    let standard = StandardService::new(&state).update(teacher.id, id, request).await?;
    Ok(ApiResponse::success(standard).message("Standard updated successfully"))
}

/// DELETE /api/standards/:id - Soft-delete with its divisions and students
pub async fn delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<StandardDeleted> {
    let deleted = StandardService::new(&state).delete(teacher.id, id).await?;
    let message = format!(
        "Standard deleted successfully ({} divisions and {} students also moved to inactive)",
        deleted.deactivated_divisions, deleted.deactivated_students
    );
    Ok(ApiResponse::success(deleted).message(message))
}
