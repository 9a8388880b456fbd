use axum::extract::{Multipart, Path, State};
use axum::Extension;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Student;
use crate::handlers::multipart::read_form;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::import::{ImportService, ImportStudentsRequest, ImportSummary};
use crate::services::students::{
    CreateStudentRequest, ListStudentsQuery, StudentList, StudentService, UpdateStudentRequest,
};

/// GET /api/students - Paginated, optionally narrowed to a standard or division
pub async fn list(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ApiQuery(query): ApiQuery<ListStudentsQuery>,
) -> ApiResult<StudentList> {
    let students = StudentService::new(&state).list(teacher.id, query).await?;
    Ok(ApiResponse::success(students))
}

/// GET /api/students/by-standard/:standardId
pub async fn list_by_standard(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(standard_id): Path<Uuid>,
) -> ApiResult<Vec<Student>> {
    let students = StudentService::new(&state).list_by_standard(teacher.id, standard_id).await?;
    Ok(ApiResponse::success(students))
}

/// GET /api/students/by-division/:divisionId
pub async fn list_by_division(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(division_id): Path<Uuid>,
) -> ApiResult<Vec<Student>> {
    let students = StudentService::new(&state).list_by_division(teacher.id, division_id).await?;
    Ok(ApiResponse::success(students))
}

/// GET /api/students/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<Student> {
    let student = StudentService::new(&state).get(teacher.id, id).await?;
    Ok(ApiResponse::success(student))
}

/// POST /api/students
pub async fn post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<CreateStudentRequest>,
) -> ApiResult<Student> {
    let (student, reactivated) = StudentService::new(&state).create(teacher.id, request).await?;
    let message = if reactivated {
        "Student reactivated successfully"
    } else {
        "Student created successfully"
    };
    Ok(ApiResponse::created(student).message(message))
}

/// POST /api/students/import - Bulk create from spreadsheet rows
pub async fn import(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<ImportStudentsRequest>,
) -> ApiResult<ImportSummary> {
    let summary = ImportService::new(&state).import(teacher.id, request).await?;
    let message = format!(
        "Import completed: {} imported, {} reactivated, {} duplicates, {} errors",
        summary.success_count, summary.reactivated_count, summary.duplicate_count, summary.error_count
    );
    Ok(ApiResponse::success(summary).message(message))
}

/// PUT /api/students/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStudentRequest>,
) -> ApiResult<Student> {
    let student = StudentService::new(&state).update(teacher.id, id, request).await?;
    Ok(ApiResponse::success(student).message("Student updated successfully"))
}

/// DELETE /api/students/:id - Soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    StudentService::new(&state).delete(teacher.id, id).await?;
    Ok(ApiResponse::success(()).message("Student deleted successfully"))
}

/// POST /api/students/:id/profile-picture - Multipart `profilePicture` image
pub async fn picture_post(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Student> {
    let mut form = read_form(multipart, &state.config.api).await?;
    let file = match form.take_file("profilePicture") {
        Some(file) => file,
        None => form.require_file("image", "No image file provided")?,
    };
    let student = StudentService::new(&state).upload_profile_picture(teacher.id, id, file).await?;
    Ok(ApiResponse::success(student).message("Profile picture uploaded successfully"))
}
