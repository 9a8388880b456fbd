// Test-taking routes. The teacher stays the principal: a student sits a test
// on a device the teacher has signed in to, so every lookup is still scoped
// by `teacher.id`.

use axum::extract::{Path, State};
use axum::Extension;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::tests::{
    AvailableTest, ClassResults, HistoryEntry, McqTestService, StudentTest, SubmissionOutcome, SubmitTestRequest,
    TestResult,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    pub student_id: Uuid,
}

/// GET /api/mcq-student/student/:studentId/available-tests
pub async fn available_tests(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Vec<AvailableTest>> {
    let tests = McqTestService::new(&state).available_tests(teacher.id, student_id).await?;
    Ok(ApiResponse::success(tests))
}

/// GET /api/mcq-student/student/test/:mcqId?studentId=
pub async fn test_for_student(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(mcq_id): Path<Uuid>,
    ApiQuery(query): ApiQuery<StudentQuery>,
) -> ApiResult<StudentTest> {
    let test = McqTestService::new(&state)
        .test_for_student(teacher.id, mcq_id, query.student_id)
        .await?;
    Ok(ApiResponse::success(test))
}

/// POST /api/mcq-student/student/submit-test
pub async fn submit(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<SubmitTestRequest>,
) -> ApiResult<SubmissionOutcome> {
    let outcome = McqTestService::new(&state).submit(teacher.id, request).await?;
    Ok(ApiResponse::created(outcome).message("Test submitted successfully"))
}

/// GET /api/mcq-student/student/:studentId/test-history
pub async fn history(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Vec<HistoryEntry>> {
    let history = McqTestService::new(&state).history(teacher.id, student_id).await?;
    Ok(ApiResponse::success(history))
}

/// GET /api/mcq-student/student/test-result/:submissionId
pub async fn result(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(submission_id): Path<Uuid>,
) -> ApiResult<TestResult> {
    let result = McqTestService::new(&state).result(teacher.id, submission_id).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/mcq-student/teacher/test-results/:mcqId - Every submission for one test
pub async fn teacher_results(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    Path(mcq_id): Path<Uuid>,
) -> ApiResult<ClassResults> {
    let results = McqTestService::new(&state).teacher_results(teacher.id, mcq_id).await?;
    Ok(ApiResponse::success(results))
}
