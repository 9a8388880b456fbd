//! Repository seams. Services only talk to these traits; `PgStore` backs them
//! with Postgres and `MemoryStore` keeps everything in process.

use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    AppVersionConfig, Division, LessonPlan, LessonPlanFilter, Mcq, McqStatistics, Page, Standard, Student,
    StudentFilter, Submission, Teacher, Upload, UploadType,
};

pub type DbResult<T> = Result<T, DatabaseError>;

/// Result of a create that may revive a soft-deleted record with the same key
#[derive(Debug, Clone)]
pub enum Upserted<T> {
    Created(T),
    Reactivated(T),
    /// An active record already holds the key; nothing was written
    ActiveExists,
}

/// Rows switched off by a cascading soft-delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeCount {
    pub divisions: u64,
    pub students: u64,
}

#[async_trait]
pub trait TeacherRepository: Send + Sync {
    async fn insert_teacher(&self, teacher: &Teacher) -> DbResult<()>;
    async fn find_teacher_by_id(&self, id: Uuid) -> DbResult<Option<Teacher>>;
    async fn find_teacher_by_email(&self, email: &str) -> DbResult<Option<Teacher>>;
    async fn update_teacher(&self, teacher: &Teacher) -> DbResult<()>;
}

#[async_trait]
pub trait StandardRepository: Send + Sync {
    async fn list_standards(&self, teacher_id: Uuid) -> DbResult<Vec<Standard>>;
    async fn find_standard(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Standard>>;
    async fn find_active_standard_by_name(&self, teacher_id: Uuid, name: &str) -> DbResult<Option<Standard>>;
    /// Insert, or revive the inactive standard with the same (teacher, name)
    async fn find_active_or_reactivate_standard(&self, standard: &Standard) -> DbResult<Upserted<Standard>>;
    async fn update_standard(&self, standard: &Standard) -> DbResult<()>;
    /// Deactivate the standard with its divisions and students
    async fn deactivate_standard(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<CascadeCount>>;
}

#[async_trait]
pub trait DivisionRepository: Send + Sync {
    async fn list_divisions_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> DbResult<Vec<Division>>;
    async fn find_division(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Division>>;
    async fn find_active_division_by_name(&self, standard_id: Uuid, name: &str) -> DbResult<Option<Division>>;
    /// Insert, or revive the inactive division with the same (standard, name)
    async fn find_active_or_reactivate_division(&self, division: &Division) -> DbResult<Upserted<Division>>;
    async fn update_division(&self, division: &Division) -> DbResult<()>;
    /// Deactivate the division and its students; `None` when no active division matched
    async fn deactivate_division(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<u64>>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn list_students(&self, teacher_id: Uuid, filter: StudentFilter, page: Option<Page>) -> DbResult<(Vec<Student>, i64)>;
    async fn find_student(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Student>>;
    async fn find_active_student_by_roll_number(
        &self,
        teacher_id: Uuid,
        division_id: Uuid,
        roll_number: &str,
        exclude: Option<Uuid>,
    ) -> DbResult<Option<Student>>;
    async fn find_active_student_by_uid(
        &self,
        teacher_id: Uuid,
        division_id: Uuid,
        uid: &str,
        exclude: Option<Uuid>,
    ) -> DbResult<Option<Student>>;
    /// Roll numbers held by active students of one division
    async fn active_roll_numbers(&self, teacher_id: Uuid, division_id: Uuid) -> DbResult<Vec<String>>;
    async fn count_active_students(&self, division_id: Uuid) -> DbResult<i64>;
    /// Insert, or refresh an inactive student in the same division holding the roll number or UID
    async fn insert_or_reactivate_student(&self, student: &Student) -> DbResult<Upserted<Student>>;
    async fn update_student(&self, student: &Student) -> DbResult<()>;
    async fn deactivate_student(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait UploadRepository: Send + Sync {
    async fn insert_upload(&self, upload: &Upload) -> DbResult<()>;
    async fn find_upload(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Upload>>;
    async fn list_uploads_for_student(
        &self,
        teacher_id: Uuid,
        student_id: Uuid,
        upload_type: Option<UploadType>,
        page: Page,
    ) -> DbResult<(Vec<Upload>, i64)>;
    async fn update_upload(&self, upload: &Upload) -> DbResult<()>;
    async fn deactivate_upload(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait LessonPlanRepository: Send + Sync {
    async fn insert_lesson_plan(&self, plan: &LessonPlan) -> DbResult<()>;
    async fn find_lesson_plan(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<LessonPlan>>;
    /// Sorted by date, then start time
    async fn list_lesson_plans(&self, teacher_id: Uuid, filter: &LessonPlanFilter) -> DbResult<Vec<LessonPlan>>;
    async fn update_lesson_plan(&self, plan: &LessonPlan) -> DbResult<()>;
    async fn delete_lesson_plan(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait McqRepository: Send + Sync {
    async fn insert_mcq(&self, mcq: &Mcq) -> DbResult<()>;
    async fn find_mcq(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Mcq>>;
    /// Newest first
    async fn list_mcqs_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> DbResult<Vec<Mcq>>;
    async fn update_mcq(&self, mcq: &Mcq) -> DbResult<()>;
    async fn deactivate_mcq(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_submission_for(&self, student_id: Uuid, mcq_id: Uuid) -> DbResult<Option<Submission>>;
    /// Store the submission and fold its score into the MCQ statistics as one unit.
    /// A second submission for the same (student, mcq) fails with `UniqueViolation`.
    async fn record_submission(&self, submission: &Submission) -> DbResult<McqStatistics>;
    async fn find_submission(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Submission>>;
    /// Newest first
    async fn list_submissions_for_student(&self, teacher_id: Uuid, student_id: Uuid) -> DbResult<Vec<Submission>>;
    /// Highest score first
    async fn list_submissions_for_mcq(&self, teacher_id: Uuid, mcq_id: Uuid) -> DbResult<Vec<Submission>>;
}

#[async_trait]
pub trait AppVersionRepository: Send + Sync {
    async fn load_app_version(&self) -> DbResult<Option<AppVersionConfig>>;
    async fn save_app_version(&self, config: &AppVersionConfig) -> DbResult<()>;
}

/// Everything the services need from persistence
#[async_trait]
pub trait Store:
    TeacherRepository
    + StandardRepository
    + DivisionRepository
    + StudentRepository
    + UploadRepository
    + LessonPlanRepository
    + McqRepository
    + SubmissionRepository
    + AppVersionRepository
{
    fn backend_name(&self) -> &'static str;
    async fn health_check(&self) -> DbResult<()>;
}
