use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    AppVersionConfig, Division, LessonPlan, LessonPlanFilter, Material, Mcq, McqMetadata, McqSettings,
    McqStatistics, Page, ParentContact, ProfilePicture, Question, Standard, Student, StudentFilter, StoredFile,
    Submission, SubmittedAnswer, Teacher, TeacherRole, TeacherSettings, Upload, UploadType,
};
use super::store::*;

const APP_VERSION_KEY: &str = "app_version";

const TEACHER_COLUMNS: &str = "id, name, email, password_hash, role, phone, school, subject, \
    profile_picture_url, profile_picture_public_id, is_active, last_login, otp, otp_expiry, settings, \
    created_at, updated_at";

const STANDARD_COLUMNS: &str = "id, name, description, subjects, created_by, is_active, created_at, updated_at";

const DIVISION_COLUMNS: &str =
    "id, name, full_name, description, standard_id, created_by, is_active, created_at, updated_at";

const STUDENT_COLUMNS: &str = "id, name, standard_id, division_id, roll_number, uid, date_of_birth, \
    parent_phone, parent_email, profile_picture_url, profile_picture_public_id, created_by, is_active, \
    created_at, updated_at";

const UPLOAD_COLUMNS: &str = "id, title, description, student_id, uploaded_by, upload_type, file_url, \
    file_public_id, file_original_name, file_size, file_mime_type, subject, tags, is_active, created_at, updated_at";

const LESSON_PLAN_COLUMNS: &str = "id, teacher_id, standard_id, subject, topic, description, date, start_time, \
    duration, materials, tags, completed, completed_at, created_at, updated_at";

const MCQ_COLUMNS: &str = "id, title, description, standard_id, teacher_id, questions, settings, metadata, \
    total_attempts, average_score, highest_score, lowest_score, is_active, created_at, updated_at";

const SUBMISSION_COLUMNS: &str = "id, student_id, mcq_id, teacher_id, standard_id, answers, score, \
    total_questions, correct_answers, incorrect_answers, time_taken, started_at, completed_at, is_active, created_at";

/// Numeric roll numbers first (by leading digits), then the rest, then missing ones.
const STUDENT_ORDER: &str = "ORDER BY CASE WHEN roll_number IS NULL THEN 2 ELSE 1 END, \
    COALESCE(substring(roll_number from '^[0-9]+')::numeric, 0), name";

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TeacherRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    phone: Option<String>,
    school: Option<String>,
    subject: Option<String>,
    profile_picture_url: Option<String>,
    profile_picture_public_id: Option<String>,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    otp: Option<String>,
    otp_expiry: Option<DateTime<Utc>>,
    settings: Json<TeacherSettings>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeacherRow> for Teacher {
    fn from(row: TeacherRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: TeacherRole::parse(&row.role),
            phone: row.phone,
            school: row.school,
            subject: row.subject,
            profile_picture: ProfilePicture::from_columns(row.profile_picture_url, row.profile_picture_public_id),
            is_active: row.is_active,
            last_login: row.last_login,
            otp: row.otp,
            otp_expiry: row.otp_expiry,
            settings: row.settings.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct StudentRow {
    id: Uuid,
    name: String,
    standard_id: Uuid,
    division_id: Uuid,
    roll_number: Option<String>,
    uid: Option<String>,
    date_of_birth: Option<NaiveDate>,
    parent_phone: Option<String>,
    parent_email: Option<String>,
    profile_picture_url: Option<String>,
    profile_picture_public_id: Option<String>,
    created_by: Uuid,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            standard_id: row.standard_id,
            division_id: row.division_id,
            roll_number: row.roll_number,
            uid: row.uid,
            date_of_birth: row.date_of_birth,
            parent_contact: ParentContact {
                phone: row.parent_phone,
                email: row.parent_email,
            },
            profile_picture: ProfilePicture::from_columns(row.profile_picture_url, row.profile_picture_public_id),
            created_by: row.created_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UploadRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    student_id: Uuid,
    uploaded_by: Uuid,
    upload_type: String,
    file_url: String,
    file_public_id: String,
    file_original_name: String,
    file_size: i64,
    file_mime_type: String,
    subject: Option<String>,
    tags: Vec<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UploadRow> for Upload {
    fn from(row: UploadRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            student_id: row.student_id,
            uploaded_by: row.uploaded_by,
            upload_type: UploadType::parse(&row.upload_type).unwrap_or_else(|| UploadType::from_mime(&row.file_mime_type)),
            file: StoredFile {
                url: row.file_url,
                public_id: row.file_public_id,
                original_name: row.file_original_name,
                size: row.file_size,
                mime_type: row.file_mime_type,
            },
            subject: row.subject,
            tags: row.tags,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct LessonPlanRow {
    id: Uuid,
    teacher_id: Uuid,
    standard_id: Option<Uuid>,
    subject: String,
    topic: String,
    description: Option<String>,
    date: NaiveDate,
    start_time: String,
    duration: i32,
    materials: Json<Vec<Material>>,
    tags: Vec<String>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LessonPlanRow> for LessonPlan {
    fn from(row: LessonPlanRow) -> Self {
        Self {
            id: row.id,
            teacher_id: row.teacher_id,
            standard_id: row.standard_id,
            subject: row.subject,
            topic: row.topic,
            description: row.description,
            date: row.date,
            start_time: row.start_time,
            duration: row.duration,
            materials: row.materials.0,
            tags: row.tags,
            completed: row.completed,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct McqRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    standard_id: Uuid,
    teacher_id: Uuid,
    questions: Json<Vec<Question>>,
    settings: Json<McqSettings>,
    metadata: Json<McqMetadata>,
    total_attempts: i32,
    average_score: i32,
    highest_score: i32,
    lowest_score: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<McqRow> for Mcq {
    fn from(row: McqRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            standard_id: row.standard_id,
            teacher_id: row.teacher_id,
            questions: row.questions.0,
            settings: row.settings.0,
            metadata: row.metadata.0,
            statistics: McqStatistics {
                total_attempts: row.total_attempts,
                average_score: row.average_score,
                highest_score: row.highest_score,
                lowest_score: row.lowest_score,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: Uuid,
    student_id: Uuid,
    mcq_id: Uuid,
    teacher_id: Uuid,
    standard_id: Uuid,
    answers: Json<Vec<SubmittedAnswer>>,
    score: i32,
    total_questions: i32,
    correct_answers: i32,
    incorrect_answers: i32,
    time_taken: i32,
    started_at: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            mcq_id: row.mcq_id,
            teacher_id: row.teacher_id,
            standard_id: row.standard_id,
            answers: row.answers.0,
            score: row.score,
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            incorrect_answers: row.incorrect_answers,
            time_taken: row.time_taken,
            started_at: row.started_at,
            completed_at: row.completed_at,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

fn not_found(what: &str) -> DatabaseError {
    DatabaseError::NotFound(format!("{} not found", what))
}

#[async_trait]
impl TeacherRepository for PgStore {
    async fn insert_teacher(&self, teacher: &Teacher) -> DbResult<()> {
        let query = format!(
            "INSERT INTO teachers ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
            TEACHER_COLUMNS
        );
        let picture = teacher.profile_picture.as_ref();
        sqlx::query(&query)
            .bind(teacher.id)
            .bind(&teacher.name)
            .bind(&teacher.email)
            .bind(&teacher.password_hash)
            .bind(teacher.role.as_str())
            .bind(teacher.phone.as_deref())
            .bind(teacher.school.as_deref())
            .bind(teacher.subject.as_deref())
            .bind(picture.map(|p| p.url.as_str()))
            .bind(picture.map(|p| p.public_id.as_str()))
            .bind(teacher.is_active)
            .bind(teacher.last_login)
            .bind(teacher.otp.as_deref())
            .bind(teacher.otp_expiry)
            .bind(Json(&teacher.settings))
            .bind(teacher.created_at)
            .bind(teacher.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_teacher_by_id(&self, id: Uuid) -> DbResult<Option<Teacher>> {
        let query = format!("SELECT {} FROM teachers WHERE id = $1", TEACHER_COLUMNS);
        let row = sqlx::query_as::<_, TeacherRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Teacher::from))
    }

    async fn find_teacher_by_email(&self, email: &str) -> DbResult<Option<Teacher>> {
        let query = format!("SELECT {} FROM teachers WHERE email = $1", TEACHER_COLUMNS);
        let row = sqlx::query_as::<_, TeacherRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Teacher::from))
    }

    async fn update_teacher(&self, teacher: &Teacher) -> DbResult<()> {
        let picture = teacher.profile_picture.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE teachers SET
                name = $2, email = $3, password_hash = $4, role = $5, phone = $6, school = $7, subject = $8,
                profile_picture_url = $9, profile_picture_public_id = $10, is_active = $11, last_login = $12,
                otp = $13, otp_expiry = $14, settings = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(teacher.id)
        .bind(&teacher.name)
        .bind(&teacher.email)
        .bind(&teacher.password_hash)
        .bind(teacher.role.as_str())
        .bind(teacher.phone.as_deref())
        .bind(teacher.school.as_deref())
        .bind(teacher.subject.as_deref())
        .bind(picture.map(|p| p.url.as_str()))
        .bind(picture.map(|p| p.public_id.as_str()))
        .bind(teacher.is_active)
        .bind(teacher.last_login)
        .bind(teacher.otp.as_deref())
        .bind(teacher.otp_expiry)
        .bind(Json(&teacher.settings))
        .bind(teacher.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("Teacher"));
        }
        Ok(())
    }
}

#[async_trait]
impl StandardRepository for PgStore {
    async fn list_standards(&self, teacher_id: Uuid) -> DbResult<Vec<Standard>> {
        let query = format!(
            "SELECT {} FROM standards WHERE created_by = $1 AND is_active ORDER BY name",
            STANDARD_COLUMNS
        );
        Ok(sqlx::query_as::<_, Standard>(&query)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_standard(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Standard>> {
        let query = format!(
            "SELECT {} FROM standards WHERE id = $1 AND created_by = $2 AND is_active",
            STANDARD_COLUMNS
        );
        Ok(sqlx::query_as::<_, Standard>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_standard_by_name(&self, teacher_id: Uuid, name: &str) -> DbResult<Option<Standard>> {
        let query = format!(
            "SELECT {} FROM standards WHERE created_by = $1 AND name = $2 AND is_active",
            STANDARD_COLUMNS
        );
        Ok(sqlx::query_as::<_, Standard>(&query)
            .bind(teacher_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_or_reactivate_standard(&self, standard: &Standard) -> DbResult<Upserted<Standard>> {
        // An active row on the key makes the DO UPDATE condition false, so nothing is returned
        let query = format!(
            r#"
            INSERT INTO standards ({cols}) VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6)
            ON CONFLICT (created_by, name) DO UPDATE SET
                is_active = TRUE,
                description = EXCLUDED.description,
                subjects = EXCLUDED.subjects,
                updated_at = EXCLUDED.updated_at
            WHERE standards.is_active = FALSE
            RETURNING {cols}
            "#,
            cols = STANDARD_COLUMNS
        );
        let row = sqlx::query_as::<_, Standard>(&query)
            .bind(standard.id)
            .bind(&standard.name)
            .bind(standard.description.as_deref())
            .bind(&standard.subjects)
            .bind(standard.created_by)
            .bind(standard.created_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) if row.id == standard.id => Upserted::Created(row),
            Some(row) => Upserted::Reactivated(row),
            None => Upserted::ActiveExists,
        })
    }

    async fn update_standard(&self, standard: &Standard) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE standards SET name = $3, description = $4, subjects = $5, is_active = $6, updated_at = $7 \
             WHERE id = $1 AND created_by = $2",
        )
        .bind(standard.id)
        .bind(standard.created_by)
        .bind(&standard.name)
        .bind(standard.description.as_deref())
        .bind(&standard.subjects)
        .bind(standard.is_active)
        .bind(standard.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("Standard"));
        }
        Ok(())
    }

    async fn deactivate_standard(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<CascadeCount>> {
        let mut tx = self.pool.begin().await?;

        let standard = sqlx::query(
            "UPDATE standards SET is_active = FALSE, updated_at = now() WHERE id = $1 AND created_by = $2 AND is_active",
        )
        .bind(id)
        .bind(teacher_id)
        .execute(&mut *tx)
        .await?;

        if standard.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let divisions = sqlx::query("UPDATE divisions SET is_active = FALSE, updated_at = now() WHERE standard_id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let students = sqlx::query("UPDATE students SET is_active = FALSE, updated_at = now() WHERE standard_id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(CascadeCount {
            divisions: divisions.rows_affected(),
            students: students.rows_affected(),
        }))
    }
}

#[async_trait]
impl DivisionRepository for PgStore {
    async fn list_divisions_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> DbResult<Vec<Division>> {
        let query = format!(
            "SELECT {} FROM divisions WHERE created_by = $1 AND standard_id = $2 AND is_active ORDER BY name",
            DIVISION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Division>(&query)
            .bind(teacher_id)
            .bind(standard_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_division(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Division>> {
        let query = format!(
            "SELECT {} FROM divisions WHERE id = $1 AND created_by = $2 AND is_active",
            DIVISION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Division>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_division_by_name(&self, standard_id: Uuid, name: &str) -> DbResult<Option<Division>> {
        let query = format!(
            "SELECT {} FROM divisions WHERE standard_id = $1 AND name = $2 AND is_active",
            DIVISION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Division>(&query)
            .bind(standard_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_or_reactivate_division(&self, division: &Division) -> DbResult<Upserted<Division>> {
        let query = format!(
            r#"
            INSERT INTO divisions ({cols}) VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            ON CONFLICT (standard_id, name) DO UPDATE SET
                is_active = TRUE,
                full_name = EXCLUDED.full_name,
                description = EXCLUDED.description,
                created_by = EXCLUDED.created_by,
                updated_at = EXCLUDED.updated_at
            WHERE divisions.is_active = FALSE
            RETURNING {cols}
            "#,
            cols = DIVISION_COLUMNS
        );
        let row = sqlx::query_as::<_, Division>(&query)
            .bind(division.id)
            .bind(&division.name)
            .bind(&division.full_name)
            .bind(division.description.as_deref())
            .bind(division.standard_id)
            .bind(division.created_by)
            .bind(division.created_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) if row.id == division.id => Upserted::Created(row),
            Some(row) => Upserted::Reactivated(row),
            None => Upserted::ActiveExists,
        })
    }

    async fn update_division(&self, division: &Division) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE divisions SET name = $3, full_name = $4, description = $5, standard_id = $6, is_active = $7, \
             updated_at = $8 WHERE id = $1 AND created_by = $2",
        )
        .bind(division.id)
        .bind(division.created_by)
        .bind(&division.name)
        .bind(&division.full_name)
        .bind(division.description.as_deref())
        .bind(division.standard_id)
        .bind(division.is_active)
        .bind(division.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("Division"));
        }
        Ok(())
    }

    async fn deactivate_division(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let division = sqlx::query(
            "UPDATE divisions SET is_active = FALSE, updated_at = now() WHERE id = $1 AND created_by = $2 AND is_active",
        )
        .bind(id)
        .bind(teacher_id)
        .execute(&mut *tx)
        .await?;

        if division.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let students = sqlx::query("UPDATE students SET is_active = FALSE, updated_at = now() WHERE division_id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(students.rows_affected()))
    }
}

#[async_trait]
impl StudentRepository for PgStore {
    async fn list_students(&self, teacher_id: Uuid, filter: StudentFilter, page: Option<Page>) -> DbResult<(Vec<Student>, i64)> {
        let scope = "created_by = $1 AND is_active \
            AND ($2::uuid IS NULL OR standard_id = $2) \
            AND ($3::uuid IS NULL OR division_id = $3)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM students WHERE {}", scope))
            .bind(teacher_id)
            .bind(filter.standard_id)
            .bind(filter.division_id)
            .fetch_one(&self.pool)
            .await?;

        // LIMIT NULL means no limit
        let query = format!(
            "SELECT {} FROM students WHERE {} {} LIMIT $4 OFFSET $5",
            STUDENT_COLUMNS, scope, STUDENT_ORDER
        );
        let rows = sqlx::query_as::<_, StudentRow>(&query)
            .bind(teacher_id)
            .bind(filter.standard_id)
            .bind(filter.division_id)
            .bind(page.map(|p| p.limit as i64))
            .bind(page.map(|p| p.offset() as i64).unwrap_or(0))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Student::from).collect(), total))
    }

    async fn find_student(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Student>> {
        let query = format!(
            "SELECT {} FROM students WHERE id = $1 AND created_by = $2 AND is_active",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn find_active_student_by_roll_number(
        &self,
        teacher_id: Uuid,
        division_id: Uuid,
        roll_number: &str,
        exclude: Option<Uuid>,
    ) -> DbResult<Option<Student>> {
        let query = format!(
            "SELECT {} FROM students WHERE created_by = $1 AND division_id = $2 AND roll_number = $3 \
             AND is_active AND ($4::uuid IS NULL OR id <> $4) LIMIT 1",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(teacher_id)
            .bind(division_id)
            .bind(roll_number)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn find_active_student_by_uid(
        &self,
        teacher_id: Uuid,
        division_id: Uuid,
        uid: &str,
        exclude: Option<Uuid>,
    ) -> DbResult<Option<Student>> {
        let query = format!(
            "SELECT {} FROM students WHERE created_by = $1 AND division_id = $2 AND uid = $3 \
             AND is_active AND ($4::uuid IS NULL OR id <> $4) LIMIT 1",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(teacher_id)
            .bind(division_id)
            .bind(uid)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn active_roll_numbers(&self, teacher_id: Uuid, division_id: Uuid) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT roll_number FROM students \
             WHERE created_by = $1 AND division_id = $2 AND is_active AND roll_number IS NOT NULL",
        )
        .bind(teacher_id)
        .bind(division_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_active_students(&self, division_id: Uuid) -> DbResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE division_id = $1 AND is_active")
            .bind(division_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert_or_reactivate_student(&self, student: &Student) -> DbResult<Upserted<Student>> {
        let mut tx = self.pool.begin().await?;
        let picture = student.profile_picture.as_ref();

        let revive = format!(
            r#"
            UPDATE students SET
                name = $3, standard_id = $4, roll_number = $5, uid = $6, date_of_birth = $7,
                parent_phone = $8, parent_email = $9, profile_picture_url = $10, profile_picture_public_id = $11,
                is_active = TRUE, updated_at = now()
            WHERE id = (
                SELECT id FROM students
                WHERE created_by = $1 AND division_id = $2 AND NOT is_active
                  AND ((roll_number IS NOT NULL AND roll_number = $5) OR (uid IS NOT NULL AND uid = $6))
                ORDER BY updated_at DESC
                LIMIT 1
                FOR UPDATE
            )
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        );
        let revived = sqlx::query_as::<_, StudentRow>(&revive)
            .bind(student.created_by)
            .bind(student.division_id)
            .bind(&student.name)
            .bind(student.standard_id)
            .bind(student.roll_number.as_deref())
            .bind(student.uid.as_deref())
            .bind(student.date_of_birth)
            .bind(student.parent_contact.phone.as_deref())
            .bind(student.parent_contact.email.as_deref())
            .bind(picture.map(|p| p.url.as_str()))
            .bind(picture.map(|p| p.public_id.as_str()))
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = revived {
            tx.commit().await?;
            return Ok(Upserted::Reactivated(row.into()));
        }

        let insert = format!(
            "INSERT INTO students ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, $13, $13) \
             RETURNING {cols}",
            cols = STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&insert)
            .bind(student.id)
            .bind(&student.name)
            .bind(student.standard_id)
            .bind(student.division_id)
            .bind(student.roll_number.as_deref())
            .bind(student.uid.as_deref())
            .bind(student.date_of_birth)
            .bind(student.parent_contact.phone.as_deref())
            .bind(student.parent_contact.email.as_deref())
            .bind(picture.map(|p| p.url.as_str()))
            .bind(picture.map(|p| p.public_id.as_str()))
            .bind(student.created_by)
            .bind(student.created_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Upserted::Created(row.into()))
    }

    async fn update_student(&self, student: &Student) -> DbResult<()> {
        let picture = student.profile_picture.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE students SET
                name = $3, standard_id = $4, division_id = $5, roll_number = $6, uid = $7, date_of_birth = $8,
                parent_phone = $9, parent_email = $10, profile_picture_url = $11, profile_picture_public_id = $12,
                is_active = $13, updated_at = $14
            WHERE id = $1 AND created_by = $2
            "#,
        )
        .bind(student.id)
        .bind(student.created_by)
        .bind(&student.name)
        .bind(student.standard_id)
        .bind(student.division_id)
        .bind(student.roll_number.as_deref())
        .bind(student.uid.as_deref())
        .bind(student.date_of_birth)
        .bind(student.parent_contact.phone.as_deref())
        .bind(student.parent_contact.email.as_deref())
        .bind(picture.map(|p| p.url.as_str()))
        .bind(picture.map(|p| p.public_id.as_str()))
        .bind(student.is_active)
        .bind(student.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("Student"));
        }
        Ok(())
    }

    async fn deactivate_student(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE students SET is_active = FALSE, updated_at = now() WHERE id = $1 AND created_by = $2 AND is_active",
        )
        .bind(id)
        .bind(teacher_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UploadRepository for PgStore {
    async fn insert_upload(&self, upload: &Upload) -> DbResult<()> {
        let query = format!(
            "INSERT INTO uploads ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            UPLOAD_COLUMNS
        );
        sqlx::query(&query)
            .bind(upload.id)
            .bind(&upload.title)
            .bind(upload.description.as_deref())
            .bind(upload.student_id)
            .bind(upload.uploaded_by)
            .bind(upload.upload_type.as_str())
            .bind(&upload.file.url)
            .bind(&upload.file.public_id)
            .bind(&upload.file.original_name)
            .bind(upload.file.size)
            .bind(&upload.file.mime_type)
            .bind(upload.subject.as_deref())
            .bind(&upload.tags)
            .bind(upload.is_active)
            .bind(upload.created_at)
            .bind(upload.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_upload(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Upload>> {
        let query = format!(
            "SELECT {} FROM uploads WHERE id = $1 AND uploaded_by = $2 AND is_active",
            UPLOAD_COLUMNS
        );
        let row = sqlx::query_as::<_, UploadRow>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Upload::from))
    }

    async fn list_uploads_for_student(
        &self,
        teacher_id: Uuid,
        student_id: Uuid,
        upload_type: Option<UploadType>,
        page: Page,
    ) -> DbResult<(Vec<Upload>, i64)> {
        let scope = "uploaded_by = $1 AND student_id = $2 AND is_active AND ($3::text IS NULL OR upload_type = $3)";
        let kind = upload_type.map(|t| t.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM uploads WHERE {}", scope))
            .bind(teacher_id)
            .bind(student_id)
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            "SELECT {} FROM uploads WHERE {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
            UPLOAD_COLUMNS, scope
        );
        let rows = sqlx::query_as::<_, UploadRow>(&query)
            .bind(teacher_id)
            .bind(student_id)
            .bind(kind)
            .bind(page.limit as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Upload::from).collect(), total))
    }

    async fn update_upload(&self, upload: &Upload) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE uploads SET title = $3, description = $4, subject = $5, tags = $6, is_active = $7, updated_at = $8 \
             WHERE id = $1 AND uploaded_by = $2",
        )
        .bind(upload.id)
        .bind(upload.uploaded_by)
        .bind(&upload.title)
        .bind(upload.description.as_deref())
        .bind(upload.subject.as_deref())
        .bind(&upload.tags)
        .bind(upload.is_active)
        .bind(upload.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("Upload"));
        }
        Ok(())
    }

    async fn deactivate_upload(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE uploads SET is_active = FALSE, updated_at = now() WHERE id = $1 AND uploaded_by = $2 AND is_active",
        )
        .bind(id)
        .bind(teacher_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LessonPlanRepository for PgStore {
    async fn insert_lesson_plan(&self, plan: &LessonPlan) -> DbResult<()> {
        let query = format!(
            "INSERT INTO lesson_plans ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            LESSON_PLAN_COLUMNS
        );
        sqlx::query(&query)
            .bind(plan.id)
            .bind(plan.teacher_id)
            .bind(plan.standard_id)
            .bind(&plan.subject)
            .bind(&plan.topic)
            .bind(plan.description.as_deref())
            .bind(plan.date)
            .bind(&plan.start_time)
            .bind(plan.duration)
            .bind(Json(&plan.materials))
            .bind(&plan.tags)
            .bind(plan.completed)
            .bind(plan.completed_at)
            .bind(plan.created_at)
            .bind(plan.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_lesson_plan(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<LessonPlan>> {
        let query = format!(
            "SELECT {} FROM lesson_plans WHERE id = $1 AND teacher_id = $2",
            LESSON_PLAN_COLUMNS
        );
        let row = sqlx::query_as::<_, LessonPlanRow>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(LessonPlan::from))
    }

    async fn list_lesson_plans(&self, teacher_id: Uuid, filter: &LessonPlanFilter) -> DbResult<Vec<LessonPlan>> {
        let query = format!(
            r#"
            SELECT {} FROM lesson_plans
            WHERE teacher_id = $1
              AND ($2::date IS NULL OR date = $2)
              AND ($3::date IS NULL OR date >= $3)
              AND ($4::date IS NULL OR date <= $4)
              AND ($5::boolean IS NULL OR completed = $5)
              AND ($6::text IS NULL OR lower(subject) = lower($6))
            ORDER BY date, start_time
            "#,
            LESSON_PLAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, LessonPlanRow>(&query)
            .bind(teacher_id)
            .bind(filter.date)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.completed)
            .bind(filter.subject.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(LessonPlan::from).collect())
    }

    async fn update_lesson_plan(&self, plan: &LessonPlan) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE lesson_plans SET
                standard_id = $3, subject = $4, topic = $5, description = $6, date = $7, start_time = $8,
                duration = $9, materials = $10, tags = $11, completed = $12, completed_at = $13, updated_at = $14
            WHERE id = $1 AND teacher_id = $2
            "#,
        )
        .bind(plan.id)
        .bind(plan.teacher_id)
        .bind(plan.standard_id)
        .bind(&plan.subject)
        .bind(&plan.topic)
        .bind(plan.description.as_deref())
        .bind(plan.date)
        .bind(&plan.start_time)
        .bind(plan.duration)
        .bind(Json(&plan.materials))
        .bind(&plan.tags)
        .bind(plan.completed)
        .bind(plan.completed_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("Lesson plan"));
        }
        Ok(())
    }

    async fn delete_lesson_plan(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM lesson_plans WHERE id = $1 AND teacher_id = $2")
            .bind(id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl McqRepository for PgStore {
    async fn insert_mcq(&self, mcq: &Mcq) -> DbResult<()> {
        let query = format!(
            "INSERT INTO mcqs ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            MCQ_COLUMNS
        );
        sqlx::query(&query)
            .bind(mcq.id)
            .bind(&mcq.title)
            .bind(mcq.description.as_deref())
            .bind(mcq.standard_id)
            .bind(mcq.teacher_id)
            .bind(Json(&mcq.questions))
            .bind(Json(&mcq.settings))
            .bind(Json(&mcq.metadata))
            .bind(mcq.statistics.total_attempts)
            .bind(mcq.statistics.average_score)
            .bind(mcq.statistics.highest_score)
            .bind(mcq.statistics.lowest_score)
            .bind(mcq.is_active)
            .bind(mcq.created_at)
            .bind(mcq.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_mcq(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Mcq>> {
        let query = format!(
            "SELECT {} FROM mcqs WHERE id = $1 AND teacher_id = $2 AND is_active",
            MCQ_COLUMNS
        );
        let row = sqlx::query_as::<_, McqRow>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Mcq::from))
    }

    async fn list_mcqs_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> DbResult<Vec<Mcq>> {
        let query = format!(
            "SELECT {} FROM mcqs WHERE teacher_id = $1 AND standard_id = $2 AND is_active ORDER BY created_at DESC",
            MCQ_COLUMNS
        );
        let rows = sqlx::query_as::<_, McqRow>(&query)
            .bind(teacher_id)
            .bind(standard_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Mcq::from).collect())
    }

    async fn update_mcq(&self, mcq: &Mcq) -> DbResult<()> {
        // Statistics columns are owned by record_submission
        let result = sqlx::query(
            "UPDATE mcqs SET title = $3, description = $4, standard_id = $5, questions = $6, settings = $7, \
             metadata = $8, is_active = $9, updated_at = $10 WHERE id = $1 AND teacher_id = $2",
        )
        .bind(mcq.id)
        .bind(mcq.teacher_id)
        .bind(&mcq.title)
        .bind(mcq.description.as_deref())
        .bind(mcq.standard_id)
        .bind(Json(&mcq.questions))
        .bind(Json(&mcq.settings))
        .bind(Json(&mcq.metadata))
        .bind(mcq.is_active)
        .bind(mcq.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("MCQ"));
        }
        Ok(())
    }

    async fn deactivate_mcq(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE mcqs SET is_active = FALSE, updated_at = now() WHERE id = $1 AND teacher_id = $2 AND is_active",
        )
        .bind(id)
        .bind(teacher_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubmissionRepository for PgStore {
    async fn find_submission_for(&self, student_id: Uuid, mcq_id: Uuid) -> DbResult<Option<Submission>> {
        let query = format!(
            "SELECT {} FROM mcq_submissions WHERE student_id = $1 AND mcq_id = $2 AND is_active",
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(student_id)
            .bind(mcq_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Submission::from))
    }

    async fn record_submission(&self, submission: &Submission) -> DbResult<McqStatistics> {
        let mut tx = self.pool.begin().await?;

        let insert = format!(
            "INSERT INTO mcq_submissions ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            SUBMISSION_COLUMNS
        );
        sqlx::query(&insert)
            .bind(submission.id)
            .bind(submission.student_id)
            .bind(submission.mcq_id)
            .bind(submission.teacher_id)
            .bind(submission.standard_id)
            .bind(Json(&submission.answers))
            .bind(submission.score)
            .bind(submission.total_questions)
            .bind(submission.correct_answers)
            .bind(submission.incorrect_answers)
            .bind(submission.time_taken)
            .bind(submission.started_at)
            .bind(submission.completed_at)
            .bind(submission.is_active)
            .bind(submission.created_at)
            .execute(&mut *tx)
            .await?;

        let current: Option<(i32, i32, i32, i32)> = sqlx::query_as(
            "SELECT total_attempts, average_score, highest_score, lowest_score FROM mcqs WHERE id = $1 FOR UPDATE",
        )
        .bind(submission.mcq_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (total_attempts, average_score, highest_score, lowest_score) = current.ok_or_else(|| not_found("MCQ"))?;
        let mut statistics = McqStatistics {
            total_attempts,
            average_score,
            highest_score,
            lowest_score,
        };
        statistics.record(submission.score);

        sqlx::query(
            "UPDATE mcqs SET total_attempts = $2, average_score = $3, highest_score = $4, lowest_score = $5, \
             updated_at = now() WHERE id = $1",
        )
        .bind(submission.mcq_id)
        .bind(statistics.total_attempts)
        .bind(statistics.average_score)
        .bind(statistics.highest_score)
        .bind(statistics.lowest_score)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(statistics)
    }

    async fn find_submission(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Submission>> {
        let query = format!(
            "SELECT {} FROM mcq_submissions WHERE id = $1 AND teacher_id = $2 AND is_active",
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(id)
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Submission::from))
    }

    async fn list_submissions_for_student(&self, teacher_id: Uuid, student_id: Uuid) -> DbResult<Vec<Submission>> {
        let query = format!(
            "SELECT {} FROM mcq_submissions WHERE teacher_id = $1 AND student_id = $2 AND is_active \
             ORDER BY completed_at DESC",
            SUBMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(teacher_id)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Submission::from).collect())
    }

    async fn list_submissions_for_mcq(&self, teacher_id: Uuid, mcq_id: Uuid) -> DbResult<Vec<Submission>> {
        let query = format!(
            "SELECT {} FROM mcq_submissions WHERE teacher_id = $1 AND mcq_id = $2 AND is_active \
             ORDER BY score DESC, completed_at",
            SUBMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(teacher_id)
            .bind(mcq_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Submission::from).collect())
    }
}

#[async_trait]
impl AppVersionRepository for PgStore {
    async fn load_app_version(&self) -> DbResult<Option<AppVersionConfig>> {
        let value: Option<Json<AppVersionConfig>> =
            sqlx::query_scalar("SELECT value FROM app_settings WHERE key = $1")
                .bind(APP_VERSION_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.map(|v| v.0))
    }

    async fn save_app_version(&self, config: &AppVersionConfig) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO app_settings (key, value, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
        )
        .bind(APP_VERSION_KEY)
        .bind(Json(config))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
