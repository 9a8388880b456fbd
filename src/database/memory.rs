use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::student::compare_by_roll_number;
use super::models::{
    AppVersionConfig, Division, LessonPlan, LessonPlanFilter, Mcq, McqStatistics, Page, Standard, Student,
    StudentFilter, Submission, Teacher, Upload, UploadType,
};
use super::store::*;

#[derive(Default)]
struct Tables {
    teachers: HashMap<Uuid, Teacher>,
    standards: HashMap<Uuid, Standard>,
    divisions: HashMap<Uuid, Division>,
    students: HashMap<Uuid, Student>,
    uploads: HashMap<Uuid, Upload>,
    lesson_plans: HashMap<Uuid, LessonPlan>,
    mcqs: HashMap<Uuid, Mcq>,
    submissions: HashMap<Uuid, Submission>,
    app_version: Option<AppVersionConfig>,
}

/// In-process store used for development and tests. A single lock guards all
/// tables, so every trait method is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, page: Option<Page>) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let items = match page {
        Some(page) => items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect(),
        None => items,
    };
    (items, total)
}

fn violation(constraint: &str) -> DatabaseError {
    DatabaseError::UniqueViolation(constraint.to_string())
}

fn check_student_keys(tables: &Tables, student: &Student) -> DbResult<()> {
    let clash = |other: &&Student, pick: fn(&Student) -> Option<&str>| {
        other.id != student.id
            && other.is_active
            && other.created_by == student.created_by
            && other.division_id == student.division_id
            && pick(other).is_some()
            && pick(other) == pick(student)
    };
    if tables.students.values().any(|o| clash(&o, |s| s.roll_number.as_deref())) {
        return Err(violation("students_roll_number_active_idx"));
    }
    if tables.students.values().any(|o| clash(&o, |s| s.uid.as_deref())) {
        return Err(violation("students_uid_active_idx"));
    }
    Ok(())
}

#[async_trait]
impl TeacherRepository for MemoryStore {
    async fn insert_teacher(&self, teacher: &Teacher) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.teachers.values().any(|t| t.email == teacher.email) {
            return Err(violation("teachers_email_key"));
        }
        tables.teachers.insert(teacher.id, teacher.clone());
        Ok(())
    }

    async fn find_teacher_by_id(&self, id: Uuid) -> DbResult<Option<Teacher>> {
        Ok(self.tables.read().await.teachers.get(&id).cloned())
    }

    async fn find_teacher_by_email(&self, email: &str) -> DbResult<Option<Teacher>> {
        let tables = self.tables.read().await;
        Ok(tables.teachers.values().find(|t| t.email == email).cloned())
    }

    async fn update_teacher(&self, teacher: &Teacher) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.teachers.values().any(|t| t.id != teacher.id && t.email == teacher.email) {
            return Err(violation("teachers_email_key"));
        }
        match tables.teachers.get_mut(&teacher.id) {
            Some(existing) => {
                *existing = teacher.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound("Teacher not found".to_string())),
        }
    }
}

#[async_trait]
impl StandardRepository for MemoryStore {
    async fn list_standards(&self, teacher_id: Uuid) -> DbResult<Vec<Standard>> {
        let tables = self.tables.read().await;
        let mut standards: Vec<Standard> = tables
            .standards
            .values()
            .filter(|s| s.created_by == teacher_id && s.is_active)
            .cloned()
            .collect();
        standards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(standards)
    }

    async fn find_standard(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Standard>> {
        let tables = self.tables.read().await;
        Ok(tables
            .standards
            .get(&id)
            .filter(|s| s.created_by == teacher_id && s.is_active)
            .cloned())
    }

    async fn find_active_standard_by_name(&self, teacher_id: Uuid, name: &str) -> DbResult<Option<Standard>> {
        let tables = self.tables.read().await;
        Ok(tables
            .standards
            .values()
            .find(|s| s.created_by == teacher_id && s.is_active && s.name == name)
            .cloned())
    }

    async fn find_active_or_reactivate_standard(&self, standard: &Standard) -> DbResult<Upserted<Standard>> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .standards
            .values_mut()
            .find(|s| s.created_by == standard.created_by && s.name == standard.name);

        match existing {
            Some(s) if s.is_active => Ok(Upserted::ActiveExists),
            Some(s) => {
                s.is_active = true;
                s.description = standard.description.clone();
                s.subjects = standard.subjects.clone();
                s.updated_at = Utc::now();
                Ok(Upserted::Reactivated(s.clone()))
            }
            None => {
                tables.standards.insert(standard.id, standard.clone());
                Ok(Upserted::Created(standard.clone()))
            }
        }
    }

    async fn update_standard(&self, standard: &Standard) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .standards
            .values()
            .any(|s| s.id != standard.id && s.created_by == standard.created_by && s.name == standard.name)
        {
            return Err(violation("standards_teacher_name_key"));
        }
        match tables.standards.get_mut(&standard.id) {
            Some(existing) => {
                *existing = standard.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound("Standard not found".to_string())),
        }
    }

    async fn deactivate_standard(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<CascadeCount>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        match tables.standards.get_mut(&id) {
            Some(s) if s.created_by == teacher_id && s.is_active => {
                s.is_active = false;
                s.updated_at = now;
            }
            _ => return Ok(None),
        }

        let mut count = CascadeCount::default();
        for division in tables.divisions.values_mut().filter(|d| d.standard_id == id && d.is_active) {
            division.is_active = false;
            division.updated_at = now;
            count.divisions += 1;
        }
        for student in tables.students.values_mut().filter(|s| s.standard_id == id && s.is_active) {
            student.is_active = false;
            student.updated_at = now;
            count.students += 1;
        }
        Ok(Some(count))
    }
}

#[async_trait]
impl DivisionRepository for MemoryStore {
    async fn list_divisions_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> DbResult<Vec<Division>> {
        let tables = self.tables.read().await;
        let mut divisions: Vec<Division> = tables
            .divisions
            .values()
            .filter(|d| d.created_by == teacher_id && d.standard_id == standard_id && d.is_active)
            .cloned()
            .collect();
        divisions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(divisions)
    }

    async fn find_division(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Division>> {
        let tables = self.tables.read().await;
        Ok(tables
            .divisions
            .get(&id)
            .filter(|d| d.created_by == teacher_id && d.is_active)
            .cloned())
    }

    async fn find_active_division_by_name(&self, standard_id: Uuid, name: &str) -> DbResult<Option<Division>> {
        let tables = self.tables.read().await;
        Ok(tables
            .divisions
            .values()
            .find(|d| d.standard_id == standard_id && d.is_active && d.name == name)
            .cloned())
    }

    async fn find_active_or_reactivate_division(&self, division: &Division) -> DbResult<Upserted<Division>> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .divisions
            .values_mut()
            .find(|d| d.standard_id == division.standard_id && d.name == division.name);

        match existing {
            Some(d) if d.is_active => Ok(Upserted::ActiveExists),
            Some(d) => {
                d.is_active = true;
                d.full_name = division.full_name.clone();
                d.description = division.description.clone();
                d.created_by = division.created_by;
                d.updated_at = Utc::now();
                Ok(Upserted::Reactivated(d.clone()))
            }
            None => {
                tables.divisions.insert(division.id, division.clone());
                Ok(Upserted::Created(division.clone()))
            }
        }
    }

    async fn update_division(&self, division: &Division) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .divisions
            .values()
            .any(|d| d.id != division.id && d.standard_id == division.standard_id && d.name == division.name)
        {
            return Err(violation("divisions_standard_name_key"));
        }
        match tables.divisions.get_mut(&division.id) {
            Some(existing) => {
                *existing = division.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound("Division not found".to_string())),
        }
    }

    async fn deactivate_division(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<u64>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        match tables.divisions.get_mut(&id) {
            Some(d) if d.created_by == teacher_id && d.is_active => {
                d.is_active = false;
                d.updated_at = now;
            }
            _ => return Ok(None),
        }

        let mut students = 0;
        for student in tables.students.values_mut().filter(|s| s.division_id == id && s.is_active) {
            student.is_active = false;
            student.updated_at = now;
            students += 1;
        }
        Ok(Some(students))
    }
}

#[async_trait]
impl StudentRepository for MemoryStore {
    async fn list_students(&self, teacher_id: Uuid, filter: StudentFilter, page: Option<Page>) -> DbResult<(Vec<Student>, i64)> {
        let tables = self.tables.read().await;
        let mut students: Vec<Student> = tables
            .students
            .values()
            .filter(|s| s.created_by == teacher_id && s.is_active)
            .filter(|s| filter.standard_id.map_or(true, |id| s.standard_id == id))
            .filter(|s| filter.division_id.map_or(true, |id| s.division_id == id))
            .cloned()
            .collect();
        students.sort_by(compare_by_roll_number);
        Ok(paginate(students, page))
    }

    async fn find_student(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Student>> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .get(&id)
            .filter(|s| s.created_by == teacher_id && s.is_active)
            .cloned())
    }

    async fn find_active_student_by_roll_number(
        &self,
        teacher_id: Uuid,
        division_id: Uuid,
        roll_number: &str,
        exclude: Option<Uuid>,
    ) -> DbResult<Option<Student>> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .values()
            .find(|s| {
                s.created_by == teacher_id
                    && s.division_id == division_id
                    && s.is_active
                    && s.roll_number.as_deref() == Some(roll_number)
                    && Some(s.id) != exclude
            })
            .cloned())
    }

    async fn find_active_student_by_uid(
        &self,
        teacher_id: Uuid,
        division_id: Uuid,
        uid: &str,
        exclude: Option<Uuid>,
    ) -> DbResult<Option<Student>> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .values()
            .find(|s| {
                s.created_by == teacher_id
                    && s.division_id == division_id
                    && s.is_active
                    && s.uid.as_deref() == Some(uid)
                    && Some(s.id) != exclude
            })
            .cloned())
    }

    async fn active_roll_numbers(&self, teacher_id: Uuid, division_id: Uuid) -> DbResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .values()
            .filter(|s| s.created_by == teacher_id && s.division_id == division_id && s.is_active)
            .filter_map(|s| s.roll_number.clone())
            .collect())
    }

    async fn count_active_students(&self, division_id: Uuid) -> DbResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .values()
            .filter(|s| s.division_id == division_id && s.is_active)
            .count() as i64)
    }

    async fn insert_or_reactivate_student(&self, student: &Student) -> DbResult<Upserted<Student>> {
        let mut tables = self.tables.write().await;
        check_student_keys(&tables, student)?;

        let same_key = |s: &Student, field: fn(&Student) -> Option<&str>| field(s).is_some() && field(s) == field(student);
        let dormant = tables
            .students
            .values_mut()
            .filter(|s| !s.is_active && s.created_by == student.created_by && s.division_id == student.division_id)
            .filter(|s| same_key(s, |x| x.roll_number.as_deref()) || same_key(s, |x| x.uid.as_deref()))
            .max_by_key(|s| s.updated_at);

        if let Some(existing) = dormant {
            let (id, created_at) = (existing.id, existing.created_at);
            *existing = Student {
                id,
                created_at,
                is_active: true,
                updated_at: Utc::now(),
                ..student.clone()
            };
            return Ok(Upserted::Reactivated(existing.clone()));
        }

        tables.students.insert(student.id, student.clone());
        Ok(Upserted::Created(student.clone()))
    }

    async fn update_student(&self, student: &Student) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if student.is_active {
            check_student_keys(&tables, student)?;
        }
        match tables.students.get_mut(&student.id) {
            Some(existing) => {
                *existing = student.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound("Student not found".to_string())),
        }
    }

    async fn deactivate_student(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.students.get_mut(&id) {
            Some(s) if s.created_by == teacher_id && s.is_active => {
                s.is_active = false;
                s.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl UploadRepository for MemoryStore {
    async fn insert_upload(&self, upload: &Upload) -> DbResult<()> {
        self.tables.write().await.uploads.insert(upload.id, upload.clone());
        Ok(())
    }

    async fn find_upload(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Upload>> {
        let tables = self.tables.read().await;
        Ok(tables
            .uploads
            .get(&id)
            .filter(|u| u.uploaded_by == teacher_id && u.is_active)
            .cloned())
    }

    async fn list_uploads_for_student(
        &self,
        teacher_id: Uuid,
        student_id: Uuid,
        upload_type: Option<UploadType>,
        page: Page,
    ) -> DbResult<(Vec<Upload>, i64)> {
        let tables = self.tables.read().await;
        let mut uploads: Vec<Upload> = tables
            .uploads
            .values()
            .filter(|u| u.uploaded_by == teacher_id && u.student_id == student_id && u.is_active)
            .filter(|u| upload_type.map_or(true, |t| u.upload_type == t))
            .cloned()
            .collect();
        uploads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(uploads, Some(page)))
    }

    async fn update_upload(&self, upload: &Upload) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.uploads.get_mut(&upload.id) {
            Some(existing) => {
                *existing = upload.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound("Upload not found".to_string())),
        }
    }

    async fn deactivate_upload(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.uploads.get_mut(&id) {
            Some(u) if u.uploaded_by == teacher_id && u.is_active => {
                u.is_active = false;
                u.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl LessonPlanRepository for MemoryStore {
    async fn insert_lesson_plan(&self, plan: &LessonPlan) -> DbResult<()> {
        self.tables.write().await.lesson_plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn find_lesson_plan(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<LessonPlan>> {
        let tables = self.tables.read().await;
        Ok(tables.lesson_plans.get(&id).filter(|p| p.teacher_id == teacher_id).cloned())
    }

    async fn list_lesson_plans(&self, teacher_id: Uuid, filter: &LessonPlanFilter) -> DbResult<Vec<LessonPlan>> {
        let tables = self.tables.read().await;
        let mut plans: Vec<LessonPlan> = tables
            .lesson_plans
            .values()
            .filter(|p| p.teacher_id == teacher_id && filter.matches(p))
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.start_time.cmp(&b.start_time)));
        Ok(plans)
    }

    async fn update_lesson_plan(&self, plan: &LessonPlan) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.lesson_plans.get_mut(&plan.id) {
            Some(existing) => {
                *existing = plan.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound("Lesson plan not found".to_string())),
        }
    }

    async fn delete_lesson_plan(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables.lesson_plans.get(&id).is_some_and(|p| p.teacher_id == teacher_id);
        if owned {
            tables.lesson_plans.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl McqRepository for MemoryStore {
    async fn insert_mcq(&self, mcq: &Mcq) -> DbResult<()> {
        self.tables.write().await.mcqs.insert(mcq.id, mcq.clone());
        Ok(())
    }

    async fn find_mcq(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Mcq>> {
        let tables = self.tables.read().await;
        Ok(tables
            .mcqs
            .get(&id)
            .filter(|m| m.teacher_id == teacher_id && m.is_active)
            .cloned())
    }

    async fn list_mcqs_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> DbResult<Vec<Mcq>> {
        let tables = self.tables.read().await;
        let mut mcqs: Vec<Mcq> = tables
            .mcqs
            .values()
            .filter(|m| m.teacher_id == teacher_id && m.standard_id == standard_id && m.is_active)
            .cloned()
            .collect();
        mcqs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mcqs)
    }

    async fn update_mcq(&self, mcq: &Mcq) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        match tables.mcqs.get_mut(&mcq.id) {
            Some(existing) => {
                // Statistics are only moved by submissions
                let statistics = existing.statistics;
                *existing = mcq.clone();
                existing.statistics = statistics;
                Ok(())
            }
            None => Err(DatabaseError::NotFound("MCQ not found".to_string())),
        }
    }

    async fn deactivate_mcq(&self, teacher_id: Uuid, id: Uuid) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.mcqs.get_mut(&id) {
            Some(m) if m.teacher_id == teacher_id && m.is_active => {
                m.is_active = false;
                m.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn find_submission_for(&self, student_id: Uuid, mcq_id: Uuid) -> DbResult<Option<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .values()
            .find(|s| s.student_id == student_id && s.mcq_id == mcq_id && s.is_active)
            .cloned())
    }

    async fn record_submission(&self, submission: &Submission) -> DbResult<McqStatistics> {
        let mut tables = self.tables.write().await;
        if tables
            .submissions
            .values()
            .any(|s| s.student_id == submission.student_id && s.mcq_id == submission.mcq_id)
        {
            return Err(violation("mcq_submissions_student_mcq_key"));
        }

        let mcq = tables
            .mcqs
            .get_mut(&submission.mcq_id)
            .ok_or_else(|| DatabaseError::NotFound("MCQ not found".to_string()))?;
        mcq.statistics.record(submission.score);
        let statistics = mcq.statistics;

        tables.submissions.insert(submission.id, submission.clone());
        Ok(statistics)
    }

    async fn find_submission(&self, teacher_id: Uuid, id: Uuid) -> DbResult<Option<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .get(&id)
            .filter(|s| s.teacher_id == teacher_id && s.is_active)
            .cloned())
    }

    async fn list_submissions_for_student(&self, teacher_id: Uuid, student_id: Uuid) -> DbResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut submissions: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.teacher_id == teacher_id && s.student_id == student_id && s.is_active)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(submissions)
    }

    async fn list_submissions_for_mcq(&self, teacher_id: Uuid, mcq_id: Uuid) -> DbResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut submissions: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.teacher_id == teacher_id && s.mcq_id == mcq_id && s.is_active)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.completed_at.cmp(&b.completed_at)));
        Ok(submissions)
    }
}

#[async_trait]
impl AppVersionRepository for MemoryStore {
    async fn load_app_version(&self) -> DbResult<Option<AppVersionConfig>> {
        Ok(self.tables.read().await.app_version.clone())
    }

    async fn save_app_version(&self, config: &AppVersionConfig) -> DbResult<()> {
        self.tables.write().await.app_version = Some(config.clone());
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> DbResult<()> {
        let _ = self.tables.read().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(teacher: Uuid, division: Uuid, roll: &str) -> Student {
        let mut s = Student::new(teacher, Uuid::new_v4(), division, format!("Student {}", roll));
        s.roll_number = Some(roll.to_string());
        s
    }

    #[tokio::test]
    async fn standard_reactivation_keeps_id() {
        let store = MemoryStore::new();
        let teacher = Uuid::new_v4();
        let standard = Standard::new(teacher, "6th Standard".into(), None, vec![]);

        let created = match store.find_active_or_reactivate_standard(&standard).await.unwrap() {
            Upserted::Created(s) => s,
            other => panic!("expected create, got {:?}", other),
        };
        assert!(matches!(
            store.find_active_or_reactivate_standard(&standard).await.unwrap(),
            Upserted::ActiveExists
        ));

        store.deactivate_standard(teacher, created.id).await.unwrap();
        let again = Standard::new(teacher, "6th Standard".into(), Some("again".into()), vec![]);
        match store.find_active_or_reactivate_standard(&again).await.unwrap() {
            Upserted::Reactivated(s) => {
                assert_eq!(s.id, created.id);
                assert_eq!(s.description.as_deref(), Some("again"));
            }
            other => panic!("expected reactivation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn roll_number_unique_per_division_only() {
        let store = MemoryStore::new();
        let teacher = Uuid::new_v4();
        let (div_a, div_b) = (Uuid::new_v4(), Uuid::new_v4());

        store.insert_or_reactivate_student(&student(teacher, div_a, "1")).await.unwrap();
        store.insert_or_reactivate_student(&student(teacher, div_b, "1")).await.unwrap();

        let err = store.insert_or_reactivate_student(&student(teacher, div_a, "1")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(ref c) if c.contains("roll_number")));
    }

    #[tokio::test]
    async fn submission_records_statistics_once() {
        let store = MemoryStore::new();
        let teacher = Uuid::new_v4();
        let now = Utc::now();
        let mcq = Mcq {
            id: Uuid::new_v4(),
            title: "Plants".into(),
            description: None,
            standard_id: Uuid::new_v4(),
            teacher_id: teacher,
            questions: vec![],
            settings: Default::default(),
            metadata: Default::default(),
            statistics: Default::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.insert_mcq(&mcq).await.unwrap();

        let submission = Submission {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            mcq_id: mcq.id,
            teacher_id: teacher,
            standard_id: mcq.standard_id,
            answers: vec![],
            score: 75,
            total_questions: 4,
            correct_answers: 3,
            incorrect_answers: 1,
            time_taken: 90,
            started_at: None,
            completed_at: now,
            is_active: true,
            created_at: now,
        };
        let stats = store.record_submission(&submission).await.unwrap();
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.average_score, 75);

        let retry = Submission { id: Uuid::new_v4(), ..submission };
        assert!(matches!(
            store.record_submission(&retry).await.unwrap_err(),
            DatabaseError::UniqueViolation(_)
        ));
        assert_eq!(store.find_mcq(teacher, mcq.id).await.unwrap().unwrap().statistics.total_attempts, 1);
    }
}
