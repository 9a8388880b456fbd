use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::app::AppState;
use crate::database::models::student::roll_number_value;
use crate::database::models::{Division, Page, Pagination, ParentContact, ProfilePicture, Standard, Student, StudentFilter};
use crate::database::Upserted;
use crate::error::{ApiError, FieldError};
use crate::storage::{is_image_mime, profile_picture_path, spawn_delete, FileUpload, ProfileOwner};

use super::clean_optional;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(length(min = 2, max = 50, message = "Student name must be between 2 and 50 characters"))]
    pub name: String,
    pub standard_id: Uuid,
    pub division_id: Uuid,
    #[validate(length(max = 20, message = "Roll number cannot exceed 20 characters"))]
    pub roll_number: Option<String>,
    #[validate(length(max = 50, message = "UID cannot exceed 50 characters"))]
    pub uid: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_contact: Option<ParentContact>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[validate(length(min = 2, max = 50, message = "Student name must be between 2 and 50 characters"))]
    pub name: Option<String>,
    /// Moving a student also moves it to the division's standard
    pub division_id: Option<Uuid>,
    #[validate(length(max = 20, message = "Roll number cannot exceed 20 characters"))]
    pub roll_number: Option<String>,
    #[validate(length(max = 50, message = "UID cannot exceed 50 characters"))]
    pub uid: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_contact: Option<ParentContact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStudentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub standard_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StudentList {
    pub students: Vec<Student>,
    pub pagination: Pagination,
}

/// Length rules for trimmed student fields, shared with bulk import
pub(crate) fn check_student_fields(name: &str, roll_number: Option<&str>, uid: Option<&str>) -> Result<(), FieldError> {
    if !(2..=50).contains(&name.chars().count()) {
        return Err(FieldError::new("name", "Student name must be between 2 and 50 characters"));
    }
    if roll_number.is_some_and(|r| r.chars().count() > 20) {
        return Err(FieldError::new("rollNumber", "Roll number cannot exceed 20 characters"));
    }
    if uid.is_some_and(|u| u.chars().count() > 50) {
        return Err(FieldError::new("uid", "UID cannot exceed 50 characters"));
    }
    Ok(())
}

/// Roll number after `max`, or `None` once the numeric range is used up
pub(crate) fn next_roll_number(max: u64) -> Option<u64> {
    max.checked_add(1)
}

/// Trim and check parent contact details entered by hand
fn clean_parent_contact(contact: Option<ParentContact>) -> Result<ParentContact, ApiError> {
    let contact = contact.unwrap_or_default();
    let phone = clean_optional(contact.phone);
    let email = clean_optional(contact.email).map(|e| e.to_lowercase());

    if let Some(phone) = &phone {
        if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::invalid_field(
                "parentContact.phone",
                "Parent phone must be a 10-digit number",
            ));
        }
    }
    if let Some(email) = &email {
        if !email.validate_email() {
            return Err(ApiError::invalid_field(
                "parentContact.email",
                "Please provide a valid parent email",
            ));
        }
    }
    Ok(ParentContact { phone, email })
}

fn duplicate_roll_number() -> ApiError {
    ApiError::duplicate("DUPLICATE_ROLL_NUMBER", "Roll number already exists in this division")
}

fn duplicate_uid() -> ApiError {
    ApiError::duplicate("DUPLICATE_UID", "UID already exists in this division")
}

pub struct StudentService<'a> {
    state: &'a AppState,
}

impl<'a> StudentService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Owned standard plus an owned division that belongs to it
    pub(crate) async fn resolve_scope(
        &self,
        teacher_id: Uuid,
        standard_id: Uuid,
        division_id: Uuid,
    ) -> Result<(Standard, Division), ApiError> {
        let standard = self
            .state
            .store
            .find_standard(teacher_id, standard_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Standard not found"))?;
        let division = self
            .state
            .store
            .find_division(teacher_id, division_id)
            .await?
            .filter(|d| d.standard_id == standard.id)
            .ok_or_else(|| ApiError::not_found("Division not found"))?;
        Ok((standard, division))
    }

    /// Highest numeric roll number among the division's active students
    pub(crate) async fn max_roll_number(&self, teacher_id: Uuid, division_id: Uuid) -> Result<u64, ApiError> {
        let rolls = self.state.store.active_roll_numbers(teacher_id, division_id).await?;
        Ok(rolls.iter().map(|r| roll_number_value(r)).max().unwrap_or(0))
    }

    async fn check_unique(&self, student: &Student, exclude: Option<Uuid>) -> Result<(), ApiError> {
        let store = &self.state.store;
        if let Some(roll) = student.roll_number.as_deref() {
            if store
                .find_active_student_by_roll_number(student.created_by, student.division_id, roll, exclude)
                .await?
                .is_some()
            {
                return Err(duplicate_roll_number());
            }
        }
        if let Some(uid) = student.uid.as_deref() {
            if store
                .find_active_student_by_uid(student.created_by, student.division_id, uid, exclude)
                .await?
                .is_some()
            {
                return Err(duplicate_uid());
            }
        }
        Ok(())
    }

    pub async fn list(&self, teacher_id: Uuid, query: ListStudentsQuery) -> Result<StudentList, ApiError> {
        let page = Page::new(query.page, query.limit);
        let filter = StudentFilter {
            standard_id: query.standard_id,
            division_id: query.division_id,
        };
        let (students, total) = self.state.store.list_students(teacher_id, filter, Some(page)).await?;
        Ok(StudentList {
            students,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn list_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> Result<Vec<Student>, ApiError> {
        if self.state.store.find_standard(teacher_id, standard_id).await?.is_none() {
            return Err(ApiError::forbidden("Access denied"));
        }
        let filter = StudentFilter {
            standard_id: Some(standard_id),
            division_id: None,
        };
        Ok(self.state.store.list_students(teacher_id, filter, None).await?.0)
    }

    pub async fn list_by_division(&self, teacher_id: Uuid, division_id: Uuid) -> Result<Vec<Student>, ApiError> {
        if self.state.store.find_division(teacher_id, division_id).await?.is_none() {
            return Err(ApiError::forbidden("Access denied"));
        }
        let filter = StudentFilter {
            standard_id: None,
            division_id: Some(division_id),
        };
        Ok(self.state.store.list_students(teacher_id, filter, None).await?.0)
    }

    pub async fn get(&self, teacher_id: Uuid, id: Uuid) -> Result<Student, ApiError> {
        self.state
            .store
            .find_student(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))
    }

    /// Create a student, reviving an inactive one with the same roll number
    /// or UID. The flag is true when a record was reactivated.
    pub async fn create(&self, teacher_id: Uuid, request: CreateStudentRequest) -> Result<(Student, bool), ApiError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::invalid_field("name", "Student name is required"));
        }
        let (standard, division) = self.resolve_scope(teacher_id, request.standard_id, request.division_id).await?;

        let mut student = Student::new(teacher_id, standard.id, division.id, name);
        student.uid = clean_optional(request.uid);
        student.date_of_birth = request.date_of_birth;
        student.parent_contact = clean_parent_contact(request.parent_contact)?;
        student.roll_number = match clean_optional(request.roll_number) {
            Some(roll) => Some(roll),
            None => {
                let max = self.max_roll_number(teacher_id, division.id).await?;
                let next = next_roll_number(max).ok_or_else(|| {
                    ApiError::invalid_field("rollNumber", "No roll number left to assign, please provide one")
                })?;
                Some(next.to_string())
            }
        };
        check_student_fields(&student.name, student.roll_number.as_deref(), student.uid.as_deref())
            .map_err(|e| ApiError::invalid_field(&e.field, e.message))?;

        self.check_unique(&student, None).await?;

        match self.state.store.insert_or_reactivate_student(&student).await? {
            Upserted::Created(student) => {
                info!("Created student {} in division {}", student.id, division.full_name);
                Ok((student, false))
            }
            Upserted::Reactivated(student) => {
                info!("Reactivated student {} in division {}", student.id, division.full_name);
                Ok((student, true))
            }
            Upserted::ActiveExists => Err(duplicate_roll_number()),
        }
    }

    pub async fn update(&self, teacher_id: Uuid, id: Uuid, request: UpdateStudentRequest) -> Result<Student, ApiError> {
        let mut student = self.get(teacher_id, id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::invalid_field("name", "Student name is required"));
            }
            student.name = name;
        }
        if let Some(division_id) = request.division_id {
            let division = self
                .state
                .store
                .find_division(teacher_id, division_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Division not found"))?;
            student.division_id = division.id;
            student.standard_id = division.standard_id;
        }
        if request.roll_number.is_some() {
            student.roll_number = clean_optional(request.roll_number);
        }
        if request.uid.is_some() {
            student.uid = clean_optional(request.uid);
        }
        if request.date_of_birth.is_some() {
            student.date_of_birth = request.date_of_birth;
        }
        if request.parent_contact.is_some() {
            student.parent_contact = clean_parent_contact(request.parent_contact)?;
        }

        check_student_fields(&student.name, student.roll_number.as_deref(), student.uid.as_deref())
            .map_err(|e| ApiError::invalid_field(&e.field, e.message))?;
        self.check_unique(&student, Some(student.id)).await?;
        student.updated_at = Utc::now();
        self.state.store.update_student(&student).await?;
        Ok(student)
    }

    pub async fn delete(&self, teacher_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.state.store.deactivate_student(teacher_id, id).await? {
            return Err(ApiError::not_found("Student not found"));
        }
        info!("Deactivated student {}", id);
        Ok(())
    }

    pub async fn upload_profile_picture(&self, teacher_id: Uuid, id: Uuid, file: FileUpload) -> Result<Student, ApiError> {
        if !is_image_mime(&file.content_type) {
            return Err(ApiError::bad_request("Only image files are allowed for profile pictures"));
        }
        let mut student = self.get(teacher_id, id).await?;

        let path = profile_picture_path(ProfileOwner::Student, student.id, &file.file_name);
        let stored = self.state.objects.put(&path, file.bytes, &file.content_type).await?;
        let previous = student.profile_picture.replace(ProfilePicture {
            url: stored.url,
            public_id: stored.path,
        });
        student.updated_at = Utc::now();
        self.state.store.update_student(&student).await?;

        if let Some(previous) = previous.filter(|p| !p.public_id.is_empty()) {
            spawn_delete(self.state.objects.clone(), previous.public_id);
        }
        Ok(student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{image_file, pdf_file, TestContext};

    #[tokio::test]
    async fn roll_numbers_are_unique_per_division() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        let b = ctx.division(&teacher, &standard, "B").await;
        ctx.student(&teacher, &a, "Ravi", Some("1")).await;

        let service = StudentService::new(&ctx.state);
        let err = service
            .create(
                teacher.id,
                CreateStudentRequest {
                    name: "Meera".into(),
                    standard_id: standard.id,
                    division_id: a.division.id,
                    roll_number: Some("1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_ROLL_NUMBER");

        let other = ctx.student(&teacher, &b, "Meera", Some("1")).await;
        assert_eq!(other.roll_number.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn missing_roll_number_takes_next_value() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        ctx.student(&teacher, &a, "Ravi", Some("7")).await;
        ctx.student(&teacher, &a, "Kiran", Some("3B")).await;

        let next = ctx.student(&teacher, &a, "Meera", None).await;
        assert_eq!(next.roll_number.as_deref(), Some("8"));
        let after = ctx.student(&teacher, &a, "Asha", None).await;
        assert_eq!(after.roll_number.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn exhausted_roll_numbers_are_a_validation_error() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        ctx.student(&teacher, &a, "Ravi", Some(&u64::MAX.to_string())).await;

        let request = CreateStudentRequest {
            name: "Meera".into(),
            standard_id: standard.id,
            division_id: a.division.id,
            ..Default::default()
        };
        let err = StudentService::new(&ctx.state).create(teacher.id, request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        // An explicit roll number still works
        let kiran = ctx.student(&teacher, &a, "Kiran", Some("2")).await;
        assert_eq!(kiran.roll_number.as_deref(), Some("2"));
    }

    #[test]
    fn field_lengths_follow_trimmed_values() {
        assert!(check_student_fields("Ravi", Some("12"), Some("U-1")).is_ok());
        assert_eq!(check_student_fields("R", None, None).unwrap_err().field, "name");
        assert_eq!(check_student_fields(&"R".repeat(51), None, None).unwrap_err().field, "name");
        assert_eq!(check_student_fields("Ravi", Some(&"1".repeat(21)), None).unwrap_err().field, "rollNumber");
        assert_eq!(check_student_fields("Ravi", None, Some(&"U".repeat(51))).unwrap_err().field, "uid");
        assert_eq!(next_roll_number(u64::MAX), None);
        assert_eq!(next_roll_number(41), Some(42));
    }

    #[tokio::test]
    async fn uid_clash_and_contact_checks() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        let service = StudentService::new(&ctx.state);

        let base = || CreateStudentRequest {
            name: "Ravi".into(),
            standard_id: standard.id,
            division_id: a.division.id,
            uid: Some("U-1".into()),
            ..Default::default()
        };
        service.create(teacher.id, base()).await.unwrap();
        let err = service.create(teacher.id, base()).await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_UID");

        let err = service
            .create(
                teacher.id,
                CreateStudentRequest {
                    uid: None,
                    parent_contact: Some(ParentContact {
                        phone: Some("12345".into()),
                        email: None,
                    }),
                    ..base()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = service
            .create(
                teacher.id,
                CreateStudentRequest {
                    uid: None,
                    parent_contact: Some(ParentContact {
                        phone: Some("9876543210".into()),
                        email: Some("not-an-email".into()),
                    }),
                    ..base()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn scope_must_be_owned_and_consistent() {
        let ctx = TestContext::new();
        let owner = ctx.teacher().await;
        let other = ctx.teacher().await;
        let sixth = ctx.standard(&owner, "6th Standard").await;
        let seventh = ctx.standard(&owner, "7th Standard").await;
        let a = ctx.division(&owner, &sixth, "A").await;
        let service = StudentService::new(&ctx.state);

        let request = |teacher_standard: Uuid| CreateStudentRequest {
            name: "Ravi".into(),
            standard_id: teacher_standard,
            division_id: a.division.id,
            ..Default::default()
        };
        assert_eq!(service.create(owner.id, request(seventh.id)).await.unwrap_err().status_code(), 404);
        assert_eq!(service.create(other.id, request(sixth.id)).await.unwrap_err().status_code(), 404);

        let err = service.list_by_division(other.id, a.division.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        let err = service.list_by_standard(other.id, sixth.id).await.unwrap_err();
        assert_eq!(err.message(), "Access denied");
    }

    #[tokio::test]
    async fn list_paginates_in_roll_order() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        for (name, roll) in [("C", "10"), ("A", "2"), ("B", "1")] {
            ctx.student(&teacher, &a, name, Some(roll)).await;
        }

        let list = StudentService::new(&ctx.state)
            .list(
                teacher.id,
                ListStudentsQuery {
                    page: Some(1),
                    limit: Some(2),
                    standard_id: None,
                    division_id: Some(a.division.id),
                },
            )
            .await
            .unwrap();
        let rolls: Vec<_> = list.students.iter().filter_map(|s| s.roll_number.as_deref()).collect();
        assert_eq!(rolls, vec!["1", "2"]);
        assert_eq!(list.pagination.total_items, 3);
        assert_eq!(list.pagination.total_pages, 2);
    }

    #[tokio::test]
    async fn deleted_student_is_reactivated_by_roll_number() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        let ravi = ctx.student(&teacher, &a, "Ravi", Some("4")).await;

        let service = StudentService::new(&ctx.state);
        service.delete(teacher.id, ravi.id).await.unwrap();
        assert_eq!(service.get(teacher.id, ravi.id).await.unwrap_err().status_code(), 404);

        let (back, reactivated) = service
            .create(
                teacher.id,
                CreateStudentRequest {
                    name: "Ravi Kumar".into(),
                    standard_id: standard.id,
                    division_id: a.division.id,
                    roll_number: Some("4".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(reactivated);
        assert_eq!(back.id, ravi.id);
        assert_eq!(back.name, "Ravi Kumar");
    }

    #[tokio::test]
    async fn update_rechecks_roll_number() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        ctx.student(&teacher, &a, "Ravi", Some("1")).await;
        let meera = ctx.student(&teacher, &a, "Meera", Some("2")).await;
        let service = StudentService::new(&ctx.state);

        let err = service
            .update(
                teacher.id,
                meera.id,
                UpdateStudentRequest {
                    roll_number: Some("1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_ROLL_NUMBER");

        // Keeping its own roll number is not a clash
        let same = service
            .update(
                teacher.id,
                meera.id,
                UpdateStudentRequest {
                    name: Some("Meera S".into()),
                    roll_number: Some("2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.name, "Meera S");
    }

    #[tokio::test]
    async fn profile_picture_requires_image() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let a = ctx.division(&teacher, &standard, "A").await;
        let ravi = ctx.student(&teacher, &a, "Ravi", None).await;
        let service = StudentService::new(&ctx.state);

        let updated = service
            .upload_profile_picture(teacher.id, ravi.id, image_file("ravi.png"))
            .await
            .unwrap();
        let picture = updated.profile_picture.unwrap();
        assert!(picture.public_id.starts_with(&format!("profiles/students/{}/", ravi.id)));
        assert!(ctx.objects.contains(&picture.public_id).await);

        let err = service
            .upload_profile_picture(teacher.id, ravi.id, pdf_file("ravi.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
