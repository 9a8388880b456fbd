//! Bulk student import. Rows come from a spreadsheet the client has already
//! parsed, so every cell may arrive as text or as a number.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::app::AppState;
use crate::database::models::{ParentContact, Student};
use crate::database::{DatabaseError, Upserted};
use crate::error::ApiError;

use super::students::{check_student_fields, next_roll_number, StudentService};

/// One spreadsheet cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(Number),
}

impl Cell {
    /// Cell contents as trimmed text; whole floats lose their ".0"
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                _ => n.to_string(),
            },
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub name: Option<Cell>,
    pub roll_number: Option<Cell>,
    pub uid: Option<Cell>,
    pub date_of_birth: Option<Cell>,
    pub parent_phone: Option<Cell>,
    pub parent_email: Option<Cell>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportStudentsRequest {
    pub standard_id: Uuid,
    pub division_id: Uuid,
    #[serde(default)]
    #[validate(length(min = 1, message = "No students provided for import"))]
    pub students: Vec<ImportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportDuplicate {
    pub name: String,
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRowError {
    /// 1-based position in the submitted batch
    pub row: usize,
    pub name: Option<String>,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success_count: usize,
    pub reactivated_count: usize,
    pub duplicate_count: usize,
    pub error_count: usize,
    pub duplicates: Vec<ImportDuplicate>,
    pub errors: Vec<ImportRowError>,
    pub students: Vec<Student>,
}

/// Accepts DD/MM/YYYY, DD-MM-YYYY and ISO YYYY-MM-DD (a time suffix is ignored).
pub fn parse_date_of_birth(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let parts: Vec<&str> = value.split(['/', '-']).collect();

    if parts.len() == 3 && parts[0].len() <= 2 {
        let day: u32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let year: i32 = parts[2].parse().ok()?;
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) || year <= 1900 {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let iso = value.get(..10)?;
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()
}

/// Reduce a phone number to 10 digits, dropping a leading 1 or 91 country code.
pub fn clean_phone(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(digits),
        11 if digits.starts_with('1') => Some(digits[1..].to_string()),
        12 if digits.starts_with("91") => Some(digits[2..].to_string()),
        _ => None,
    }
}

fn cell(value: &Option<Cell>) -> Option<String> {
    value.as_ref().and_then(Cell::text)
}

/// Duplicate entry for a row whose insert lost a race on one of the unique indexes
fn raced_duplicate(name: String, constraint: Option<&str>, student: &Student) -> ImportDuplicate {
    match (constraint, student.uid.as_deref()) {
        (Some(c), Some(uid)) if c.contains("uid") => ImportDuplicate {
            name,
            field: "uid",
            value: uid.to_string(),
        },
        _ => ImportDuplicate {
            name,
            field: "rollNumber",
            value: student.roll_number.clone().unwrap_or_default(),
        },
    }
}

pub struct ImportService<'a> {
    state: &'a AppState,
}

impl<'a> ImportService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn import(&self, teacher_id: Uuid, request: ImportStudentsRequest) -> Result<ImportSummary, ApiError> {
        let students = StudentService::new(self.state);
        let (standard, division) = students
            .resolve_scope(teacher_id, request.standard_id, request.division_id)
            .await?;

        let mut next_roll = next_roll_number(students.max_roll_number(teacher_id, division.id).await?);
        let mut summary = ImportSummary::default();
        let store = &self.state.store;

        for (index, row) in request.students.into_iter().enumerate() {
            let row_number = index + 1;
            let Some(name) = cell(&row.name) else {
                summary.errors.push(ImportRowError {
                    row: row_number,
                    name: None,
                    message: "Student name is required".to_string(),
                });
                continue;
            };

            let parent_email = cell(&row.parent_email).map(|e| e.to_lowercase());
            if let Some(email) = &parent_email {
                if !email.validate_email() {
                    summary.errors.push(ImportRowError {
                        row: row_number,
                        name: Some(name),
                        message: format!("Invalid parent email: {}", email),
                    });
                    continue;
                }
            }

            let roll_number = cell(&row.roll_number);
            let uid = cell(&row.uid);
            if let Err(invalid) = check_student_fields(&name, roll_number.as_deref(), uid.as_deref()) {
                summary.errors.push(ImportRowError {
                    row: row_number,
                    name: Some(name),
                    message: invalid.message,
                });
                continue;
            }

            let mut student = Student::new(teacher_id, standard.id, division.id, name.clone());
            student.uid = uid;
            student.date_of_birth = cell(&row.date_of_birth).and_then(|d| parse_date_of_birth(&d));
            student.parent_contact = ParentContact {
                phone: cell(&row.parent_phone).and_then(|p| clean_phone(&p)),
                email: parent_email,
            };
            student.roll_number = match roll_number {
                Some(roll) => Some(roll),
                None => match next_roll {
                    Some(assigned) => {
                        next_roll = next_roll_number(assigned);
                        Some(assigned.to_string())
                    }
                    None => {
                        summary.errors.push(ImportRowError {
                            row: row_number,
                            name: Some(name),
                            message: "No roll number left to assign, please provide one".to_string(),
                        });
                        continue;
                    }
                },
            };

            let mut clashes = Vec::new();
            if let Some(roll) = student.roll_number.as_deref() {
                if store
                    .find_active_student_by_roll_number(teacher_id, division.id, roll, None)
                    .await?
                    .is_some()
                {
                    clashes.push(ImportDuplicate {
                        name: name.clone(),
                        field: "rollNumber",
                        value: roll.to_string(),
                    });
                }
            }
            if let Some(uid) = student.uid.as_deref() {
                if store.find_active_student_by_uid(teacher_id, division.id, uid, None).await?.is_some() {
                    clashes.push(ImportDuplicate {
                        name: name.clone(),
                        field: "uid",
                        value: uid.to_string(),
                    });
                }
            }
            if !clashes.is_empty() {
                summary.duplicate_count += 1;
                summary.duplicates.extend(clashes);
                continue;
            }

            match store.insert_or_reactivate_student(&student).await {
                Ok(Upserted::Created(created)) => summary.students.push(created),
                Ok(Upserted::Reactivated(revived)) => {
                    summary.reactivated_count += 1;
                    summary.students.push(revived);
                }
                // Another writer took the key between the check and the insert
                Ok(Upserted::ActiveExists) => {
                    summary.duplicate_count += 1;
                    summary.duplicates.push(raced_duplicate(name, None, &student));
                }
                Err(DatabaseError::UniqueViolation(constraint)) => {
                    summary.duplicate_count += 1;
                    summary.duplicates.push(raced_duplicate(name, Some(&constraint), &student));
                }
                Err(err) => {
                    warn!("Import row {} failed: {}", row_number, err);
                    summary.errors.push(ImportRowError {
                        row: row_number,
                        name: Some(name),
                        message: "Failed to save student".to_string(),
                    });
                }
            }
        }

        summary.success_count = summary.students.len();
        summary.error_count = summary.errors.len();
        info!(
            "Imported {} students into {} ({} reactivated, {} duplicates, {} errors)",
            summary.success_count,
            division.full_name,
            summary.reactivated_count,
            summary.duplicate_count,
            summary.error_count
        );
        Ok(summary)
    }
}
