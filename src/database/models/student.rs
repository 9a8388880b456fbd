use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfilePicture;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentContact {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub standard_id: Uuid,
    pub division_id: Uuid,
    pub roll_number: Option<String>,
    pub uid: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_contact: ParentContact,
    pub profile_picture: Option<ProfilePicture>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn new(created_by: Uuid, standard_id: Uuid, division_id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            standard_id,
            division_id,
            roll_number: None,
            uid: None,
            date_of_birth: None,
            parent_contact: ParentContact::default(),
            profile_picture: None,
            created_by,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing filter; everything is additionally scoped to the teacher and active rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentFilter {
    pub standard_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
}

/// Numeric value of a roll number, read from its leading digits ("12A" -> 12).
/// Anything without leading digits counts as 0.
pub fn roll_number_value(roll_number: &str) -> u64 {
    let digits: String = roll_number.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Ordering used by student listings: numeric roll numbers first, then name.
pub fn compare_by_roll_number(a: &Student, b: &Student) -> std::cmp::Ordering {
    let key = |s: &Student| s.roll_number.as_deref().map(roll_number_value).unwrap_or(u64::MAX);
    key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
}
