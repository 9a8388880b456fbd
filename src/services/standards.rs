use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::{division_full_name, Standard};
use crate::database::{CascadeCount, Upserted};
use crate::error::ApiError;

use super::clean_optional;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStandardRequest {
    #[validate(length(min = 1, max = 50, message = "Standard name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStandardRequest {
    #[validate(length(min = 1, max = 50, message = "Standard name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub subjects: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardDeleted {
    pub deactivated_divisions: u64,
    pub deactivated_students: u64,
}

impl From<CascadeCount> for StandardDeleted {
    fn from(count: CascadeCount) -> Self {
        Self {
            deactivated_divisions: count.divisions,
            deactivated_students: count.students,
        }
    }
}

fn clean_subjects(subjects: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(subjects.len());
    for subject in subjects.into_iter().map(|s| s.trim().to_string()) {
        if !subject.is_empty() && !cleaned.contains(&subject) {
            cleaned.push(subject);
        }
    }
    cleaned
}

fn duplicate_standard() -> ApiError {
    ApiError::duplicate("DUPLICATE_STANDARD", "A standard with this name already exists")
}

pub struct StandardService<'a> {
    state: &'a AppState,
}

impl<'a> StandardService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn list(&self, teacher_id: Uuid) -> Result<Vec<Standard>, ApiError> {
        Ok(self.state.store.list_standards(teacher_id).await?)
    }

    pub async fn get(&self, teacher_id: Uuid, id: Uuid) -> Result<Standard, ApiError> {
        self.state
            .store
            .find_standard(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Standard not found"))
    }

    /// Create a standard, or bring back a deleted one with the same name.
    /// The flag is true when an existing record was reactivated.
    pub async fn create(&self, teacher_id: Uuid, request: CreateStandardRequest) -> Result<(Standard, bool), ApiError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::invalid_field("name", "Standard name is required"));
        }

        let standard = Standard::new(
            teacher_id,
            name,
            clean_optional(request.description),
            clean_subjects(request.subjects),
        );

        match self.state.store.find_active_or_reactivate_standard(&standard).await? {
            Upserted::Created(standard) => {
                info!("Created standard {} for teacher {}", standard.id, teacher_id);
                Ok((standard, false))
            }
            Upserted::Reactivated(standard) => {
                info!("Reactivated standard {} for teacher {}", standard.id, teacher_id);
                Ok((standard, true))
            }
            Upserted::ActiveExists => Err(duplicate_standard()),
        }
    }

    pub async fn update(&self, teacher_id: Uuid, id: Uuid, request: UpdateStandardRequest) -> Result<Standard, ApiError> {
        let mut standard = self.get(teacher_id, id).await?;
        let mut renamed = false;

        if let Some(name) = request.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(ApiError::invalid_field("name", "Standard name is required"));
            }
            if name != standard.name {
                if let Some(other) = self.state.store.find_active_standard_by_name(teacher_id, &name).await? {
                    if other.id != id {
                        return Err(duplicate_standard());
                    }
                }
                standard.name = name;
                renamed = true;
            }
        }
        if request.description.is_some() {
            standard.description = clean_optional(request.description);
        }
        if let Some(subjects) = request.subjects {
            standard.subjects = clean_subjects(subjects);
        }
        standard.updated_at = Utc::now();
        self.state.store.update_standard(&standard).await?;

        if renamed {
            self.refresh_division_names(&standard).await?;
        }
        Ok(standard)
    }

    /// Division display names embed the standard name
    async fn refresh_division_names(&self, standard: &Standard) -> Result<(), ApiError> {
        let divisions = self
            .state
            .store
            .list_divisions_by_standard(standard.created_by, standard.id)
            .await?;
        for mut division in divisions {
            division.full_name = division_full_name(&standard.name, &division.name);
            division.updated_at = Utc::now();
            self.state.store.update_division(&division).await?;
        }
        Ok(())
    }

    pub async fn delete(&self, teacher_id: Uuid, id: Uuid) -> Result<StandardDeleted, ApiError> {
        let count = self
            .state
            .store
            .deactivate_standard(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Standard not found"))?;

        info!(
            "Deactivated standard {} with {} divisions and {} students",
            id, count.divisions, count.students
        );
        Ok(count.into())
    }
}
