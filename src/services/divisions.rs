use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::division::normalize_division_name;
use crate::database::models::{division_full_name, Division, Standard};
use crate::database::Upserted;
use crate::error::ApiError;

use super::clean_optional;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDivisionRequest {
    #[validate(length(min = 1, max = 10, message = "Division name must be between 1 and 10 characters"))]
    pub name: String,
    pub standard_id: Uuid,
    #[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDivisionRequest {
    #[validate(length(min = 1, max = 10, message = "Division name must be between 1 and 10 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
    pub description: Option<String>,
}

/// A division as returned to clients, with its active head count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionView {
    #[serde(flatten)]
    pub division: Division,
    pub student_count: i64,
}

fn duplicate_division() -> ApiError {
    ApiError::duplicate("DUPLICATE_DIVISION", "Division already exists for this standard")
}

pub struct DivisionService<'a> {
    state: &'a AppState,
}

impl<'a> DivisionService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    async fn view(&self, division: Division) -> Result<DivisionView, ApiError> {
        let student_count = self.state.store.count_active_students(division.id).await?;
        Ok(DivisionView { division, student_count })
    }

    async fn owned_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> Result<Option<Standard>, ApiError> {
        Ok(self.state.store.find_standard(teacher_id, standard_id).await?)
    }

    /// Divisions of a standard; a standard the teacher does not own has none.
    pub async fn list_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> Result<Vec<DivisionView>, ApiError> {
        if self.owned_standard(teacher_id, standard_id).await?.is_none() {
            return Ok(Vec::new());
        }

        let divisions = self.state.store.list_divisions_by_standard(teacher_id, standard_id).await?;
        let mut views = Vec::with_capacity(divisions.len());
        for division in divisions {
            views.push(self.view(division).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, teacher_id: Uuid, id: Uuid) -> Result<DivisionView, ApiError> {
        let division = self
            .state
            .store
            .find_division(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Division not found"))?;
        self.view(division).await
    }

    pub async fn create(&self, teacher_id: Uuid, request: CreateDivisionRequest) -> Result<(DivisionView, bool), ApiError> {
        if request.name.trim().is_empty() {
            return Err(ApiError::invalid_field("name", "Division name is required"));
        }
        let standard = self
            .owned_standard(teacher_id, request.standard_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Standard not found"))?;

        let division = Division::new(
            teacher_id,
            standard.id,
            &standard.name,
            &request.name,
            clean_optional(request.description),
        );

        let (division, reactivated) = match self.state.store.find_active_or_reactivate_division(&division).await? {
            Upserted::Created(division) => (division, false),
            Upserted::Reactivated(division) => (division, true),
            Upserted::ActiveExists => return Err(duplicate_division()),
        };

        info!(
            "{} division {} ({}) for teacher {}",
            if reactivated { "Reactivated" } else { "Created" },
            division.id,
            division.full_name,
            teacher_id
        );
        Ok((self.view(division).await?, reactivated))
    }

    pub async fn update(&self, teacher_id: Uuid, id: Uuid, request: UpdateDivisionRequest) -> Result<DivisionView, ApiError> {
        let mut division = self
            .state
            .store
            .find_division(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Division not found"))?;

        if let Some(name) = request.name.as_deref().map(normalize_division_name) {
            if name.is_empty() {
                return Err(ApiError::invalid_field("name", "Division name is required"));
            }
            if name != division.name {
                if let Some(other) = self.state.store.find_active_division_by_name(division.standard_id, &name).await? {
                    if other.id != id {
                        return Err(duplicate_division());
                    }
                }
                let standard = self
                    .owned_standard(teacher_id, division.standard_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Standard not found"))?;
                division.full_name = division_full_name(&standard.name, &name);
                division.name = name;
            }
        }
        if request.description.is_some() {
            division.description = clean_optional(request.description);
        }
        division.updated_at = Utc::now();

        self.state.store.update_division(&division).await?;
        self.view(division).await
    }

    /// Returns the number of students switched off with the division
    pub async fn delete(&self, teacher_id: Uuid, id: Uuid) -> Result<u64, ApiError> {
        let students = self
            .state
            .store
            .deactivate_division(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Division not found"))?;

        info!("Deactivated division {} and {} students", id, students);
        Ok(students)
    }
}
