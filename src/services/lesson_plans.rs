use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::{LessonPlan, LessonPlanFilter, Material, MaterialType, UploadType};
use crate::error::ApiError;
use crate::storage::{lesson_material_path, spawn_delete, FileUpload};

use super::clean_optional;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonPlanRequest {
    #[validate(length(min = 1, max = 100, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, max = 200, message = "Topic is required"))]
    pub topic: String,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub standard_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: String,
    #[validate(range(min = 15, max = 300, message = "Duration must be between 15 and 300 minutes"))]
    pub duration: i32,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonPlanRequest {
    #[validate(length(min = 1, max = 100, message = "Subject cannot be empty"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Topic cannot be empty"))]
    pub topic: Option<String>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    #[validate(range(min = 15, max = 300, message = "Duration must be between 15 and 300 minutes"))]
    pub duration: Option<i32>,
    pub materials: Option<Vec<Material>>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanQuery {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub subject: Option<String>,
}

impl From<LessonPlanQuery> for LessonPlanFilter {
    fn from(query: LessonPlanQuery) -> Self {
        LessonPlanFilter {
            date: query.date,
            start_date: query.start_date,
            end_date: query.end_date,
            completed: query.completed,
            subject: clean_optional(query.subject),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMaterialRequest {
    pub material_index: Option<usize>,
    pub material_content: Option<String>,
}

/// 24-hour `HH:MM`
pub fn is_valid_start_time(value: &str) -> bool {
    match value.split_once(':') {
        Some((h, m)) if h.len() == 2 && m.len() == 2 => match (h.parse::<u32>(), m.parse::<u32>()) {
            (Ok(h), Ok(m)) => h < 24 && m < 60 && value.chars().filter(|c| c.is_ascii_digit()).count() == 4,
            _ => false,
        },
        _ => false,
    }
}

fn check_start_time(value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if !is_valid_start_time(value) {
        return Err(ApiError::invalid_field("startTime", "Start time must be in HH:MM format"));
    }
    Ok(value.to_string())
}

fn clean_materials(materials: Vec<Material>) -> Result<Vec<Material>, ApiError> {
    materials
        .into_iter()
        .map(|m| {
            let content = m.content.trim().to_string();
            if content.is_empty() {
                return Err(ApiError::invalid_field("materials", "Material content is required"));
            }
            Ok(Material {
                content,
                title: clean_optional(m.title),
                ..m
            })
        })
        .collect()
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub struct LessonPlanService<'a> {
    state: &'a AppState,
}

impl<'a> LessonPlanService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Drop the stored files behind file materials; links and text are left alone
    fn cleanup_materials<'m>(&self, materials: impl IntoIterator<Item = &'m Material>) {
        for material in materials.into_iter().filter(|m| m.material_type.is_stored_file()) {
            if let Some(path) = self.state.objects.path_from_url(&material.content) {
                spawn_delete(self.state.objects.clone(), path);
            }
        }
    }

    pub async fn list(&self, teacher_id: Uuid, query: LessonPlanQuery) -> Result<Vec<LessonPlan>, ApiError> {
        Ok(self.state.store.list_lesson_plans(teacher_id, &query.into()).await?)
    }

    pub async fn today(&self, teacher_id: Uuid) -> Result<Vec<LessonPlan>, ApiError> {
        let filter = LessonPlanFilter {
            date: Some(Utc::now().date_naive()),
            ..Default::default()
        };
        Ok(self.state.store.list_lesson_plans(teacher_id, &filter).await?)
    }

    pub async fn get(&self, teacher_id: Uuid, id: Uuid) -> Result<LessonPlan, ApiError> {
        self.state
            .store
            .find_lesson_plan(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Lesson plan not found"))
    }

    pub async fn create(&self, teacher_id: Uuid, request: CreateLessonPlanRequest) -> Result<LessonPlan, ApiError> {
        let subject = request.subject.trim().to_string();
        let topic = request.topic.trim().to_string();
        if subject.is_empty() {
            return Err(ApiError::invalid_field("subject", "Subject is required"));
        }
        if topic.is_empty() {
            return Err(ApiError::invalid_field("topic", "Topic is required"));
        }
        let start_time = check_start_time(&request.start_time)?;

        if let Some(standard_id) = request.standard_id {
            if self.state.store.find_standard(teacher_id, standard_id).await?.is_none() {
                return Err(ApiError::not_found("Standard not found"));
            }
        }

        let now = Utc::now();
        let plan = LessonPlan {
            id: Uuid::new_v4(),
            teacher_id,
            standard_id: request.standard_id,
            subject,
            topic,
            description: clean_optional(request.description),
            date: request.date,
            start_time,
            duration: request.duration,
            materials: clean_materials(request.materials)?,
            tags: clean_list(request.tags),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.state.store.insert_lesson_plan(&plan).await?;
        info!("Created lesson plan {} for {}", plan.id, plan.date);
        Ok(plan)
    }

    pub async fn update(&self, teacher_id: Uuid, id: Uuid, request: UpdateLessonPlanRequest) -> Result<LessonPlan, ApiError> {
        let mut plan = self.get(teacher_id, id).await?;
        let now = Utc::now();

        if let Some(subject) = request.subject.map(|s| s.trim().to_string()) {
            if subject.is_empty() {
                return Err(ApiError::invalid_field("subject", "Subject cannot be empty"));
            }
            plan.subject = subject;
        }
        if let Some(topic) = request.topic.map(|t| t.trim().to_string()) {
            if topic.is_empty() {
                return Err(ApiError::invalid_field("topic", "Topic cannot be empty"));
            }
            plan.topic = topic;
        }
        if request.description.is_some() {
            plan.description = clean_optional(request.description);
        }
        if let Some(date) = request.date {
            plan.date = date;
        }
        if let Some(start_time) = request.start_time {
            plan.start_time = check_start_time(&start_time)?;
        }
        if let Some(duration) = request.duration {
            plan.duration = duration;
        }
        if let Some(tags) = request.tags {
            plan.tags = clean_list(tags);
        }
        if let Some(completed) = request.completed {
            plan.set_completed(completed, now);
        }

        let mut dropped = Vec::new();
        if let Some(materials) = request.materials {
            let materials = clean_materials(materials)?;
            dropped = plan
                .materials
                .iter()
                .filter(|old| !materials.iter().any(|m| m.content == old.content))
                .cloned()
                .collect();
            plan.materials = materials;
        }

        plan.updated_at = now;
        self.state.store.update_lesson_plan(&plan).await?;
        self.cleanup_materials(&dropped);
        Ok(plan)
    }

    pub async fn delete(&self, teacher_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let plan = self.get(teacher_id, id).await?;
        if !self.state.store.delete_lesson_plan(teacher_id, id).await? {
            return Err(ApiError::not_found("Lesson plan not found"));
        }
        self.cleanup_materials(&plan.materials);
        info!("Deleted lesson plan {}", id);
        Ok(())
    }

    pub async fn toggle_completion(&self, teacher_id: Uuid, id: Uuid) -> Result<LessonPlan, ApiError> {
        let mut plan = self.get(teacher_id, id).await?;
        let now = Utc::now();
        plan.set_completed(!plan.completed, now);
        plan.updated_at = now;
        self.state.store.update_lesson_plan(&plan).await?;
        Ok(plan)
    }

    /// Remove one material, picked by position or by its content
    pub async fn remove_material(&self, teacher_id: Uuid, id: Uuid, request: RemoveMaterialRequest) -> Result<LessonPlan, ApiError> {
        let mut plan = self.get(teacher_id, id).await?;

        let index = match (request.material_index, request.material_content.as_deref()) {
            (Some(index), _) => {
                if index >= plan.materials.len() {
                    return Err(ApiError::bad_request("Invalid material index"));
                }
                index
            }
            (None, Some(content)) => plan
                .materials
                .iter()
                .position(|m| m.content == content.trim())
                .ok_or_else(|| ApiError::not_found("Material not found"))?,
            (None, None) => return Err(ApiError::bad_request("Material index or content is required")),
        };

        let removed = plan.materials.remove(index);
        plan.updated_at = Utc::now();
        self.state.store.update_lesson_plan(&plan).await?;
        self.cleanup_materials([&removed]);
        Ok(plan)
    }

    /// Store a file and hand back the material entry that points at it
    pub async fn upload_material(&self, file: FileUpload) -> Result<Material, ApiError> {
        let material_type = match UploadType::from_mime(&file.content_type) {
            UploadType::Image => MaterialType::Photo,
            UploadType::Video => MaterialType::Video,
            UploadType::Document => MaterialType::Document,
        };
        let path = lesson_material_path(&file.content_type, &file.file_name);
        let stored = self.state.objects.put(&path, file.bytes, &file.content_type).await?;

        Ok(Material {
            material_type,
            content: stored.url,
            title: Some(file.file_name),
        })
    }
}
