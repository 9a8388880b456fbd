use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::ai::{AiError, GenerationRequest, GeneratorStatus};
use crate::app::AppState;
use crate::database::models::mcq::normalize_questions;
use crate::database::models::{Mcq, McqMetadata, McqSettings, McqStatistics, Question};
use crate::error::ApiError;
use crate::storage::{is_image_mime, FileUpload};

use super::clean_optional;

pub const DEFAULT_QUESTION_COUNT: u32 = 5;
pub const MAX_QUESTION_COUNT: u32 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorReport {
    pub configured: bool,
    pub status: &'static str,
    pub message: &'static str,
}

/// Multipart fields sent with the page image
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub question_count: Option<u32>,
    pub book_language: Option<String>,
    pub question_language: Option<String>,
    pub standard_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMcq {
    pub questions: Vec<Question>,
    pub metadata: McqMetadata,
    pub standard_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveMcqRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub standard_id: Uuid,
    pub questions: Vec<Question>,
    pub settings: Option<McqSettings>,
    pub metadata: Option<McqMetadata>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMcqRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub settings: Option<McqSettings>,
}

fn check_questions(questions: Vec<Question>) -> Result<Vec<Question>, ApiError> {
    normalize_questions(questions).map_err(|msg| ApiError::invalid_field("questions", msg))
}

fn check_settings(settings: McqSettings) -> Result<McqSettings, ApiError> {
    if !(1..=180).contains(&settings.time_limit) {
        return Err(ApiError::invalid_field(
            "settings.timeLimit",
            "Time limit must be between 1 and 180 minutes",
        ));
    }
    Ok(settings)
}

fn language(value: Option<String>) -> String {
    clean_optional(value).unwrap_or_else(|| "English".to_string())
}

pub struct McqService<'a> {
    state: &'a AppState,
}

impl<'a> McqService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn status(&self) -> GeneratorReport {
        let status = self.state.generator.status().await;
        let message = match status {
            GeneratorStatus::Available => "AI service is available",
            GeneratorStatus::Overloaded => "AI service is temporarily overloaded",
            GeneratorStatus::Error => "AI service returned an error",
            GeneratorStatus::NotConfigured => "AI service is not configured",
        };
        GeneratorReport {
            configured: self.state.generator.is_configured(),
            status: status.as_str(),
            message,
        }
    }

    async fn require_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> Result<(), ApiError> {
        match self.state.store.find_standard(teacher_id, standard_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("Standard not found")),
        }
    }

    /// Ask the generator for questions about a photographed page
    pub async fn generate(&self, teacher_id: Uuid, image: FileUpload, options: GenerateOptions) -> Result<GeneratedMcq, ApiError> {
        if !self.state.generator.is_configured() {
            return Err(AiError::NotConfigured.into());
        }
        if !is_image_mime(&image.content_type) {
            return Err(ApiError::bad_request("Only image files are allowed"));
        }
        let max_bytes = self.state.config.api.max_mcq_image_bytes;
        if image.size() > max_bytes {
            return Err(ApiError::payload_too_large(format!(
                "Image must be smaller than {} MB",
                max_bytes / (1024 * 1024)
            )));
        }
        let question_count = options.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
        if !(1..=MAX_QUESTION_COUNT).contains(&question_count) {
            return Err(ApiError::invalid_field(
                "questionCount",
                format!("Question count must be between 1 and {}", MAX_QUESTION_COUNT),
            ));
        }
        if let Some(standard_id) = options.standard_id {
            self.require_standard(teacher_id, standard_id).await?;
        }

        let request = GenerationRequest {
            image: image.bytes,
            mime_type: image.content_type,
            question_count,
            book_language: language(options.book_language),
            question_language: language(options.question_language),
        };
        let questions = self.state.generator.generate(&request).await?;
        info!(
            "Generated {} of {} requested questions for teacher {}",
            questions.len(),
            question_count,
            teacher_id
        );

        Ok(GeneratedMcq {
            questions,
            metadata: McqMetadata {
                book_language: request.book_language,
                question_language: request.question_language,
                source_image: Some(image.file_name),
                generated_at: Some(Utc::now()),
            },
            standard_id: options.standard_id,
        })
    }

    pub async fn save(&self, teacher_id: Uuid, request: SaveMcqRequest) -> Result<Mcq, ApiError> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::invalid_field("title", "Title is required"));
        }
        self.require_standard(teacher_id, request.standard_id).await?;

        let now = Utc::now();
        let mcq = Mcq {
            id: Uuid::new_v4(),
            title,
            description: clean_optional(request.description),
            standard_id: request.standard_id,
            teacher_id,
            questions: check_questions(request.questions)?,
            settings: check_settings(request.settings.unwrap_or_default())?,
            metadata: request.metadata.unwrap_or_default(),
            statistics: McqStatistics::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.store.insert_mcq(&mcq).await?;
        info!("Saved MCQ {} with {} questions", mcq.id, mcq.questions.len());
        Ok(mcq)
    }

    pub async fn list_by_standard(&self, teacher_id: Uuid, standard_id: Uuid) -> Result<Vec<Mcq>, ApiError> {
        self.require_standard(teacher_id, standard_id).await?;
        Ok(self.state.store.list_mcqs_by_standard(teacher_id, standard_id).await?)
    }

    pub async fn get(&self, teacher_id: Uuid, id: Uuid) -> Result<Mcq, ApiError> {
        self.state
            .store
            .find_mcq(teacher_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("MCQ not found"))
    }

    pub async fn update(&self, teacher_id: Uuid, id: Uuid, request: UpdateMcqRequest) -> Result<Mcq, ApiError> {
        let mut mcq = self.get(teacher_id, id).await?;

        if let Some(title) = request.title.map(|t| t.trim().to_string()) {
            if title.is_empty() {
                return Err(ApiError::invalid_field("title", "Title is required"));
            }
            mcq.title = title;
        }
        if request.description.is_some() {
            mcq.description = clean_optional(request.description);
        }
        if let Some(questions) = request.questions {
            mcq.questions = check_questions(questions)?;
        }
        if let Some(settings) = request.settings {
            mcq.settings = check_settings(settings)?;
        }
        mcq.updated_at = Utc::now();

        self.state.store.update_mcq(&mcq).await?;
        Ok(mcq)
    }

    pub async fn delete(&self, teacher_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.state.store.deactivate_mcq(teacher_id, id).await? {
            return Err(ApiError::not_found("MCQ not found"));
        }
        info!("Deactivated MCQ {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{image_file, pdf_file, question, TestContext};

    fn save_request(standard_id: Uuid, questions: Vec<Question>) -> SaveMcqRequest {
        SaveMcqRequest {
            title: "Plants".into(),
            description: None,
            standard_id,
            questions,
            settings: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn generate_passes_options_to_generator() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        ctx.generator.push(Ok(vec![question("Q1", 0), question("Q2", 1)]));

        let generated = McqService::new(&ctx.state)
            .generate(
                teacher.id,
                image_file("page.png"),
                GenerateOptions {
                    question_count: Some(2),
                    book_language: Some("Marathi".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(generated.questions.len(), 2);
        assert_eq!(generated.metadata.book_language, "Marathi");
        assert_eq!(generated.metadata.question_language, "English");
        assert_eq!(generated.metadata.source_image.as_deref(), Some("page.png"));

        let requests = ctx.generator.requests.lock().unwrap();
        assert_eq!(requests[0].question_count, 2);
        assert_eq!(requests[0].mime_type, "image/png");
    }

    #[tokio::test]
    async fn generate_rejects_bad_input() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let service = McqService::new(&ctx.state);

        let err = service
            .generate(teacher.id, pdf_file("page.pdf"), GenerateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let options = GenerateOptions {
            question_count: Some(21),
            ..Default::default()
        };
        let err = service.generate(teacher.id, image_file("page.png"), options).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let mut big = image_file("big.png");
        big.bytes = vec![0; ctx.state.config.api.max_mcq_image_bytes + 1];
        let err = service.generate(teacher.id, big, GenerateOptions::default()).await.unwrap_err();
        assert_eq!(err.status_code(), 413);

        assert!(ctx.generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhausted_generator_is_retryable() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;

        let err = McqService::new(&ctx.state)
            .generate(teacher.id, image_file("page.png"), GenerateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        let body = err.to_json();
        assert_eq!(body["retryable"], true);
        assert_eq!(body["suggestedRetryDelay"], 60000);
    }

    #[tokio::test]
    async fn save_validates_questions_and_standard() {
        let ctx = TestContext::new();
        let teacher = ctx.teacher().await;
        let standard = ctx.standard(&teacher, "6th Standard").await;
        let service = McqService::new(&ctx.state);

        let mut bad = question("Q1", 0);
        bad.options.pop();
        let err = service.save(teacher.id, save_request(standard.id, vec![bad])).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let other = ctx.teacher().await;
        let err = service
            .save(other.id, save_request(standard.id, vec![question("Q1", 0)]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let mcq = service
            .save(teacher.id, save_request(standard.id, vec![question("Q1", 0)]))
            .await
            .unwrap();
        assert_eq!(mcq.settings.time_limit, 30);
        assert_eq!(service.list_by_standard(teacher.id, standard.id).await.unwrap().len(), 1);

        let updated = service
            .update(
                teacher.id,
                mcq.id,
                UpdateMcqRequest {
                    title: Some("Plants and light".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Plants and light");

        service.delete(teacher.id, mcq.id).await.unwrap();
        assert!(service.list_by_standard(teacher.id, standard.id).await.unwrap().is_empty());
        assert_eq!(service.get(teacher.id, mcq.id).await.unwrap_err().status_code(), 404);
    }
}
