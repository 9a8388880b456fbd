//! MCQ generation from a photographed book page.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::database::models::mcq::{normalize_questions, Question};

pub mod gemini;

pub use gemini::GeminiGenerator;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    NotConfigured,

    /// Overload or outage that outlasted the retry budget
    #[error("AI service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("AI service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl AiError {
    /// Overload and unavailability are worth another attempt; nothing else is.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Unavailable(_) => true,
            AiError::Upstream { status, message } => {
                matches!(status, 429 | 503) || mentions_overload(message)
            }
            AiError::Request(e) => e.is_timeout() || mentions_overload(&e.to_string()),
            _ => false,
        }
    }
}

fn mentions_overload(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["503", "overloaded", "service unavailable", "temporarily unavailable"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: Vec<u8>,
    pub mime_type: String,
    pub question_count: u32,
    pub book_language: String,
    pub question_language: String,
}

impl GenerationRequest {
    pub fn prompt(&self) -> String {
        format!(
            r#"Analyze this book page image and create {count} multiple choice questions (MCQs) based on the content.

Instructions:
- The book content is in {book} language
- Generate questions in {questions} language
- Create exactly {count} questions
- Each question should have 4 options (A, B, C, D)
- Include the correct answer index (0-3)
- Add a brief explanation for each correct answer
- Focus on key concepts, facts, and important information from the text
- Make questions challenging but fair for students
- Ensure questions test understanding, not just memorization

Return the response in this exact JSON format:
{{
  "questions": [
    {{
      "question": "Question text here?",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "explanation": "Brief explanation of why this answer is correct"
    }}
  ]
}}

Important: Return only valid JSON, no additional text or markdown formatting."#,
            count = self.question_count,
            book = self.book_language,
            questions = self.question_language,
        )
    }
}

/// Reachability of the generator as reported by `/api/mcq/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
    Available,
    Overloaded,
    Error,
    NotConfigured,
}

impl GeneratorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorStatus::Available => "available",
            GeneratorStatus::Overloaded => "overloaded",
            GeneratorStatus::Error => "error",
            GeneratorStatus::NotConfigured => "not_configured",
        }
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Generate and validate questions; retries are the implementation's concern
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, AiError>;

    async fn status(&self) -> GeneratorStatus;
}

/// Stands in when no API key is configured
pub struct UnconfiguredGenerator;

#[async_trait]
impl QuestionGenerator for UnconfiguredGenerator {
    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<Question>, AiError> {
        Err(AiError::NotConfigured)
    }

    async fn status(&self) -> GeneratorStatus {
        GeneratorStatus::NotConfigured
    }
}

#[derive(Deserialize)]
struct GeneratedQuestions {
    questions: Vec<Question>,
}

/// Strip a surrounding markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's text answer into validated questions
pub fn parse_questions(text: &str) -> Result<Vec<Question>, AiError> {
    let body = strip_code_fence(text);
    let generated: GeneratedQuestions =
        serde_json::from_str(body).map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    normalize_questions(generated.questions).map_err(AiError::InvalidResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = r#"{"questions":[{"question":"Which gas do plants absorb?","options":["O2","CO2","N2","He"],"correctAnswer":1}]}"#;

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{}\n```", ANSWER);
        let questions = parse_questions(&fenced).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(questions[0].explanation, "No explanation provided");

        assert_eq!(parse_questions(ANSWER).unwrap().len(), 1);
    }

    #[test]
    fn malformed_answers_are_invalid() {
        assert!(matches!(parse_questions("Sure! Here are your questions"), Err(AiError::InvalidResponse(_))));

        let three_options = r#"{"questions":[{"question":"Q?","options":["a","b","c"],"correctAnswer":0}]}"#;
        assert!(matches!(parse_questions(three_options), Err(AiError::InvalidResponse(_))));

        let bad_index = r#"{"questions":[{"question":"Q?","options":["a","b","c","d"],"correctAnswer":4}]}"#;
        assert!(matches!(parse_questions(bad_index), Err(AiError::InvalidResponse(_))));
    }

    #[test]
    fn retryable_classification() {
        let overloaded = AiError::Upstream { status: 503, message: String::new() };
        assert!(overloaded.is_retryable());

        let busy = AiError::Upstream { status: 500, message: "The model is overloaded".into() };
        assert!(busy.is_retryable());

        let bad = AiError::Upstream { status: 400, message: "API key not valid".into() };
        assert!(!bad.is_retryable());
        assert!(!AiError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn prompt_mentions_languages_and_count() {
        let request = GenerationRequest {
            image: vec![],
            mime_type: "image/png".into(),
            question_count: 7,
            book_language: "Marathi".into(),
            question_language: "English".into(),
        };
        let prompt = request.prompt();
        assert!(prompt.contains("create 7 multiple choice"));
        assert!(prompt.contains("in Marathi language"));
        assert!(prompt.contains("\"correctAnswer\": 0"));
    }
}
