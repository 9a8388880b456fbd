//! Fixtures for service tests: in-memory backends, a scripted question
//! generator and a mailer that remembers what it sent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::ai::{AiError, GenerationRequest, GeneratorStatus, QuestionGenerator};
use crate::app::AppState;
use crate::config::AppConfig;
use crate::database::models::{Question, Standard, Student, Teacher};
use crate::database::MemoryStore;
use crate::email::{Email, MailError, Mailer};
use crate::services::divisions::{CreateDivisionRequest, DivisionService, DivisionView};
use crate::services::standards::{CreateStandardRequest, StandardService};
use crate::services::students::{CreateStudentRequest, StudentService};
use crate::storage::{FileUpload, MemoryObjectStore};

/// Hands out queued results in order; an empty queue means "overloaded"
#[derive(Default)]
pub struct ScriptedGenerator {
    results: Mutex<VecDeque<Result<Vec<Question>, AiError>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn push(&self, result: Result<Vec<Question>, AiError>) {
        self.results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::Unavailable("no scripted result".into())))
    }

    async fn status(&self) -> GeneratorStatus {
        GeneratorStatus::Available
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    /// The six-digit code in the most recent message
    pub fn last_otp(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let text = &sent.last()?.text;
        text.split(|c: char| !c.is_ascii_digit())
            .find(|word| word.len() == 6)
            .map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn delivers(&self) -> bool {
        true
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub objects: Arc<MemoryObjectStore>,
    pub generator: Arc<ScriptedGenerator>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    pub fn new() -> Self {
        let objects = Arc::new(MemoryObjectStore::new());
        let generator = Arc::new(ScriptedGenerator::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            AppConfig::for_tests(),
            Arc::new(MemoryStore::new()),
            objects.clone(),
            generator.clone(),
            mailer.clone(),
        );
        Self {
            state,
            objects,
            generator,
            mailer,
        }
    }

    /// A stored teacher with a unique email (password hash is not usable)
    pub async fn teacher(&self) -> Teacher {
        let email = format!("teacher-{}@school.in", Uuid::new_v4().simple());
        let teacher = Teacher::new("Test Teacher".into(), email, String::new());
        self.state.store.insert_teacher(&teacher).await.unwrap();
        teacher
    }

    pub async fn standard(&self, teacher: &Teacher, name: &str) -> Standard {
        let request = CreateStandardRequest {
            name: name.into(),
            description: None,
            subjects: vec![],
        };
        StandardService::new(&self.state).create(teacher.id, request).await.unwrap().0
    }

    pub async fn division(&self, teacher: &Teacher, standard: &Standard, name: &str) -> DivisionView {
        let request = CreateDivisionRequest {
            name: name.into(),
            standard_id: standard.id,
            description: None,
        };
        DivisionService::new(&self.state).create(teacher.id, request).await.unwrap().0
    }

    pub async fn student(&self, teacher: &Teacher, division: &DivisionView, name: &str, roll: Option<&str>) -> Student {
        let request = CreateStudentRequest {
            name: name.into(),
            standard_id: division.division.standard_id,
            division_id: division.division.id,
            roll_number: roll.map(str::to_string),
            ..Default::default()
        };
        StudentService::new(&self.state).create(teacher.id, request).await.unwrap().0
    }
}

pub fn image_file(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.into(),
        content_type: "image/png".into(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

pub fn pdf_file(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.into(),
        content_type: "application/pdf".into(),
        bytes: b"%PDF-1.4".to_vec(),
    }
}

/// A well-formed question whose answer is `correct`
pub fn question(text: &str, correct: i64) -> Question {
    Question {
        question: text.into(),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_answer: correct,
        explanation: "Because".into(),
    }
}
