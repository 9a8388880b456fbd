use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MISSING_EXPLANATION: &str = "No explanation provided";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Checks the question has text, four options and an answer index in range.
    /// Fills in a placeholder explanation when none was given.
    pub fn normalize(mut self, index: usize) -> Result<Self, String> {
        let number = index + 1;
        self.question = self.question.trim().to_string();
        if self.question.is_empty() {
            return Err(format!("Question {} is missing its text", number));
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(format!("Question {} must have exactly {} options", number, OPTIONS_PER_QUESTION));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(format!("Question {} has an empty option", number));
        }
        if !(0..OPTIONS_PER_QUESTION as i64).contains(&self.correct_answer) {
            return Err(format!("Question {} has an invalid correct answer index", number));
        }
        if self.explanation.trim().is_empty() {
            self.explanation = MISSING_EXPLANATION.to_string();
        }
        Ok(self)
    }
}

/// Validate every question in order, stopping at the first malformed one.
pub fn normalize_questions(questions: Vec<Question>) -> Result<Vec<Question>, String> {
    if questions.is_empty() {
        return Err("At least one question is required".to_string());
    }
    questions.into_iter().enumerate().map(|(i, q)| q.normalize(i)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McqSettings {
    pub time_limit: i32,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_correct_answers: bool,
    pub allow_retake: bool,
}

impl Default for McqSettings {
    fn default() -> Self {
        Self {
            time_limit: 30,
            shuffle_questions: false,
            shuffle_options: false,
            show_correct_answers: true,
            allow_retake: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McqMetadata {
    pub book_language: String,
    pub question_language: String,
    pub source_image: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for McqMetadata {
    fn default() -> Self {
        Self {
            book_language: "English".to_string(),
            question_language: "English".to_string(),
            source_image: None,
            generated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqStatistics {
    pub total_attempts: i32,
    pub average_score: i32,
    pub highest_score: i32,
    pub lowest_score: i32,
}

impl McqStatistics {
    /// Fold one new score into the running aggregates without revisiting history.
    pub fn record(&mut self, score: i32) {
        self.total_attempts += 1;
        let n = self.total_attempts;
        if n == 1 {
            self.average_score = score;
            self.highest_score = score;
            self.lowest_score = score;
            return;
        }
        let total = self.average_score as f64 * (n - 1) as f64 + score as f64;
        self.average_score = (total / n as f64).round() as i32;
        self.highest_score = self.highest_score.max(score);
        self.lowest_score = self.lowest_score.min(score);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub standard_id: Uuid,
    pub teacher_id: Uuid,
    pub questions: Vec<Question>,
    pub settings: McqSettings,
    pub metadata: McqMetadata,
    pub statistics: McqStatistics,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_answer: i64) -> Question {
        Question {
            question: "What gas do plants absorb?".into(),
            options: vec!["Oxygen".into(), "Carbon dioxide".into(), "Nitrogen".into(), "Helium".into()],
            correct_answer,
            explanation: String::new(),
        }
    }

    #[test]
    fn statistics_running_average() {
        let mut stats = McqStatistics::default();
        for score in [80, 60, 100] {
            stats.record(score);
        }
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.average_score, 80);
        assert_eq!(stats.highest_score, 100);
        assert_eq!(stats.lowest_score, 60);
    }

    #[test]
    fn statistics_round_each_step() {
        let mut stats = McqStatistics::default();
        stats.record(33);
        stats.record(66);
        // (33 + 66) / 2 = 49.5 rounds up
        assert_eq!(stats.average_score, 50);
        stats.record(0);
        // (50 * 2 + 0) / 3 = 33.33
        assert_eq!(stats.average_score, 33);
        assert_eq!(stats.lowest_score, 0);
    }

    #[test]
    fn question_shape_is_enforced() {
        let q = question(1).normalize(0).unwrap();
        assert_eq!(q.explanation, MISSING_EXPLANATION);

        assert!(question(4).normalize(0).is_err());
        assert!(question(-1).normalize(0).is_err());

        let mut short = question(0);
        short.options.pop();
        let err = short.normalize(2).unwrap_err();
        assert!(err.contains("Question 3"));
    }

    #[test]
    fn empty_question_list_rejected() {
        assert!(normalize_questions(vec![]).is_err());
        assert_eq!(normalize_questions(vec![question(0), question(3)]).unwrap().len(), 2);
    }
}
