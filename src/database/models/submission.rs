use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_index: usize,
    /// -1 when the question was skipped
    pub selected_answer: i64,
    pub is_correct: bool,
    #[serde(default)]
    pub time_spent: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mcq_id: Uuid,
    pub teacher_id: Uuid,
    pub standard_id: Uuid,
    pub answers: Vec<SubmittedAnswer>,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    /// Seconds
    pub time_taken: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn grade(&self) -> &'static str {
        grade_for(self.score)
    }

    pub fn formatted_time_taken(&self) -> String {
        format_duration(self.time_taken)
    }
}

/// Percentage of correct answers, rounded half up.
pub fn score_for(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as i32
}

pub fn grade_for(score: i32) -> &'static str {
    match score {
        s if s >= 90 => "A+",
        s if s >= 80 => "A",
        s if s >= 70 => "B+",
        s if s >= 60 => "B",
        s if s >= 50 => "C",
        s if s >= 40 => "D",
        _ => "F",
    }
}

pub fn format_duration(seconds: i32) -> String {
    let seconds = seconds.max(0);
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_follow_thresholds() {
        assert_eq!(grade_for(100), "A+");
        assert_eq!(grade_for(90), "A+");
        assert_eq!(grade_for(89), "A");
        assert_eq!(grade_for(70), "B+");
        assert_eq!(grade_for(60), "B");
        assert_eq!(grade_for(50), "C");
        assert_eq!(grade_for(40), "D");
        assert_eq!(grade_for(39), "F");
    }

    #[test]
    fn score_rounds() {
        assert_eq!(score_for(2, 3), 67);
        assert_eq!(score_for(1, 3), 33);
        assert_eq!(score_for(1, 8), 13);
        assert_eq!(score_for(0, 0), 0);
    }

    #[test]
    fn duration_formats_minutes_and_seconds() {
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(0), "0m 0s");
    }
}
