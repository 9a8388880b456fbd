use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Photo,
    Video,
    Text,
    Link,
    Document,
}

impl MaterialType {
    /// Whether `content` points at a file this service stored.
    pub fn is_stored_file(&self) -> bool {
        matches!(self, MaterialType::Photo | MaterialType::Video | MaterialType::Document)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub standard_id: Option<Uuid>,
    pub subject: String,
    pub topic: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration: i32,
    pub materials: Vec<Material>,
    pub tags: Vec<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LessonPlan {
    /// Keeps `completed_at` in step with `completed`.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed && !self.completed {
            self.completed_at = Some(now);
        } else if !completed {
            self.completed_at = None;
        }
        self.completed = completed;
    }
}

#[derive(Debug, Clone, Default)]
pub struct LessonPlanFilter {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub subject: Option<String>,
}

impl LessonPlanFilter {
    pub fn matches(&self, plan: &LessonPlan) -> bool {
        if let Some(date) = self.date {
            if plan.date != date {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if plan.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if plan.date > end {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if plan.completed != completed {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if !plan.subject.eq_ignore_ascii_case(subject) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> LessonPlan {
        let now = Utc::now();
        LessonPlan {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            standard_id: None,
            subject: "Science".into(),
            topic: "Photosynthesis".into(),
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            start_time: "09:30".into(),
            duration: 45,
            materials: vec![],
            tags: vec![],
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn completed_at_follows_completed() {
        let mut plan = plan();
        let now = Utc::now();

        plan.set_completed(true, now);
        assert_eq!(plan.completed_at, Some(now));

        // Re-marking complete keeps the original timestamp
        plan.set_completed(true, now + chrono::Duration::hours(1));
        assert_eq!(plan.completed_at, Some(now));

        plan.set_completed(false, now);
        assert!(plan.completed_at.is_none());
    }

    #[test]
    fn filter_by_date_range_and_subject() {
        let plan = plan();
        let filter = LessonPlanFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            subject: Some("science".into()),
            ..Default::default()
        };
        assert!(filter.matches(&plan));

        let filter = LessonPlanFilter { completed: Some(true), ..Default::default() };
        assert!(!filter.matches(&plan));
    }

    #[test]
    fn material_type_serializes_as_type() {
        let material: Material = serde_json::from_str(r#"{"type":"link","content":"https://example.com"}"#).unwrap();
        assert_eq!(material.material_type, MaterialType::Link);
        assert!(!material.material_type.is_stored_file());
    }
}
