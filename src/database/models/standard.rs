use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Standard {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Standard {
    pub fn new(created_by: Uuid, name: String, description: Option<String>, subjects: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            subjects,
            created_by,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
