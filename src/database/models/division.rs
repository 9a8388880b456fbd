use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    pub id: Uuid,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub standard_id: Uuid,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Division {
    pub fn new(created_by: Uuid, standard_id: Uuid, standard_name: &str, name: &str, description: Option<String>) -> Self {
        let now = Utc::now();
        let name = normalize_division_name(name);
        Self {
            id: Uuid::new_v4(),
            full_name: division_full_name(standard_name, &name),
            name,
            description,
            standard_id,
            created_by,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Division names are stored trimmed and upper-cased ("a " -> "A").
pub fn normalize_division_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Display name shown to clients, e.g. "6th Standard-A".
pub fn division_full_name(standard_name: &str, division_name: &str) -> String {
    format!("{}-{}", standard_name.trim(), division_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_standard_and_division() {
        assert_eq!(division_full_name("6th Standard", "A"), "6th Standard-A");
    }

    #[test]
    fn new_division_uppercases_name() {
        let division = Division::new(Uuid::new_v4(), Uuid::new_v4(), "7th Standard", " b ", None);
        assert_eq!(division.name, "B");
        assert_eq!(division.full_name, "7th Standard-B");
    }
}
