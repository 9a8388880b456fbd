use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfilePicture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeacherRole {
    Teacher,
    Admin,
}

impl TeacherRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherRole::Teacher => "teacher",
            TeacherRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => TeacherRole::Admin,
            _ => TeacherRole::Teacher,
        }
    }
}

/// Account record. Credentials and OTP state never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: TeacherRole,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub subject: Option<String>,
    pub profile_picture: Option<ProfilePicture>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expiry: Option<DateTime<Utc>>,
    pub settings: TeacherSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Teacher {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: TeacherRole::Teacher,
            phone: None,
            school: None,
            subject: None,
            profile_picture: None,
            is_active: true,
            last_login: None,
            otp: None,
            otp_expiry: None,
            settings: TeacherSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == TeacherRole::Admin
    }

    /// True when `otp` matches the stored one and has not expired at `now`
    pub fn otp_matches(&self, otp: &str, now: DateTime<Utc>) -> bool {
        match (&self.otp, self.otp_expiry) {
            (Some(stored), Some(expiry)) => stored == otp && expiry > now,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeacherSettings {
    pub notifications: NotificationSettings,
    pub privacy: PrivacySettings,
    pub appearance: AppearanceSettings,
    pub backup: BackupSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub student_updates: bool,
    pub system_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            student_updates: true,
            system_alerts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    Public,
    Private,
    #[default]
    School,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacySettings {
    pub profile_visibility: ProfileVisibility,
    pub share_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppearanceSettings {
    pub theme: Theme,
    pub language: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupSettings {
    pub auto_backup: bool,
    pub backup_frequency: BackupFrequency,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            auto_backup: true,
            backup_frequency: BackupFrequency::Weekly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn serialization_hides_credentials() {
        let mut teacher = Teacher::new("Asha".into(), "asha@school.in".into(), "$2b$12$hash".into());
        teacher.otp = Some("123456".into());

        let json = serde_json::to_value(&teacher).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("otp").is_none());
        assert_eq!(json["role"], "teacher");
        assert_eq!(json["settings"]["privacy"]["profileVisibility"], "school");
        assert_eq!(json["settings"]["backup"]["backupFrequency"], "weekly");
    }

    #[test]
    fn otp_expires() {
        let now = Utc::now();
        let mut teacher = Teacher::new("Asha".into(), "asha@school.in".into(), String::new());
        teacher.otp = Some("654321".into());
        teacher.otp_expiry = Some(now + Duration::minutes(10));

        assert!(teacher.otp_matches("654321", now));
        assert!(!teacher.otp_matches("111111", now));
        assert!(!teacher.otp_matches("654321", now + Duration::minutes(11)));
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: TeacherSettings = serde_json::from_str(r#"{"appearance":{"theme":"dark"}}"#).unwrap();
        assert_eq!(settings.appearance.theme, Theme::Dark);
        assert_eq!(settings.appearance.language, "en");
        assert!(settings.notifications.email);
    }
}
