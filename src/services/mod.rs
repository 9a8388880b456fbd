//! Business rules. Handlers extract and validate input, services decide.
//! Every service borrows the shared `AppState` for the length of one request.

pub mod app_version;
pub mod auth;
pub mod divisions;
pub mod import;
pub mod lesson_plans;
pub mod mcq;
pub mod profile;
pub mod standards;
pub mod students;
pub mod uploads;

/// Trim an optional text field; blank becomes `None`
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(clean_optional(Some("  ".into())), None);
        assert_eq!(clean_optional(Some(" 12 ".into())).as_deref(), Some("12"));
        assert_eq!(clean_optional(None), None);
    }
}
