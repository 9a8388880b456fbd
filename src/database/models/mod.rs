pub mod app_version;
pub mod division;
pub mod lesson_plan;
pub mod mcq;
pub mod standard;
pub mod student;
pub mod submission;
pub mod teacher;
pub mod upload;

pub use app_version::AppVersionConfig;
pub use division::{division_full_name, Division};
pub use lesson_plan::{LessonPlan, LessonPlanFilter, Material, MaterialType};
pub use mcq::{Mcq, McqMetadata, McqSettings, McqStatistics, Question};
pub use standard::Standard;
pub use student::{ParentContact, Student, StudentFilter};
pub use submission::{grade_for, SubmittedAnswer, Submission};
pub use teacher::{Teacher, TeacherRole, TeacherSettings};
pub use upload::{StoredFile, Upload, UploadType};

use serde::{Deserialize, Serialize};

/// Image reference kept on teachers and students
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePicture {
    pub url: String,
    pub public_id: String,
}

impl ProfilePicture {
    pub(crate) fn from_columns(url: Option<String>, public_id: Option<String>) -> Option<Self> {
        match (url, public_id) {
            (Some(url), Some(public_id)) => Some(Self { url, public_id }),
            (Some(url), None) => Some(Self { url, public_id: String::new() }),
            _ => None,
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: i64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        let total_pages = ((total.max(0) as u64 + page.limit as u64 - 1) / page.limit as u64) as u32;
        Self {
            current_page: page.page,
            total_pages,
            total_items: total,
            items_per_page: page.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        let page = Page::new(None, None);
        assert_eq!((page.page, page.limit), (1, 10));

        let page = Page::new(Some(0), Some(1000));
        assert_eq!((page.page, page.limit), (1, MAX_PAGE_LIMIT));

        assert_eq!(Page::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(Page::new(Some(1), Some(10)), 21);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(Page::default(), 0).total_pages, 0);
    }
}
