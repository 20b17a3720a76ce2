use serde::{Deserialize, Serialize};

use time::OffsetDateTime;

use super::repo::{CourseSummary, LessonProgress};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub course_name: Option<String>,
    pub lesson_number: Option<i32>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CourseProgressItem {
    pub course_name: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub progress_percentage: f64,
}

impl From<CourseSummary> for CourseProgressItem {
    fn from(s: CourseSummary) -> Self {
        Self {
            progress_percentage: progress_percentage(s.completed_lessons, s.total_lessons),
            course_name: s.course_name,
            total_lessons: s.total_lessons,
            completed_lessons: s.completed_lessons,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub success: bool,
    pub progress: Vec<CourseProgressItem>,
}

#[derive(Debug, Serialize)]
pub struct LessonItem {
    pub lesson_number: i32,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl From<LessonProgress> for LessonItem {
    fn from(l: LessonProgress) -> Self {
        Self {
            lesson_number: l.lesson_number,
            completed: l.completed,
            completed_at: l.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseLessonsResponse {
    pub success: bool,
    pub course_name: String,
    pub progress: Vec<LessonItem>,
}

/// Percentage rounded to two decimals; 0 for an empty course.
pub fn progress_percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = completed as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
