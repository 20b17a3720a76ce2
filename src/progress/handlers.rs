use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    CourseLessonsResponse, CourseProgressItem, LessonItem, ProgressResponse, SaveProgressRequest,
};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::ApiError,
    state::AppState,
};

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/course-progress", get(get_progress).post(save_progress))
        .route("/course-progress/:course_name", get(get_course_lessons))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ProgressResponse>, ApiError> {
    let summaries = state
        .progress
        .summarize(user.id)
        .await
        .map_err(ApiError::persistence("Failed to load progress"))?;

    Ok(Json(ProgressResponse {
        success: true,
        progress: summaries.into_iter().map(CourseProgressItem::from).collect(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, %course_name))]
pub async fn get_course_lessons(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_name): Path<String>,
) -> Result<Json<CourseLessonsResponse>, ApiError> {
    let lessons = state
        .progress
        .lessons_for_course(user.id, &course_name)
        .await
        .map_err(ApiError::persistence("Failed to load progress"))?;

    Ok(Json(CourseLessonsResponse {
        success: true,
        course_name,
        progress: lessons.into_iter().map(LessonItem::from).collect(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn save_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SaveProgressRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;

    let (Some(course_name), Some(lesson_number)) = (
        payload.course_name.filter(|c| !c.is_empty()),
        payload.lesson_number.filter(|n| *n != 0),
    ) else {
        return Err(ApiError::validation(
            "Course name and lesson number are required",
        ));
    };

    state
        .progress
        .mark_completed(user.id, &course_name, lesson_number)
        .await
        .map_err(ApiError::persistence("Failed to save progress"))?;

    info!(%course_name, lesson_number, "lesson completed");
    Ok(Json(MessageResponse::ok("Progress saved successfully")))
}
