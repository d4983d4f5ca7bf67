use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

use super::manager::{RecordError, StudentManager};
use super::types::{
    AddScoreRequest, ModifyScoreRequest, ScoreResponse, Student, StudentId, StudentUpdate,
};
use crate::api::{ErrorResponse, MessageResponse};

pub const ENDPOINT_STUDENTS: &str = "/students";
pub const ENDPOINT_STUDENT: &str = "/students/:id";
pub const ENDPOINT_STUDENT_SCORES: &str = "/students/:id/scores";
pub const ENDPOINT_STUDENT_SCORE: &str = "/students/:id/scores/:course";

pub fn router(manager: Arc<StudentManager>) -> Router {
    Router::new()
        .route(ENDPOINT_STUDENTS, post(handle_add_student))
        .route(
            ENDPOINT_STUDENT,
            get(handle_query_student)
                .put(handle_modify_student)
                .delete(handle_delete_student),
        )
        .route(ENDPOINT_STUDENT_SCORES, post(handle_add_score))
        .route(
            ENDPOINT_STUDENT_SCORE,
            get(handle_query_score)
                .put(handle_modify_score)
                .delete(handle_delete_score),
        )
        .layer(Extension(manager))
}

fn parse_id(raw: &str) -> Result<StudentId, Response> {
    raw.parse().map_err(|e| {
        tracing::warn!("Invalid student ID {:?}: {}", raw, e);
        error(StatusCode::BAD_REQUEST, "Invalid student ID")
    })
}

/// Unwraps a JSON body, turning any rejection into a `400 {"error": ...}`.
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        error(StatusCode::BAD_REQUEST, rejection.body_text())
    })
}

fn error(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn ok(message: &str) -> Response {
    (StatusCode::OK, Json(MessageResponse::new(message))).into_response()
}

fn not_found(err: RecordError) -> Response {
    error(StatusCode::NOT_FOUND, err)
}

pub async fn handle_add_student(
    Extension(manager): Extension<Arc<StudentManager>>,
    payload: Result<Json<Student>, JsonRejection>,
) -> Response {
    let student = match parse_body(payload) {
        Ok(student) => student,
        Err(response) => return response,
    };

    manager.add_student(student).await;
    ok("Student added successfully")
}

pub async fn handle_delete_student(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match manager.delete_student(id).await {
        Ok(()) => ok("Student deleted successfully"),
        Err(e) => not_found(e),
    }
}

pub async fn handle_modify_student(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<StudentUpdate>, JsonRejection>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let update = match parse_body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };

    match manager.modify_student(id, update).await {
        Ok(()) => ok("Student information updated successfully"),
        Err(e) => not_found(e),
    }
}

pub async fn handle_query_student(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match manager.query_student(id).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => not_found(e),
    }
}

pub async fn handle_add_score(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<AddScoreRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let req = match parse_body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };

    match manager.add_score(id, &req.course_name, req.score).await {
        Ok(()) => ok("Score added successfully"),
        Err(e) => not_found(e),
    }
}

pub async fn handle_delete_score(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path((raw_id, course)): Path<(String, String)>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match manager.delete_score(id, &course).await {
        Ok(()) => ok("Score deleted successfully"),
        Err(e) => not_found(e),
    }
}

pub async fn handle_modify_score(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path((raw_id, course)): Path<(String, String)>,
    payload: Result<Json<ModifyScoreRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let req = match parse_body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };

    match manager.modify_score(id, &course, req.score).await {
        Ok(()) => ok("Score updated successfully"),
        Err(e) => not_found(e),
    }
}

pub async fn handle_query_score(
    Extension(manager): Extension<Arc<StudentManager>>,
    Path((raw_id, course)): Path<(String, String)>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match manager.query_score(id, &course).await {
        Ok(score) => (StatusCode::OK, Json(ScoreResponse { score })).into_response(),
        Err(e) => not_found(e),
    }
}
