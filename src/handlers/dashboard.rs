// src/handlers/dashboard.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        quiz::QuizSummary,
        student_result::HistoryEntry,
        user::UserWithRole,
    },
    services::{facts::fact_about, generator::TextGenerator},
    utils::{
        jwt::{Claims, LOGIN_PATH},
        roles::{Role, dashboard_for},
    },
};

/// Users joined with their governing (first) role row.
const USERS_WITH_ROLE: &str = r#"
    SELECT u.id, u.username, u.email, ur.role_id, r.name AS role_name, u.created_at
    FROM users u
    LEFT JOIN user_roles ur ON ur.id = (
        SELECT MIN(id) FROM user_roles WHERE user_id = u.id
    )
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

const DEFAULT_FACT_TOPIC: &str = "general knowledge";

/// Sends the caller to the dashboard of their role.
pub async fn dashboard(Extension(claims): Extension<Claims>) -> Redirect {
    match dashboard_for(claims.role) {
        Some(dashboard) => Redirect::to(dashboard.path()),
        None => Redirect::to(LOGIN_PATH),
    }
}

/// Admin overview: every user with their role, plus totals.
pub async fn admin_dashboard(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserWithRole>(&format!("{USERS_WITH_ROLE} ORDER BY u.id"))
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::from(e)
        })?;

    let total_quizzes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&pool)
        .await?;
    let total_attempts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM student_results")
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({
        "stats": {
            "total_users": users.len(),
            "total_quizzes": total_quizzes,
            "total_attempts": total_attempts,
        },
        "users": users,
    })))
}

/// Teacher overview: their students, their quizzes, and how those quizzes went.
pub async fn staff_dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, UserWithRole>(&format!("{USERS_WITH_ROLE} WHERE u.id = ?"))
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let students = sqlx::query_as::<_, UserWithRole>(&format!(
        "{USERS_WITH_ROLE} WHERE ur.role_id = ? ORDER BY u.username"
    ))
    .bind(Role::Student.id())
    .fetch_all(&pool)
    .await?;

    let active_quizzes =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes WHERE creator_id = ?")
            .bind(user_id)
            .fetch_one(&pool)
            .await?;

    let avg_score = sqlx::query_scalar::<_, Option<f64>>(
        r#"
        SELECT AVG(sr.score)
        FROM student_results sr
        JOIN quizzes q ON q.id = sr.quiz_id
        WHERE q.creator_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?
    .map(|avg| avg.floor() as i64);

    Ok(Json(json!({
        "user": user,
        "stats": {
            "total_students": students.len(),
            "active_quizzes": active_quizzes,
            "avg_score": avg_score,
        },
        "students": students,
    })))
}

/// Student overview: what can be taken, recent attempts, and a fun fact.
pub async fn student_dashboard(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(generator): State<Arc<dyn TextGenerator>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT q.id, q.title, q.creator_id, q.created_at,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS question_count
        FROM quizzes q
        ORDER BY q.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let recent = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT sr.id AS result_id, sr.quiz_id, q.title AS quiz_title,
            sr.score, sr.total_questions, sr.submitted_at
        FROM student_results sr
        JOIN quizzes q ON q.id = sr.quiz_id
        WHERE sr.user_id = ?
        ORDER BY sr.id DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let topic = recent
        .first()
        .map(|entry| entry.quiz_title.as_str())
        .unwrap_or(DEFAULT_FACT_TOPIC);
    let fact = fact_about(generator.as_ref(), config.ai_timeout, topic).await;

    Ok(Json(json!({
        "quizzes": quizzes,
        "recent_results": recent,
        "fact": fact,
    })))
}

#[derive(Debug, Deserialize)]
pub struct FactParams {
    pub topic: Option<String>,
}

/// A fun fact on demand. Never fails; see `fact_about`.
pub async fn fun_fact(
    State(config): State<Config>,
    State(generator): State<Arc<dyn TextGenerator>>,
    Query(params): Query<FactParams>,
) -> impl IntoResponse {
    let topic = params
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_FACT_TOPIC);

    let fact = fact_about(generator.as_ref(), config.ai_timeout, topic).await;
    Json(json!({ "topic": topic, "fact": fact }))
}
