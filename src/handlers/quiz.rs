// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::{PublicQuestion, Question},
        quiz::{GenerateQuizRequest, Quiz, QuizForStudent, QuizSummary},
        student_result::{AnswerReview, HistoryEntry, QuizResultEntry, SubmitQuizRequest},
    },
    services::{generator::TextGenerator, grading, quiz_generation},
    utils::jwt::Claims,
};

const QUIZ_SUMMARY: &str = r#"
    SELECT q.id, q.title, q.creator_id, q.created_at,
        (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS question_count
    FROM quizzes q
"#;

async fn find_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT id, title, creator_id, created_at FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Generates a quiz on a topic with the text generator and saves it.
/// Teacher only.
pub async fn generate_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(generator): State<Arc<dyn TextGenerator>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let topic = req.topic.trim();
    if topic.is_empty() {
        return Err(AppError::BadRequest("Topic must not be blank".to_string()));
    }

    let created = quiz_generation::generate_quiz(
        &pool,
        generator.as_ref(),
        config.ai_timeout,
        claims.user_id()?,
        topic,
        req.count,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Lists the quizzes the calling teacher created.
pub async fn list_my_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(&format!(
        "{QUIZ_SUMMARY} WHERE q.creator_id = ? ORDER BY q.id DESC"
    ))
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Every attempt made on a quiz, newest first.
pub async fn quiz_results(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;

    let results = sqlx::query_as::<_, QuizResultEntry>(
        r#"
        SELECT sr.id AS result_id, sr.user_id, u.username,
            sr.score, sr.total_questions, sr.submitted_at
        FROM student_results sr
        JOIN users u ON u.id = sr.user_id
        WHERE sr.quiz_id = ?
        ORDER BY sr.id DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch results for quiz {}: {:?}", quiz_id, e);
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "quiz": quiz,
        "results": results,
    })))
}

/// Lists every quiz a student can take.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(&format!("{QUIZ_SUMMARY} ORDER BY q.id DESC"))
        .fetch_all(&pool)
        .await?;

    Ok(Json(quizzes))
}

/// Returns a quiz for taking, without the correct answers.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, text, options, correct_answer FROM questions WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(QuizForStudent {
        id: quiz.id,
        title: quiz.title,
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    }))
}

/// Grades a submission and records it as a new attempt.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = grading::submit_attempt(&pool, claims.user_id()?, quiz_id, &req.answers).await?;
    Ok(Json(summary))
}

/// All of the caller's attempts, newest first.
pub async fn history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT sr.id AS result_id, sr.quiz_id, q.title AS quiz_title,
            sr.score, sr.total_questions, sr.submitted_at
        FROM student_results sr
        JOIN quizzes q ON q.id = sr.quiz_id
        WHERE sr.user_id = ?
        ORDER BY sr.id DESC
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}

/// Question-by-question review of one of the caller's attempts.
pub async fn attempt_detail(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Someone else's attempt looks the same as a missing one.
    let owned = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM student_results WHERE id = ? AND user_id = ?",
    )
    .bind(result_id)
    .bind(claims.user_id()?)
    .fetch_optional(&pool)
    .await?;
    if owned.is_none() {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    let answers = sqlx::query_as::<_, AnswerReview>(
        r#"
        SELECT sa.question_id, qu.text AS question_text, sa.selected_option,
            qu.correct_answer, sa.is_correct
        FROM student_answers sa
        JOIN questions qu ON qu.id = sa.question_id
        WHERE sa.result_id = ?
        ORDER BY sa.question_id
        "#,
    )
    .bind(result_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "result_id": result_id,
        "answers": answers,
    })))
}
