// src/models/student_result.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'student_results' table in the database.
/// One row per submission attempt; retakes add rows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentResult {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    /// Integer percentage, 0..=100, rounded down.
    pub score: i64,
    pub total_questions: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'student_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub result_id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    /// `None` when the student left the question blank.
    pub selected_option: Option<String>,
    pub is_correct: bool,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// Key: Question ID, Value: the selected option.
    /// Unanswered questions are simply absent.
    #[serde(default)]
    pub answers: HashMap<i64, String>,
}

/// Outcome of one graded attempt.
#[derive(Debug, Serialize)]
pub struct AttemptSummary {
    pub result_id: i64,
    pub quiz_id: i64,
    pub score: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// A row of a student's own history.
#[derive(Debug, Serialize, FromRow)]
pub struct HistoryEntry {
    pub result_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: i64,
    pub total_questions: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// A row of a quiz's result sheet, as a teacher sees it.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizResultEntry {
    pub result_id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: i64,
    pub total_questions: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Per-question review of one attempt.
#[derive(Debug, Serialize, FromRow)]
pub struct AnswerReview {
    pub question_id: i64,
    pub question_text: String,
    pub selected_option: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}
