// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{PublicQuestion, Question};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    /// The Teacher who generated the quiz.
    pub creator_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Quiz listing row with its question count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub creator_id: i64,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Quiz together with everything persisted for it by the generation workflow.
#[derive(Debug, Serialize)]
pub struct CreatedQuiz {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// A quiz as a student sees it while taking it.
#[derive(Debug, Serialize)]
pub struct QuizForStudent {
    pub id: i64,
    pub title: String,
    pub questions: Vec<PublicQuestion>,
}

pub const DEFAULT_QUESTION_COUNT: u32 = 5;

fn default_question_count() -> u32 {
    DEFAULT_QUESTION_COUNT
}

/// DTO for asking the AI for a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Topic must be between 1 and 200 characters."))]
    pub topic: String,
    #[serde(default = "default_question_count")]
    #[validate(range(min = 1, max = 20, message = "Question count must be between 1 and 20."))]
    pub count: u32,
}
