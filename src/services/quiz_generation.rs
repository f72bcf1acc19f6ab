// src/services/quiz_generation.rs

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use sqlx::{SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::{
        question::{GeneratedQuiz, Question},
        quiz::{CreatedQuiz, Quiz},
    },
    services::generator::{GenerationError, TextGenerator},
};

/// First `{` through last `}`, across newlines.
/// Greedy on purpose: nested objects survive, but two sibling objects over-match.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object regex"));

/// Builds the instruction sent to the text generator.
pub fn build_prompt(topic: &str, count: u32) -> String {
    format!(
        "Create a multiple-choice quiz about \"{topic}\" with exactly {count} questions.\n\
         Respond with a single JSON object and nothing else, in this shape:\n\
         {{\"title\": \"<quiz title>\", \"questions\": [\
         {{\"text\": \"<question>\", \"options\": [\"<A>\", \"<B>\", \"<C>\", \"<D>\"], \
         \"correct_answer\": \"<one of the options, copied exactly>\"}}]}}\n\
         Every question must have exactly 4 options, and correct_answer must match one option character for character."
    )
}

/// Isolates the JSON object embedded in a free-text completion and parses it.
pub fn extract_json_object(text: &str) -> Result<Value, GenerationError> {
    let candidate = JSON_OBJECT_RE
        .find(text)
        .ok_or_else(|| GenerationError::Malformed("no JSON object in response".to_string()))?;

    match serde_json::from_str::<Value>(candidate.as_str()) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(GenerationError::Malformed("response is not a JSON object".to_string())),
        Err(e) => Err(GenerationError::Malformed(e.to_string())),
    }
}

/// Reads the quiz shape out of the extracted object.
/// A question missing `text`, `options` or `correct_answer` rejects the whole quiz.
pub fn parse_generated_quiz(value: Value) -> Result<GeneratedQuiz, GenerationError> {
    serde_json::from_value(value).map_err(|e| GenerationError::Malformed(e.to_string()))
}

fn resolve_title(generated: Option<&str>, topic: &str) -> String {
    generated
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(topic)
        .to_string()
}

/// Topic to persisted quiz.
///
/// * Asks the generator, bounded by `timeout`.
/// * Parses the completion before touching the database, so AI failures write nothing.
/// * Inserts the quiz and all of its questions in a single transaction.
pub async fn generate_quiz(
    pool: &SqlitePool,
    generator: &dyn TextGenerator,
    timeout: Duration,
    creator_id: i64,
    topic: &str,
    count: u32,
) -> Result<CreatedQuiz, AppError> {
    let prompt = build_prompt(topic, count);

    let raw = match tokio::time::timeout(timeout, generator.generate(&prompt)).await {
        Ok(result) => result?,
        Err(_) => return Err(GenerationError::Timeout.into()),
    };

    let generated = parse_generated_quiz(extract_json_object(&raw)?)?;

    if generated.questions.len() != count as usize {
        tracing::warn!(
            "Requested {} questions on '{}', AI returned {}",
            count,
            topic,
            generated.questions.len()
        );
    }
    for q in &generated.questions {
        if !q.options.contains(&q.correct_answer) {
            tracing::warn!("Correct answer is not among the options for question '{}'", q.text);
        }
    }

    let title = resolve_title(generated.title.as_deref(), topic);

    let mut tx = pool.begin().await?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (title, creator_id)
        VALUES (?, ?)
        RETURNING id, title, creator_id, created_at
        "#,
    )
    .bind(&title)
    .bind(creator_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert quiz: {:?}", e);
        AppError::from(e)
    })?;

    let mut questions = Vec::with_capacity(generated.questions.len());
    for q in generated.questions {
        let row = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (quiz_id, text, options, correct_answer)
            VALUES (?, ?, ?, ?)
            RETURNING id, quiz_id, text, options, correct_answer
            "#,
        )
        .bind(quiz.id)
        .bind(q.text)
        .bind(Json(q.options))
        .bind(q.correct_answer)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert question for quiz {}: {:?}", quiz.id, e);
            AppError::from(e)
        })?;
        questions.push(row);
    }

    tx.commit().await?;

    tracing::info!(
        "Quiz {} '{}' generated with {} questions by user {}",
        quiz.id,
        quiz.title,
        questions.len(),
        creator_id
    );

    Ok(CreatedQuiz { quiz, questions })
}
