use std::time::Duration;

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions, types::Json};

use crate::config::Config;
use crate::db;
use crate::services::generator::{GenerationError, TextGenerator};
use crate::utils::roles::Role;

/// Returns a canned reply, optionally after a delay.
pub(crate) struct ScriptedGenerator {
    reply: Result<String, GenerationError>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub(crate) fn ok(text: impl Into<String>) -> Self {
        Self { reply: Ok(text.into()), delay: None }
    }

    pub(crate) fn err(err: GenerationError) -> Self {
        Self { reply: Err(err), delay: None }
    }

    pub(crate) fn slow(text: impl Into<String>, delay: Duration) -> Self {
        Self { reply: Ok(text.into()), delay: Some(delay) }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

pub(crate) fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_email: None,
        admin_password: None,
        gemini_api_key: String::new(),
        gemini_model: "test-model".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        ai_timeout: Duration::from_secs(1),
    }
}

/// A migrated, role-seeded in-memory database.
/// One connection that never expires, since each connection is its own database.
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init(&pool, &test_config()).await.unwrap();
    pool
}

pub(crate) async fn create_user(pool: &SqlitePool, username: &str, role: Role) -> i64 {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email, password) VALUES (?, ?, 'pw') RETURNING id",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(id)
        .bind(role.id())
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Quiz whose questions have the given correct answers, options always A to D.
pub(crate) async fn create_quiz(
    pool: &SqlitePool,
    creator_id: i64,
    correct_answers: &[&str],
) -> (i64, Vec<i64>) {
    let quiz_id: i64 =
        sqlx::query_scalar("INSERT INTO quizzes (title, creator_id) VALUES ('Test', ?) RETURNING id")
            .bind(creator_id)
            .fetch_one(pool)
            .await
            .unwrap();

    let mut question_ids = Vec::new();
    for (i, answer) in correct_answers.iter().enumerate() {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (quiz_id, text, options, correct_answer) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(quiz_id)
        .bind(format!("Q{}", i + 1))
        .bind(Json(vec!["A", "B", "C", "D"]))
        .bind(*answer)
        .fetch_one(pool)
        .await
        .unwrap();
        question_ids.push(id);
    }

    (quiz_id, question_ids)
}
