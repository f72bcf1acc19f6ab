// tests/profile_tests.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quizmaster::{
    config::Config,
    db, routes,
    services::generator::{GenerationError, TextGenerator},
    state::AppState,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Transport("offline".to_string()))
    }
}

async fn spawn_app(admin: bool) -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "profile_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: admin.then(|| "admin".to_string()),
        admin_email: admin.then(|| "admin@example.com".to_string()),
        admin_password: admin.then(|| "admin123".to_string()),
        gemini_api_key: String::new(),
        gemini_model: "test".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        ai_timeout: Duration::from_millis(200),
    };

    db::init(&pool, &config).await.expect("Failed to init database");

    let state = AppState {
        pool: pool.clone(),
        config,
        generator: Arc::new(OfflineGenerator),
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    username: &str,
    email: &str,
) -> String {
    let resp = client
        .post(format!("{}/register", address))
        .json(&serde_json::json!({
            "username": username,
            "email": email,
            "password": "password123",
            "role_id": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let login = client
        .post(format!("{}/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    login["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_profile_update_flow() {
    let (address, pool) = spawn_app(false).await;
    let client = reqwest::Client::new();

    let token_a = register_and_login(&client, &address, "user_a", "a@example.com").await;
    register_and_login(&client, &address, "user_b", "b@example.com").await;

    // 1. Own profile carries the role
    let me: serde_json::Value = client
        .get(format!("{}/profile", address))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], "user_a");
    assert_eq!(me["role_name"], "Student");
    assert!(me.get("password").is_none());

    // 2. Taking B's email is a conflict and changes nothing
    let clash = client
        .put(format!("{}/profile", address))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "username": "renamed", "email": "b@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(clash.status().as_u16(), 409);

    let name: String = sqlx::query_scalar("SELECT username FROM users WHERE email = 'a@example.com'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "user_a");

    // 3. A clean update goes through, new password works
    let ok = client
        .put(format!("{}/profile", address))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "username": "renamed", "password": "newpass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let updated: serde_json::Value = ok.json().await.unwrap();
    assert_eq!(updated["username"], "renamed");

    let relogin = client
        .post(format!("{}/login", address))
        .json(&serde_json::json!({ "email": "a@example.com", "password": "newpass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(relogin.status().as_u16(), 200);
}

#[tokio::test]
async fn test_seeded_admin_sees_all_users() {
    let (address, _pool) = spawn_app(true).await;
    let client = reqwest::Client::new();

    register_and_login(&client, &address, "student_1", "s1@example.com").await;

    let login = client
        .post(format!("{}/login", address))
        .json(&serde_json::json!({ "email": "admin@example.com", "password": "admin123" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(login["redirect"], "/admin/dashboard");
    let token = login["token"].as_str().unwrap();

    let dashboard: serde_json::Value = client
        .get(format!("{}/admin/dashboard", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(dashboard["stats"]["total_users"], 2);
    let roles: Vec<&str> = dashboard["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["role_name"].as_str())
        .collect();
    assert_eq!(roles, vec!["Admin", "Student"]);
}

#[tokio::test]
async fn test_fact_endpoint_never_fails() {
    let (address, _pool) = spawn_app(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/fact?topic=volcanoes", address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["topic"], "volcanoes");
    assert_eq!(body["fact"], quizmaster::services::facts::FALLBACK_FACT);
}
