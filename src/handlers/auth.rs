// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{CreateUserRequest, LoginRequest, RoleRow, User},
    utils::{
        jwt::{LOGIN_PATH, clear_session_cookie, session_cookie, sign_jwt},
        roles::{Role, dashboard_for},
    },
};

/// Landing point for every redirect out of a gated route.
pub async fn login_page() -> impl IntoResponse {
    Json(json!({
        "message": "Please log in",
        "login": "POST /login with {\"email\", \"password\"}",
    }))
}

/// Roles offered on the registration form. Admin is never offered.
pub async fn list_roles(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let roles = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE id != ? ORDER BY id")
        .bind(Role::Admin.id())
        .fetch_all(&pool)
        .await?;

    Ok(Json(roles))
}

/// Registers a new user with the chosen role.
///
/// The user row and its role row are written in one transaction, so a
/// duplicate username or email leaves nothing behind.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let role = Role::try_from(payload.role_id)
        .ok()
        .filter(|role| role.is_self_assignable())
        .ok_or_else(|| AppError::BadRequest("Please choose Teacher or Student".to_string()))?;

    let mut tx = pool.begin().await?;

    let taken = sqlx::query_as::<_, (String, String)>(
        "SELECT username, email FROM users WHERE username = ? OR email = ? LIMIT 1",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((username, _)) = taken {
        let msg = if username == payload.username {
            format!("Username '{}' already exists", payload.username)
        } else {
            format!("Email '{}' is already registered", payload.email)
        };
        return Err(AppError::Conflict(msg));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password)
        VALUES (?, ?, ?)
        RETURNING id, username, email, password, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.password)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already exists".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user.id)
        .bind(role.id())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Registered user {} as {}", user.username, role.name());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role_id": role.id(),
        })),
    ))
}

/// Authenticates a user by email and starts a session.
///
/// The first role row of the user decides the dashboard. A role id outside
/// the known three is denied and sent back to the login page.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, created_at FROM users WHERE email = ?",
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?
    .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    // Plaintext comparison; credentials are stored as entered.
    if user.password != payload.password {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let role_id = sqlx::query_scalar::<_, i64>(
        "SELECT role_id FROM user_roles WHERE user_id = ? ORDER BY id LIMIT 1",
    )
    .bind(user.id)
    .fetch_optional(&pool)
    .await?;

    let Some((role_id, dashboard)) =
        role_id.and_then(|id| dashboard_for(id).map(|dashboard| (id, dashboard)))
    else {
        tracing::warn!("User {} has no usable role ({:?})", user.id, role_id);
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let token = sign_jwt(user.id, role_id, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&token, config.jwt_expiration))],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role_id": role_id,
            "redirect": dashboard.path(),
        })),
    )
        .into_response())
}

/// Ends the session by clearing the cookie.
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to(LOGIN_PATH),
    )
}
