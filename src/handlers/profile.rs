// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{UpdateProfileRequest, UserWithRole},
    utils::jwt::Claims,
};

async fn load_profile(pool: &SqlitePool, user_id: i64) -> Result<UserWithRole, AppError> {
    sqlx::query_as::<_, UserWithRole>(
        r#"
        SELECT u.id, u.username, u.email, ur.role_id, r.name AS role_name, u.created_at
        FROM users u
        LEFT JOIN user_roles ur ON ur.id = (
            SELECT MIN(id) FROM user_roles WHERE user_id = u.id
        )
        LEFT JOIN roles r ON r.id = ur.role_id
        WHERE u.id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Get current user's profile.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let me = load_profile(&pool, claims.user_id()?).await?;
    Ok(Json(me))
}

/// Updates the current user's username, email or password.
/// All supplied fields change together or not at all.
pub async fn update_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let conflict = |e: sqlx::Error| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already exists".to_string())
        } else {
            tracing::error!("Failed to update profile of user {}: {:?}", user_id, e);
            AppError::from(e)
        }
    };

    let mut tx = pool.begin().await?;

    if let Some(username) = &payload.username {
        sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(username)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(conflict)?;
    }

    if let Some(email) = &payload.email {
        sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(email)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(conflict)?;
    }

    if let Some(password) = &payload.password {
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let me = load_profile(&pool, user_id).await?;
    Ok(Json(me))
}
