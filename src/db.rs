// src/db.rs

use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use crate::{config::Config, error::AppError, utils::roles::Role};

/// Opens the connection pool, retrying while the database is unavailable.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

/// Applies migrations and seeds the fixed data.
pub async fn init(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    tracing::info!("Migrations applied successfully.");

    seed_roles(pool).await?;

    if let Err(e) = seed_admin_user(pool, config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    Ok(())
}

/// Inserts the three fixed roles. Safe to run on every start.
pub async fn seed_roles(pool: &SqlitePool) -> Result<(), AppError> {
    for role in Role::ALL {
        sqlx::query("INSERT OR IGNORE INTO roles (id, name) VALUES (?, ?)")
            .bind(role.id())
            .bind(role.name())
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Creates the configured admin account the first time the app starts.
pub async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(email), Some(password)) = (
        &config.admin_username,
        &config.admin_email,
        &config.admin_password,
    ) else {
        return Ok(());
    };

    let user_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    if user_exists.is_none() {
        tracing::info!("Seeding admin user: {}", username);

        let mut tx = pool.begin().await?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(id)
            .bind(Role::Admin.id())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Admin user created successfully.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_pool, test_config};

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = memory_pool().await;
        seed_roles(&pool).await.unwrap();

        let roles: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(
            roles,
            vec![
                (1, "Admin".to_string()),
                (2, "Teacher".to_string()),
                (3, "Student".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn admin_is_seeded_once() {
        let pool = memory_pool().await;
        let mut config = test_config();
        config.admin_username = Some("admin".to_string());
        config.admin_email = Some("admin@example.com".to_string());
        config.admin_password = Some("admin123".to_string());

        seed_admin_user(&pool, &config).await.unwrap();
        seed_admin_user(&pool, &config).await.unwrap();

        let role: i64 = sqlx::query_scalar(
            "SELECT ur.role_id FROM user_roles ur JOIN users u ON u.id = ur.user_id WHERE u.username = 'admin'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(role, Role::Admin.id());

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }
}
