//! Clinic staff accounts.
//!
//! Accounts are passwordless: logging in with a username creates the
//! account or reactivates a deactivated one. Users are never deleted, only
//! soft-deactivated, so `last_updated_by` references stay valid forever.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create-or-reactivate a user by username.
    ///
    /// The trimmed username must be at least 3 characters.
    pub async fn login(&self, username: &str) -> ClinicResult<User> {
        let username = username.trim();
        if username.chars().count() < 3 {
            return Err(ClinicError::Validation(
                "username (>= 3 chars) is required".into(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username)
            VALUES (?1)
            ON CONFLICT (username) DO UPDATE SET is_active = 1
            RETURNING id, username, is_active, created_at
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Active usernames, newest account first.
    pub async fn active_usernames(&self) -> ClinicResult<Vec<String>> {
        let names = sqlx::query_scalar(
            "SELECT username FROM users WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

#[cfg(test)]
mod user_service_tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn login_upserts_and_reactivates() {
        let pool = connect_in_memory().await.unwrap();
        let service = UserService::new(pool.clone());

        let first = service.login("soklin").await.unwrap();
        let again = service.login("  soklin ").await.unwrap();
        assert_eq!(first.id, again.id);

        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
            .bind(first.id)
            .execute(&pool)
            .await
            .unwrap();

        let revived = service.login("soklin").await.unwrap();
        assert_eq!(revived.id, first.id);
        assert!(revived.is_active);
    }

    #[tokio::test]
    async fn short_usernames_are_rejected() {
        let pool = connect_in_memory().await.unwrap();
        let service = UserService::new(pool);

        let err = service.login(" ab ").await.expect_err("expected rejection");
        assert!(matches!(err, ClinicError::Validation(_)));
    }
}
