use chrono::{DateTime, Utc};
use confab_models::User;

use crate::{DbError, DbPool};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            avatar: row.avatar,
            created_at: row.created_at,
        }
    }
}

pub async fn create_user(
    pool: &DbPool,
    id: i64,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, username, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id, username, email, password_hash, avatar, created_at",
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, avatar, created_at
         FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_email(pool: &DbPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, avatar, created_at
         FROM users WHERE email = ?1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn username_exists(pool: &DbPool, username: &str) -> Result<bool, DbError> {
    let exists: Option<(i32,)> =
        sqlx::query_as("SELECT 1 FROM users WHERE username = ?1 LIMIT 1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(exists.is_some())
}

pub async fn user_exists(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let exists: Option<(i32,)> =
        sqlx::query_as("SELECT 1 FROM users WHERE id = ?1 LIMIT 1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(exists.is_some())
}

/// Everyone except the viewer, for the conversation sidebar.
pub async fn list_users_except(pool: &DbPool, user_id: i64) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, avatar, created_at
         FROM users WHERE id != ?1
         ORDER BY username",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
