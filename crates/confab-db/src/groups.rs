use chrono::{DateTime, Utc};
use confab_models::Group;

use crate::{DbError, DbPool};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub admin_id: i64,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            description: row.description,
            admin_id: row.admin_id,
            avatar: row.avatar,
            created_at: row.created_at,
        }
    }
}

/// Insert a group and its member rows in one transaction. The caller is
/// responsible for having unioned the admin into `member_ids`.
pub async fn create_group(
    pool: &DbPool,
    id: i64,
    name: &str,
    description: Option<&str>,
    admin_id: i64,
    member_ids: &[i64],
) -> Result<GroupRow, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO chat_groups (id, name, description, admin_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(admin_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    for member_id in member_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
        )
        .bind(id)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let row = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name, description, admin_id, avatar, created_at
         FROM chat_groups WHERE id = ?1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_group(pool: &DbPool, id: i64) -> Result<Option<GroupRow>, DbError> {
    let row = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name, description, admin_id, avatar, created_at
         FROM chat_groups WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_groups_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<GroupRow>, DbError> {
    let rows = sqlx::query_as::<_, GroupRow>(
        "SELECT g.id, g.name, g.description, g.admin_id, g.avatar, g.created_at
         FROM chat_groups g
         INNER JOIN group_members m ON m.group_id = g.id
         WHERE m.user_id = ?1
         ORDER BY g.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_member_ids(pool: &DbPool, group_id: i64) -> Result<Vec<i64>, DbError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT user_id FROM group_members WHERE group_id = ?1")
            .bind(group_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn is_member(pool: &DbPool, group_id: i64, user_id: i64) -> Result<bool, DbError> {
    let exists: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2 LIMIT 1",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(exists.is_some())
}

pub async fn add_member(pool: &DbPool, group_id: i64, user_id: i64) -> Result<(), DbError> {
    sqlx::query("INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)")
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns whether a membership row was actually deleted.
pub async fn remove_member(pool: &DbPool, group_id: i64, user_id: i64) -> Result<bool, DbError> {
    let result =
        sqlx::query("DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2")
            .bind(group_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
