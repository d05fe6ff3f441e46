use chrono::{DateTime, Utc};
use confab_models::Conversation;

use crate::{DbError, DbPool};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: Option<i64>,
    pub group_id: Option<i64>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn create_message(
    pool: &DbPool,
    id: i64,
    sender_id: i64,
    conversation: Conversation,
    text: Option<&str>,
    image: Option<&str>,
) -> Result<MessageRow, DbError> {
    let (recipient_id, group_id) = match conversation {
        Conversation::Direct { peer_id } => (Some(peer_id), None),
        Conversation::Group { group_id } => (None, Some(group_id)),
    };

    let row = sqlx::query_as::<_, MessageRow>(
        "INSERT INTO messages (id, sender_id, recipient_id, group_id, text, image, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         RETURNING id, sender_id, recipient_id, group_id, text, image, created_at",
    )
    .bind(id)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(group_id)
    .bind(text)
    .bind(image)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Everything exchanged between the two users, in id (creation) order.
pub async fn direct_history(
    pool: &DbPool,
    user_a: i64,
    user_b: i64,
) -> Result<Vec<MessageRow>, DbError> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT id, sender_id, recipient_id, group_id, text, image, created_at
         FROM messages
         WHERE group_id IS NULL
           AND ((sender_id = ?1 AND recipient_id = ?2)
             OR (sender_id = ?2 AND recipient_id = ?1))
         ORDER BY id",
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn group_history(pool: &DbPool, group_id: i64) -> Result<Vec<MessageRow>, DbError> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT id, sender_id, recipient_id, group_id, text, image, created_at
         FROM messages
         WHERE group_id = ?1
         ORDER BY id",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
