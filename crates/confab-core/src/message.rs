use confab_db::messages::MessageRow;
use confab_db::DbPool;
use confab_models::{Conversation, Message};
use confab_util::{snowflake, validation};

use crate::error::CoreError;
use crate::router::MessageRouter;

pub(crate) fn message_from_row(row: MessageRow) -> Result<Message, CoreError> {
    let conversation = match (row.recipient_id, row.group_id) {
        (_, Some(group_id)) => Conversation::Group { group_id },
        (Some(peer_id), None) => Conversation::Direct { peer_id },
        (None, None) => {
            return Err(CoreError::Internal(format!(
                "message {} has neither recipient nor group",
                row.id
            )))
        }
    };
    Ok(Message {
        id: row.id,
        sender_id: row.sender_id,
        conversation,
        text: row.text,
        image: row.image,
        created_at: row.created_at,
    })
}

/// Validate, persist, then fan out. Persistence failures fail the whole
/// send; live-delivery failures never do.
pub async fn send_message(
    db: &DbPool,
    router: &MessageRouter,
    sender_id: i64,
    conversation: Conversation,
    text: Option<&str>,
    image: Option<&str>,
) -> Result<Message, CoreError> {
    validation::validate_message_body(text, image)?;

    match conversation {
        Conversation::Direct { peer_id } => {
            if !confab_db::users::user_exists(db, peer_id).await? {
                return Err(CoreError::NotFound);
            }
        }
        Conversation::Group { group_id } => {
            // Authorization reads the store, never the cached index.
            if confab_db::groups::get_group(db, group_id).await?.is_none() {
                return Err(CoreError::NotFound);
            }
            if !confab_db::groups::is_member(db, group_id, sender_id).await? {
                return Err(CoreError::Unauthorized);
            }
        }
    }

    let id = snowflake::generate(1);
    let row =
        confab_db::messages::create_message(db, id, sender_id, conversation, text, image).await?;
    let message = message_from_row(row)?;

    router.route(&message).await;
    Ok(message)
}

/// Direct history between the viewer and a peer. The query is scoped to
/// the two parties, so the viewer can never read someone else's thread.
pub async fn direct_history(
    db: &DbPool,
    viewer_id: i64,
    peer_id: i64,
) -> Result<Vec<Message>, CoreError> {
    if !confab_db::users::user_exists(db, peer_id).await? {
        return Err(CoreError::NotFound);
    }
    let rows = confab_db::messages::direct_history(db, viewer_id, peer_id).await?;
    rows.into_iter().map(message_from_row).collect()
}

/// Group history; the viewer must be a member or the read is rejected
/// outright with no partial data.
pub async fn group_history(
    db: &DbPool,
    viewer_id: i64,
    group_id: i64,
) -> Result<Vec<Message>, CoreError> {
    if confab_db::groups::get_group(db, group_id).await?.is_none() {
        return Err(CoreError::NotFound);
    }
    if !confab_db::groups::is_member(db, group_id, viewer_id).await? {
        return Err(CoreError::Unauthorized);
    }
    let rows = confab_db::messages::group_history(db, group_id).await?;
    rows.into_iter().map(message_from_row).collect()
}
