use std::collections::HashSet;
use std::sync::Arc;

use confab_models::{Conversation, Message, ServerEvent};

use crate::member_index::MembershipIndex;
use crate::mux::ConnectionMux;

/// Decides, for every persisted message, which users' live connections
/// must receive it. Stateless: purely a function of the message and the
/// membership index.
pub struct MessageRouter {
    mux: Arc<ConnectionMux>,
    members: MembershipIndex,
}

impl MessageRouter {
    pub fn new(mux: Arc<ConnectionMux>, members: MembershipIndex) -> Self {
        Self { mux, members }
    }

    /// Fan a persisted message out to its audience. Never fails: the store
    /// already holds the message, so a missed live push is recoverable by
    /// a history fetch and individual delivery failures are not retried.
    pub async fn route(&self, message: &Message) {
        let audience = self.audience(message).await;
        if audience.is_empty() {
            return;
        }
        self.mux
            .send_many(audience, &ServerEvent::new_message(message));
    }

    /// The sender is part of the audience in both branches so their other
    /// open sessions see the message; the client deduplicates by message
    /// id, not by audience exclusion.
    async fn audience(&self, message: &Message) -> HashSet<i64> {
        match message.conversation {
            Conversation::Direct { peer_id } => {
                HashSet::from([message.sender_id, peer_id])
            }
            Conversation::Group { group_id } => match self.members.resolve(group_id).await {
                Ok(members) => {
                    if members.is_empty() {
                        tracing::warn!(
                            group_id,
                            message_id = message.id,
                            "group resolved to an empty audience"
                        );
                    }
                    members.as_ref().clone()
                }
                Err(err) => {
                    tracing::warn!(
                        group_id,
                        message_id = message.id,
                        error = %err,
                        "membership resolve failed, skipping live fan-out"
                    );
                    HashSet::new()
                }
            },
        }
    }
}
