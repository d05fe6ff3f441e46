use serde::{Deserialize, Serialize};

/// Where a message belongs: a one-to-one conversation with a peer, or a
/// named group. The tag is carried explicitly from the client's send
/// request through persistence to the live event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Conversation {
    Direct { peer_id: i64 },
    Group { group_id: i64 },
}

impl Conversation {
    pub fn is_group(&self) -> bool {
        matches!(self, Conversation::Group { .. })
    }

    /// The group id, when this is a group conversation.
    pub fn group_id(&self) -> Option<i64> {
        match self {
            Conversation::Group { group_id } => Some(*group_id),
            Conversation::Direct { .. } => None,
        }
    }
}
