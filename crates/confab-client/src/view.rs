use std::collections::HashSet;
use std::future::Future;

use confab_models::{Conversation, Message, ServerEvent};

use crate::subscription::{Subscription, SubscriptionRegistry};
use crate::ClientError;

/// The history side of the durable store, as seen from a client session.
pub trait HistorySource {
    fn fetch_history(
        &self,
        conversation: Conversation,
    ) -> impl Future<Output = Result<Vec<Message>, ClientError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Ready,
}

enum State {
    Idle,
    Loading {
        conversation: Conversation,
        _subscription: Subscription,
        /// Live events that raced the initial history fetch; merged (and
        /// deduplicated) once the history lands, so nothing delivered
        /// before subscription completion is lost.
        pending: Vec<Message>,
    },
    Ready {
        conversation: Conversation,
        _subscription: Subscription,
        messages: Vec<Message>,
        seen: HashSet<i64>,
    },
}

/// Per-session ordered view of one open conversation.
///
/// Merges the initial history fetch with the live stream: events tagged
/// with any other conversation are silently dropped, and duplicates are
/// keyed out by message id, which also covers the copy of a message this
/// session already appended optimistically at send time.
pub struct ConversationView<H> {
    self_id: i64,
    history: H,
    registry: SubscriptionRegistry,
    state: State,
}

impl<H: HistorySource> ConversationView<H> {
    pub fn new(self_id: i64, history: H) -> Self {
        Self {
            self_id,
            history,
            registry: SubscriptionRegistry::new(),
            state: State::Idle,
        }
    }

    pub fn state(&self) -> ViewState {
        match self.state {
            State::Idle => ViewState::Idle,
            State::Loading { .. } => ViewState::Loading,
            State::Ready { .. } => ViewState::Ready,
        }
    }

    pub fn conversation(&self) -> Option<Conversation> {
        match &self.state {
            State::Idle => None,
            State::Loading { conversation, .. } | State::Ready { conversation, .. } => {
                Some(*conversation)
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        match &self.state {
            State::Ready { messages, .. } => messages,
            _ => &[],
        }
    }

    /// Switch to `conversation`: the previous subscription is replaced in
    /// the same step, so no event from the old conversation can leak into
    /// the new one. Live events arriving from here until the history
    /// lands are buffered.
    pub fn begin_open(&mut self, conversation: Conversation) {
        let subscription = self.registry.subscribe(conversation);
        self.state = State::Loading {
            conversation,
            _subscription: subscription,
            pending: Vec::new(),
        };
    }

    /// Complete a load started by `begin_open`, merging buffered events
    /// into the fetched history. A stale completion (the user has already
    /// switched again) is discarded.
    pub fn finish_open(&mut self, conversation: Conversation, history: Vec<Message>) {
        let state = std::mem::replace(&mut self.state, State::Idle);
        self.state = match state {
            State::Loading {
                conversation: current,
                _subscription,
                pending,
            } if current == conversation => {
                let mut seen: HashSet<i64> = history.iter().map(|m| m.id).collect();
                let mut messages = history;
                for message in pending {
                    if seen.insert(message.id) {
                        messages.push(message);
                    }
                }
                State::Ready {
                    conversation: current,
                    _subscription,
                    messages,
                    seen,
                }
            }
            other => other,
        };
    }

    /// Open and load in one call.
    pub async fn open(&mut self, conversation: Conversation) -> Result<(), ClientError> {
        self.begin_open(conversation);
        let history = self.history.fetch_history(conversation).await?;
        self.finish_open(conversation, history);
        Ok(())
    }

    pub fn close(&mut self) {
        self.state = State::Idle;
    }

    /// Append a message this session just sent, ahead of its live echo.
    pub fn append_local(&mut self, message: Message) {
        if let State::Ready {
            conversation,
            messages,
            seen,
            ..
        } = &mut self.state
        {
            if message.conversation == *conversation && seen.insert(message.id) {
                messages.push(message);
            }
        }
    }

    /// Merge one live event into the view.
    pub fn handle_event(&mut self, event: &ServerEvent) {
        let Some((message, conversation)) = self.message_from_event(event) else {
            return;
        };
        match &mut self.state {
            State::Loading {
                conversation: current,
                pending,
                ..
            } if *current == conversation => {
                pending.push(message);
            }
            State::Ready {
                conversation: current,
                messages,
                seen,
                ..
            } if *current == conversation => {
                if seen.insert(message.id) {
                    messages.push(message);
                }
            }
            _ => {
                tracing::trace!(
                    message_id = message.id,
                    "dropping event for an inactive conversation"
                );
            }
        }
    }

    /// Reconstruct the conversation tag from the wire shape: the group id
    /// when present, otherwise the direct peer as seen from this session
    /// (the other party, whichever direction the message went).
    fn message_from_event(&self, event: &ServerEvent) -> Option<(Message, Conversation)> {
        let ServerEvent::NewMessage {
            id,
            sender_id,
            conversation_id,
            recipient_id,
            text,
            image,
            created_at,
        } = event
        else {
            return None;
        };

        let conversation = match conversation_id {
            Some(group_id) => Conversation::Group {
                group_id: *group_id,
            },
            None => {
                let peer_id = if *sender_id == self.self_id {
                    (*recipient_id)?
                } else {
                    *sender_id
                };
                Conversation::Direct { peer_id }
            }
        };

        let message = Message {
            id: *id,
            sender_id: *sender_id,
            conversation,
            text: text.clone(),
            image: image.clone(),
            created_at: *created_at,
        };
        Some((message, conversation))
    }
}
