use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use confab_models::Conversation;

/// Tracks which conversation's live stream this session is watching.
///
/// At most one subscription is active: subscribing replaces the previous
/// one in the same step, so there is no window where events from the old
/// conversation can still land while the new one is attached. Guards
/// release on drop; a superseded guard's drop leaves the active
/// subscription untouched, which makes re-subscribing safe on any path.
#[derive(Default, Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    active: Mutex<Option<(u64, Conversation)>>,
}

pub struct Subscription {
    registry: SubscriptionRegistry,
    id: u64,
    pub conversation: Conversation,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, conversation: Conversation) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active = Some((id, conversation));
        Subscription {
            registry: self.clone(),
            id,
            conversation,
        }
    }

    pub fn active(&self) -> Option<Conversation> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|(_, conversation)| conversation)
    }

    pub fn is_current(&self, subscription: &Subscription) -> bool {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|(id, _)| id == subscription.id)
            .unwrap_or(false)
    }

    fn release(&self, id: u64) {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if active.map(|(current, _)| current == id).unwrap_or(false) {
            *active = None;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: Conversation = Conversation::Direct { peer_id: 1 };
    const Y: Conversation = Conversation::Group { group_id: 2 };

    #[test]
    fn subscribe_replaces_the_previous_subscription() {
        let registry = SubscriptionRegistry::new();
        let first = registry.subscribe(X);
        let second = registry.subscribe(Y);

        assert_eq!(registry.active(), Some(Y));
        assert!(!registry.is_current(&first));
        assert!(registry.is_current(&second));

        // The superseded guard's drop must not clear the active slot.
        drop(first);
        assert_eq!(registry.active(), Some(Y));

        drop(second);
        assert_eq!(registry.active(), None);
    }

    #[test]
    fn double_subscribe_to_the_same_conversation_is_safe() {
        let registry = SubscriptionRegistry::new();
        let first = registry.subscribe(X);
        let second = registry.subscribe(X);

        drop(first);
        assert_eq!(registry.active(), Some(X));
        assert!(registry.is_current(&second));
    }
}
