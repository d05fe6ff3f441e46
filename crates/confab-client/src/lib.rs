pub mod subscription;
pub mod view;

pub use subscription::{Subscription, SubscriptionRegistry};
pub use view::{ConversationView, HistorySource, ViewState};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("history fetch failed: {0}")]
    History(String),
}
