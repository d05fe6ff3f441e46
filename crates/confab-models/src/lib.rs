pub mod conversation;
pub mod gateway;
pub mod group;
pub mod message;
pub mod user;

pub use conversation::Conversation;
pub use gateway::{ClientEvent, ServerEvent};
pub use group::{Group, GroupWithMembers};
pub use message::Message;
pub use user::User;
