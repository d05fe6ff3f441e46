pub mod auth;
pub mod groups;
pub mod messages;
pub mod users;
