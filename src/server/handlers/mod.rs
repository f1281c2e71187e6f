pub mod admin;
pub mod guest;
pub mod messages;
