pub mod alias;
pub mod auth;
pub mod guest_identity;
pub mod memory_store;
pub mod pg_store;
pub mod relay;
pub mod store;
pub mod unread;
