//! Widget-side state machine: credential persistence, the optimistic thread
//! snapshot, and the polling scheduler that keeps both fresh.

pub mod credentials;
pub mod poller;
pub mod thread_state;
