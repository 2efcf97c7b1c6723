//! Session Management
//!
//! Session persistence and the token lifecycle manager.

pub mod manager;
pub mod storage;

pub use manager::TokenLifecycleManager;
pub use storage::SessionStore;
