//! Session Core Components
//!
//! Capabilities the session manager consumes: token exchange transport,
//! interactive authorizer and secure store.

pub mod authorizer;
pub mod secure_store;
pub mod transport;

pub use authorizer::*;
pub use secure_store::*;
pub use transport::*;
