//! Session Types
//!
//! Core type definitions for the session lifecycle.

pub mod callback;
pub mod config;
pub mod session;
pub mod token;

pub use callback::*;
pub use config::*;
pub use session::*;
pub use token::*;
