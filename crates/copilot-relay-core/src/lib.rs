//! Shared building blocks for copilot-relay.
//!
//! Everything in here is process-wide input: the configuration file schema,
//! the rate-limit policy and account tier derived from it, and the handful of
//! filesystem helpers the other crates use to persist state.

pub mod atomic_write;
pub mod config;
pub mod paths;
pub mod policy;

pub use atomic_write::{atomic_write, atomic_write_secure};
pub use config::*;
pub use policy::{AccountType, ParseAccountTypeError, RateLimitPolicy};

pub const APP_NAME: &str = "copilot-relay";
