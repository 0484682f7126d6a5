//! Credential and token lifecycle for copilot-relay.
//!
//! A long-lived GitHub token (the [`Credential`]) is exchanged for a
//! short-lived Copilot token (the [`AccessToken`]). [`TokenManager`] owns the
//! current access token and refreshes it lazily, with concurrent callers
//! sharing a single in-flight exchange.

pub mod credential;
pub mod device_flow;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod token_file;
pub mod token_manager;

pub use credential::{Credential, CredentialStore, RelayFlags};
pub use device_flow::{poll_for_token, start_device_flow, DeviceCodeResponse, DeviceFlowConfig};
pub use error::{AuthError, Result};
pub use exchange::{ExchangedToken, GithubTokenExchanger, TokenExchanger};
pub use token_file::GithubTokenFile;
pub use token_manager::{AccessToken, RefreshHandle, TokenManager};

pub use secrecy;
