//! Authentication
//!
//! This module provides:
//! - Credential persistence (`CredentialStore`)
//! - The session-to-access exchange
//! - Login and prompt collaborators for re-login
//! - `SessionManager`, which ties them into one state machine

mod exchange;
mod login;
mod session;
mod store;

pub use exchange::{CredentialExchange, Exchange, HttpCredentialExchange};
pub use login::{CredentialPrompt, FormLogin, Login, LoginOptions, TerminalPrompt};
pub use session::{SessionManager, SessionState};
pub use store::{CredentialStore, CredentialTier, FileCredentialStore, MemoryCredentialStore};
