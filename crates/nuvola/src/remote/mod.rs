//! Remote API access
//!
//! This module provides:
//! - The transport seam (`Transport`) and its ureq implementation
//! - The authenticated client that renews expired access tokens

mod client;
mod transport;

pub use client::{RemoteClient, StudentScope, attachment_path};
pub use transport::UreqTransport;

use crate::error::Result;

/// Path prefix of the student API
pub const API_PREFIX: &str = "/api-studente/v1";

/// Literal body the remote sends instead of data when a request fails
pub const ERROR_SENTINEL: &str = "Errore";

/// How a request proves who is asking
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Cookie: <name>=<value>`
    Cookie { name: String, value: String },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Credential::Cookie { name, .. } => write!(f, "Cookie({}=<redacted>)", name),
        }
    }
}

/// Raw HTTP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Issues GET requests against the remote
///
/// Non-2xx statuses are returned as replies, not errors; only failures to
/// complete the request at all are errors.
pub trait Transport {
    fn get(&self, path: &str, credential: &Credential) -> Result<Reply>;
}
