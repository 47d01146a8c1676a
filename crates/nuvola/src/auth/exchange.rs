//! Session-to-access credential exchange

use serde::Deserialize;

use crate::error::Result;
use crate::remote::{API_PREFIX, Credential, Transport};

/// Outcome of presenting a session credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The session is valid; here is a fresh access credential
    Granted(String),
    /// The session credential is no longer accepted
    Expired,
}

/// Turns a session credential into an access credential
pub trait CredentialExchange {
    fn exchange(&self, session: &str) -> Result<Exchange>;
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Exchange through the `login-from-web` endpoint
pub struct HttpCredentialExchange<T: Transport> {
    transport: T,
    cookie_name: String,
}

impl<T: Transport> HttpCredentialExchange<T> {
    pub fn new(transport: T, cookie_name: impl Into<String>) -> Self {
        Self {
            transport,
            cookie_name: cookie_name.into(),
        }
    }

    fn path() -> String {
        format!("{}/login-from-web", API_PREFIX)
    }
}

impl<T: Transport> CredentialExchange for HttpCredentialExchange<T> {
    fn exchange(&self, session: &str) -> Result<Exchange> {
        let credential = Credential::Cookie {
            name: self.cookie_name.clone(),
            value: session.to_string(),
        };
        let reply = self.transport.get(&Self::path(), &credential)?;

        // Anything but a JSON body carrying a token means the session is dead
        let token = serde_json::from_str::<TokenResponse>(&reply.body)
            .ok()
            .and_then(|r| r.token)
            .filter(|t| !t.is_empty());

        Ok(match token {
            Some(token) if (200..300).contains(&reply.status) => Exchange::Granted(token),
            _ => Exchange::Expired,
        })
    }
}
