//! Two-tier credential lifecycle
//!
//! Data requests carry a short-lived access credential. It is derived from a
//! long-lived session credential; when the session itself is rejected the
//! user has to log in again.

use log::{debug, info, warn};

use super::exchange::{CredentialExchange, Exchange};
use super::login::{CredentialPrompt, Login};
use super::store::{CredentialStore, CredentialTier};
use crate::config::LoginCredentials;
use crate::error::{Error, Result};

/// Which credentials are currently held in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoCredentials,
    HaveSession,
    HaveAccess,
}

/// Owns the credentials and renews them on demand
pub struct SessionManager {
    store: Box<dyn CredentialStore>,
    exchange: Box<dyn CredentialExchange>,
    login: Box<dyn Login>,
    prompt: Box<dyn CredentialPrompt>,
    /// Used for re-login instead of prompting when set
    credentials: Option<LoginCredentials>,
    session: Option<String>,
    access: Option<String>,
}

impl SessionManager {
    /// Create a session manager, picking up any credentials already stored
    ///
    /// An unreadable credential file is treated as absent and re-acquired.
    pub fn new(
        store: Box<dyn CredentialStore>,
        exchange: Box<dyn CredentialExchange>,
        login: Box<dyn Login>,
        prompt: Box<dyn CredentialPrompt>,
    ) -> Self {
        let load = |tier| {
            store.load(tier).unwrap_or_else(|e| {
                warn!("Could not read stored {:?} credential: {}", tier, e);
                None
            })
        };
        let session = load(CredentialTier::Session);
        let access = load(CredentialTier::Access);

        Self {
            store,
            exchange,
            login,
            prompt,
            credentials: None,
            session,
            access,
        }
    }

    /// Use these credentials for re-login instead of prompting
    pub fn with_credentials(mut self, credentials: Option<LoginCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn state(&self) -> SessionState {
        match (&self.session, &self.access) {
            (_, Some(_)) => SessionState::HaveAccess,
            (Some(_), None) => SessionState::HaveSession,
            (None, None) => SessionState::NoCredentials,
        }
    }

    /// Return a usable access credential, renewing it if needed
    ///
    /// Tries the cached access credential, then an exchange of the session
    /// credential, then exactly one re-login.
    pub fn ensure_valid_access(&mut self) -> Result<&str> {
        if self.access.is_none() {
            self.renew()?;
        }
        self.access
            .as_deref()
            .ok_or_else(|| Error::AuthenticationFailed("no access credential".to_string()))
    }

    /// Forget the access credential; the next request renews it
    pub fn invalidate_access(&mut self) -> Result<()> {
        debug!("Invalidating access credential");
        self.access = None;
        self.store.clear(CredentialTier::Access)?;
        Ok(())
    }

    /// Drop both credentials, in memory and in the store
    pub fn logout(&mut self) -> Result<()> {
        self.session = None;
        self.access = None;
        self.store.clear(CredentialTier::Access)?;
        self.store.clear(CredentialTier::Session)?;
        info!("Logged out");
        Ok(())
    }

    fn renew(&mut self) -> Result<()> {
        if let Some(session) = self.session.as_deref() {
            match self.exchange.exchange(session)? {
                Exchange::Granted(access) => {
                    debug!("Exchanged session credential for a new access credential");
                    self.store.save(CredentialTier::Access, &access)?;
                    self.access = Some(access);
                    return Ok(());
                }
                Exchange::Expired => {
                    info!("Session credential expired, logging in again");
                    self.session = None;
                }
            }
        }
        self.relogin()
    }

    fn relogin(&mut self) -> Result<()> {
        let credentials = match self.credentials.clone() {
            Some(c) => c,
            None => self.prompt.prompt()?.ok_or_else(|| {
                Error::AuthenticationFailed("login declined".to_string())
            })?,
        };

        let session = self.login.login(&credentials).map_err(|e| match e {
            Error::AuthenticationFailed(_) => e,
            other => Error::AuthenticationFailed(other.to_string()),
        })?;

        let access = match self.exchange.exchange(&session)? {
            Exchange::Granted(access) => access,
            Exchange::Expired => {
                return Err(Error::AuthenticationFailed(
                    "fresh session credential was rejected".to_string(),
                ));
            }
        };

        // Session first: a crash before the second write is recovered by re-exchange
        self.store.save(CredentialTier::Session, &session)?;
        self.store.save(CredentialTier::Access, &access)?;
        info!("Logged in as {}, credentials saved", credentials.username);

        self.session = Some(session);
        self.access = Some(access);
        Ok(())
    }
}
