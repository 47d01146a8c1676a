//! Durable storage for the two credential tiers
//!
//! Each tier is stored and overwritten on its own, so a crash between two
//! writes leaves at worst a fresh session next to a stale access token,
//! which the session manager recovers from by re-exchanging.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Which credential a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialTier {
    /// Long-lived credential obtained by logging in
    Session,
    /// Short-lived bearer token derived from the session
    Access,
}

impl CredentialTier {
    fn filename(&self) -> &'static str {
        match self {
            CredentialTier::Session => "session.tok",
            CredentialTier::Access => "access.tok",
        }
    }
}

/// Trait for credential persistence
pub trait CredentialStore {
    /// Load a stored credential, `None` if it was never saved or was cleared
    fn load(&self, tier: CredentialTier) -> Result<Option<String>>;

    /// Overwrite a stored credential
    fn save(&self, tier: CredentialTier, value: &str) -> Result<()>;

    /// Remove a stored credential
    fn clear(&self, tier: CredentialTier) -> Result<()>;
}

/// Stores each credential as a plain-text file
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Store credentials in the Nuvola config directory
    pub fn new() -> Result<Self> {
        let dir = config::config_dir().context("Could not determine config directory")?;
        Ok(Self { dir })
    }

    /// Store credentials in an explicit directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, tier: CredentialTier) -> PathBuf {
        self.dir.join(tier.filename())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, tier: CredentialTier) -> Result<Option<String>> {
        let value = config::load_text_file(&self.path(tier))?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    fn save(&self, tier: CredentialTier, value: &str) -> Result<()> {
        config::save_text_file(&self.path(tier), value)
    }

    fn clear(&self, tier: CredentialTier) -> Result<()> {
        config::remove_file(&self.path(tier))
    }
}

/// In-memory credential store
///
/// Clones share the same values, so a test can keep a handle on a store
/// it handed to a session manager.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    values: Rc<RefCell<HashMap<CredentialTier, String>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given credentials
    pub fn with(session: Option<&str>, access: Option<&str>) -> Self {
        let store = Self::new();
        {
            let mut values = store.values.borrow_mut();
            if let Some(s) = session {
                values.insert(CredentialTier::Session, s.to_string());
            }
            if let Some(a) = access {
                values.insert(CredentialTier::Access, a.to_string());
            }
        }
        store
    }

    /// Current value of a tier
    pub fn get(&self, tier: CredentialTier) -> Option<String> {
        self.values.borrow().get(&tier).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, tier: CredentialTier) -> Result<Option<String>> {
        Ok(self.get(tier))
    }

    fn save(&self, tier: CredentialTier, value: &str) -> Result<()> {
        self.values.borrow_mut().insert(tier, value.to_string());
        Ok(())
    }

    fn clear(&self, tier: CredentialTier) -> Result<()> {
        self.values.borrow_mut().remove(&tier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_tiers_are_independent() {
        let tmp = TempDir::new().unwrap();
        let store = FileCredentialStore::in_dir(tmp.path());

        store.save(CredentialTier::Session, "sess-1").unwrap();
        assert_eq!(store.load(CredentialTier::Session).unwrap().as_deref(), Some("sess-1"));
        assert_eq!(store.load(CredentialTier::Access).unwrap(), None);

        store.save(CredentialTier::Access, "acc-1").unwrap();
        store.clear(CredentialTier::Session).unwrap();
        assert_eq!(store.load(CredentialTier::Session).unwrap(), None);
        assert_eq!(store.load(CredentialTier::Access).unwrap().as_deref(), Some("acc-1"));
    }

    #[test]
    fn test_file_store_overwrites_wholesale() {
        let tmp = TempDir::new().unwrap();
        let store = FileCredentialStore::in_dir(tmp.path());

        store.save(CredentialTier::Access, "a-much-longer-first-token").unwrap();
        store.save(CredentialTier::Access, "short").unwrap();
        assert_eq!(store.load(CredentialTier::Access).unwrap().as_deref(), Some("short"));
    }

    #[test]
    fn test_empty_file_counts_as_absent() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("session.tok"), "\n").unwrap();
        let store = FileCredentialStore::in_dir(tmp.path());
        assert_eq!(store.load(CredentialTier::Session).unwrap(), None);
    }

    #[test]
    fn test_memory_store_clones_share_values() {
        let store = MemoryCredentialStore::with(Some("s"), None);
        let handle = store.clone();
        store.save(CredentialTier::Access, "a").unwrap();
        assert_eq!(handle.get(CredentialTier::Access).as_deref(), Some("a"));
        assert_eq!(handle.get(CredentialTier::Session).as_deref(), Some("s"));
    }
}
