//! Session persistence on local disk.

use super::error::{AuthError, Result};
use super::session::Session;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads and writes the session file. A missing or unreadable file is never
/// fatal; it just means starting without cookies.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    session_domains: Vec<String>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, session_domains: Vec<String>) -> Self {
        Self {
            path: path.into(),
            session_domains,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, keeping only unexpired cookies that belong
    /// to one of the session domains.
    pub fn load(&self) -> Session {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session");
                return Session::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read stored session");
                return Session::default();
            }
        };

        let mut session: Session = match serde_json::from_slice(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
                return Session::default();
            }
        };

        let total = session.cookie_count();
        session.retain_in_scope(&self.session_domains);

        debug!(
            path = %self.path.display(),
            loaded = session.cookie_count(),
            discarded = total - session.cookie_count(),
            "Loaded stored session"
        );
        session
    }

    /// Write atomically through a temporary sibling file.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(AuthError::Store)?;
        }

        let json = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(AuthError::Store)?;
        fs::rename(&tmp, &self.path).map_err(AuthError::Store)?;

        info!(
            path = %self.path.display(),
            cookies = session.cookie_count(),
            has_token = session.token.is_some(),
            "Saved session"
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Store(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(
            dir.path().join("session.json"),
            vec![".uscourts.gov".to_string()],
        )
    }

    #[test]
    fn test_missing_file_is_empty_session() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        let session = store.load();
        assert_eq!(session.cookie_count(), 0);
        assert!(session.token.is_none());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        fs::write(store.path(), b"{not json").unwrap();
        let session = store.load();
        assert_eq!(session.cookie_count(), 0);
        assert!(session.token.is_none());
    }

    #[test]
    fn test_save_and_load_filters() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        let mut session = Session::default();
        session.insert_cookie("PacerSession", "good", ".uscourts.gov");
        session.insert_cookie("PacerUser", "other", "example.com");
        session.set_token("tok".into(), Utc::now());
        store.save(&session).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.cookie_count(), 1);
        assert_eq!(loaded.cookie_value("PacerSession"), Some("good"));
        assert_eq!(loaded.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_save_creates_parent_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("nested/s.json"), vec![]);
        store.save(&Session::default()).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }
}
