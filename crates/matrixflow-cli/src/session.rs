//! Persisted login session.
//!
//! `matrixflow login` writes the bearer token issued by the backend to a small
//! JSON file; later invocations read it back unless `--token` is supplied. The
//! session remembers the API URL it was issued for and is ignored when pointed
//! at a different backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_DIR: &str = "matrixflow";
const SESSION_FILE: &str = "session.json";

/// Token and metadata stored after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) token: String,
    pub(crate) username: String,
    pub(crate) api_url: String,
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expires_at: Option<String>,
}

/// Failures while reading or writing the session file.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("failed to read session file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write session file {}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("session file {} is corrupt", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode session")]
    Encode { source: serde_json::Error },
}

/// Location of the session file.
#[derive(Debug, Clone)]
pub(crate) struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub(crate) const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Use `explicit` when given, otherwise the per-user config directory.
    pub(crate) fn resolve(explicit: Option<PathBuf>) -> Option<Self> {
        explicit
            .or_else(|| dirs::config_dir().map(|dir| dir.join(SESSION_DIR).join(SESSION_FILE)))
            .map(Self::new)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session; a missing file is not an error.
    pub(crate) fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| SessionError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Write `session`, creating parent directories as needed.
    pub(crate) fn save(&self, session: &Session) -> Result<(), SessionError> {
        let payload = serde_json::to_string_pretty(session)
            .map_err(|source| SessionError::Encode { source })?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }
        fs::write(&self.path, payload).map_err(|source| self.write_error(source))?;
        restrict_permissions(&self.path).map_err(|source| self.write_error(source))
    }

    /// Remove the session file. Returns `false` when there was nothing to remove.
    pub(crate) fn clear(&self) -> Result<bool, SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.write_error(source)),
        }
    }

    fn write_error(&self, source: io::Error) -> SessionError {
        SessionError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Pick the bearer token: an explicit flag wins, then a stored session issued
/// for the same API URL.
pub(crate) fn resolve_token(
    explicit: Option<String>,
    store: Option<&SessionStore>,
    api_url: &str,
) -> Option<String> {
    if let Some(token) = explicit
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return Some(token);
    }

    let store = store?;
    match store.load() {
        Ok(Some(session)) if session.api_url == api_url => Some(session.token),
        Ok(Some(session)) => {
            tracing::debug!(
                stored = %session.api_url,
                requested = %api_url,
                "ignoring session issued for a different API URL"
            );
            None
        }
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %store.path().display(),
                "ignoring unreadable session file"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn sample_session(api_url: &str) -> Session {
        Session {
            token: "tok-123".to_string(),
            username: "ops".to_string(),
            api_url: api_url.to_string(),
            created_at: Utc::now(),
            expires_at: Some("2026-12-31T00:00:00Z".to_string()),
        }
    }

    #[test]
    fn save_load_and_clear_session() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load()?, None);
        let session = sample_session("http://127.0.0.1:4000/");
        store.save(&session)?;
        assert_eq!(store.load()?, Some(session));

        assert!(store.clear()?);
        assert!(!store.clear()?);
        assert_eq!(store.load()?, None);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn saved_session_is_owner_only() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample_session("http://backend/"))?;
        let mode = fs::metadata(store.path())?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn corrupt_session_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json")?;
        let store = SessionStore::new(path);
        assert!(matches!(store.load(), Err(SessionError::Parse { .. })));
        Ok(())
    }

    #[test]
    fn explicit_token_wins_over_session() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample_session("http://backend/"))?;

        assert_eq!(
            resolve_token(Some(" flag-token ".into()), Some(&store), "http://backend/"),
            Some("flag-token".to_string())
        );
        assert_eq!(
            resolve_token(Some("   ".into()), Some(&store), "http://backend/"),
            Some("tok-123".to_string())
        );
        Ok(())
    }

    #[test]
    fn session_for_other_backend_is_ignored() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample_session("http://backend-a/"))?;
        assert_eq!(resolve_token(None, Some(&store), "http://backend-b/"), None);
        assert_eq!(resolve_token(None, None, "http://backend-a/"), None);
        Ok(())
    }

    #[test]
    fn resolve_prefers_explicit_path() {
        let explicit = PathBuf::from("/tmp/custom-session.json");
        let store = SessionStore::resolve(Some(explicit.clone())).expect("explicit path");
        assert_eq!(store.path(), explicit.as_path());
    }
}
