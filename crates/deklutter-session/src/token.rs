//! Session token persistence.
//!
//! # Design
//! - A single opaque token is active at a time; its absence is the only
//!   "not authenticated" signal.
//! - Storage failures are logged and read as "no token" so the caller falls
//!   back to the unauthenticated entry point instead of failing.

use std::fmt::{self, Debug, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the single persisted entry holding the raw token.
pub const TOKEN_KEY: &str = "deklutter_token";

/// Opaque bearer credential issued by the mailbox service.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token exactly as issued. Blank input is not a token.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for SessionToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("SessionToken(<redacted>)")
    }
}

/// Persistence for the single active session token.
pub trait TokenStore: Send + Sync {
    /// Persist `token`, replacing any previous value.
    fn save(&self, token: &SessionToken);
    /// Read the persisted token, if any.
    fn load(&self) -> Option<SessionToken>;
    /// Remove the persisted token. Clearing an empty store is a no-op.
    fn clear(&self);
}

/// File-backed store: one file named [`TOKEN_KEY`] inside a state directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_KEY),
        }
    }

    /// Default per-user state directory (`<data_local_dir>/deklutter`).
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("deklutter"))
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, token: &SessionToken) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token.expose())?;
        restrict_permissions(&self.path)
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

impl TokenStore for FileTokenStore {
    fn save(&self, token: &SessionToken) {
        if let Err(err) = self.write(token) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to persist session token"
            );
        }
    }

    fn load(&self) -> Option<SessionToken> {
        match fs::read_to_string(&self.path) {
            // A hand-edited file may end with a newline; `save` never writes one.
            Ok(raw) => SessionToken::new(raw.trim_end_matches(['\r', '\n'])),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "session token unreadable; treating as signed out"
                );
                None
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove session token"
                );
            }
        }
    }
}

/// In-process store for embedders and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<SessionToken>>,
}

impl MemoryTokenStore {
    /// Store pre-seeded with `token`.
    #[must_use]
    pub fn with_token(token: SessionToken) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &SessionToken) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(token.clone());
        }
    }

    fn load(&self) -> Option<SessionToken> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}
