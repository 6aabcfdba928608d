/// Scope resolution: system-wide vs per-user install directories.
///
/// Scope is resolved once at the edge and handed into every operation as an
/// explicit value, so tests can substitute arbitrary paths.
use std::path::PathBuf;

use crate::error::{Result, VaultError};

pub const KEY_FILE_NAME: &str = "key.pem";
pub const STORE_FILE_NAME: &str = "password";

const SYSTEM_DIR: &str = "/usr/local/hostvault";
const USER_DIR: &str = ".hostvault";
const PRIVILEGED_USER: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One privileged store for the whole host.
    System,
    /// A store under the invoking user's home directory.
    User,
}

/// Resolved filesystem locations for one scope.
#[derive(Debug, Clone)]
pub struct ScopePaths {
    pub dir: PathBuf,
    pub key_file: PathBuf,
    pub store_file: PathBuf,
}

impl Scope {
    /// Resolve the key file and store file for this scope, with an optional
    /// caller-supplied store file override.
    pub fn paths(self, store_override: Option<PathBuf>) -> Result<ScopePaths> {
        let dir = match self {
            Scope::System => PathBuf::from(SYSTEM_DIR),
            Scope::User => dirs::home_dir()
                .ok_or_else(|| {
                    VaultError::PermissionDenied("cannot resolve home directory".into())
                })?
                .join(USER_DIR),
        };

        let key_file = dir.join(KEY_FILE_NAME);
        let store_file = store_override.unwrap_or_else(|| dir.join(STORE_FILE_NAME));

        Ok(ScopePaths {
            dir,
            key_file,
            store_file,
        })
    }

    /// Whether the named user may initialize this scope.
    pub fn may_initialize(self, user: &str) -> bool {
        match self {
            Scope::System => user == PRIVILEGED_USER,
            Scope::User => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_scope_paths() {
        let paths = Scope::User.paths(None).unwrap();
        assert!(paths.dir.ends_with(USER_DIR));
        assert_eq!(paths.key_file, paths.dir.join(KEY_FILE_NAME));
        assert_eq!(paths.store_file, paths.dir.join(STORE_FILE_NAME));
    }

    #[test]
    fn test_store_override() {
        let custom = PathBuf::from("/tmp/alt-store");
        let paths = Scope::User.paths(Some(custom.clone())).unwrap();
        assert_eq!(paths.store_file, custom);
        // The key file stays in the scope directory regardless.
        assert_eq!(paths.key_file, paths.dir.join(KEY_FILE_NAME));
    }

    #[test]
    fn test_system_scope_is_privileged() {
        assert!(Scope::System.may_initialize("root"));
        assert!(!Scope::System.may_initialize("alice"));
        assert!(Scope::User.may_initialize("alice"));
    }
}
