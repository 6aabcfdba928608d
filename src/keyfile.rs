/// Static key material storage.
///
/// 32 random bytes generated once at init and written to the scope's
/// `key.pem` with owner-only permissions. The file is one of the two inputs
/// to key derivation; its loss makes every secret in the scope permanently
/// undecryptable. It is never regenerated automatically.
use std::fs::{self, OpenOptions, Permissions};
use std::io::{Read, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use rand::RngCore;
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::sensitive::SecretKey;
use crate::error::{Result, VaultError};
use crate::scope::{Scope, ScopePaths};

pub const KEY_MATERIAL_LEN: usize = 32;

/// Generate key material for a scope. Fails if the scope already has a key
/// file, or if the caller may not initialize the scope.
pub fn initialize(scope: Scope, paths: &ScopePaths, user: &str) -> Result<()> {
    if !scope.may_initialize(user) {
        return Err(VaultError::PermissionDenied(format!(
            "user {user} cannot initialize the system-wide scope"
        )));
    }
    if is_initialized(&paths.key_file) {
        return Err(VaultError::AlreadyInitialized);
    }

    fs::create_dir_all(&paths.dir)?;
    fs::set_permissions(&paths.dir, Permissions::from_mode(0o700))?;

    let mut material = [0u8; KEY_MATERIAL_LEN];
    rand::rngs::OsRng.fill_bytes(&mut material);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&paths.key_file)?;
    file.write_all(&material)?;
    material.zeroize();

    debug!(path = %paths.key_file.display(), "key material written");
    Ok(())
}

/// Load the 32 bytes of static key material for a scope.
pub fn load(key_file: &Path) -> Result<SecretKey> {
    let mut file = fs::File::open(key_file).map_err(|_| VaultError::NotInitialized)?;

    let mut material = [0u8; KEY_MATERIAL_LEN];
    file.read_exact(&mut material)
        .map_err(|_| VaultError::NotInitialized)?;

    let key = SecretKey::new(material);
    material.zeroize();
    Ok(key)
}

pub fn is_initialized(key_file: &Path) -> bool {
    key_file.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scope_paths(dir: &Path) -> ScopePaths {
        ScopePaths {
            dir: dir.to_path_buf(),
            key_file: dir.join("key.pem"),
            store_file: dir.join("password"),
        }
    }

    #[test]
    fn test_initialize_writes_key_material() {
        let dir = tempdir().unwrap();
        let paths = scope_paths(&dir.path().join("vault"));

        assert!(!is_initialized(&paths.key_file));
        initialize(Scope::User, &paths, "alice").unwrap();
        assert!(is_initialized(&paths.key_file));

        let material = load(&paths.key_file).unwrap();
        assert_eq!(material.as_bytes().len(), KEY_MATERIAL_LEN);

        let mode = fs::metadata(&paths.key_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let paths = scope_paths(dir.path());

        initialize(Scope::User, &paths, "alice").unwrap();
        assert!(matches!(
            initialize(Scope::User, &paths, "alice"),
            Err(VaultError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_system_scope_requires_privileged_user() {
        let dir = tempdir().unwrap();
        let paths = scope_paths(dir.path());

        assert!(matches!(
            initialize(Scope::System, &paths, "alice"),
            Err(VaultError::PermissionDenied(_))
        ));
        assert!(!is_initialized(&paths.key_file));
    }

    #[test]
    fn test_load_missing_key_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("key.pem")),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn test_load_truncated_key_file() {
        let dir = tempdir().unwrap();
        let key_file = dir.path().join("key.pem");
        fs::write(&key_file, [0u8; 7]).unwrap();

        assert!(matches!(load(&key_file), Err(VaultError::NotInitialized)));
    }

    #[test]
    fn test_material_is_stable_across_loads() {
        let dir = tempdir().unwrap();
        let paths = scope_paths(dir.path());
        initialize(Scope::User, &paths, "alice").unwrap();

        let m1 = load(&paths.key_file).unwrap();
        let m2 = load(&paths.key_file).unwrap();
        assert_eq!(m1.as_bytes(), m2.as_bytes());
    }
}
