/// Host identity resolution.
///
/// The fingerprint is the SHA-256 of a stable platform identifier: the dbus
/// machine id on Linux, the IOPlatformUUID on macOS. It binds derived keys
/// to one machine; a reinstall or hardware UUID change orphans every secret.
/// Recomputed on each key derivation, never persisted, never cached.
use crate::crypto::hash;
use crate::error::{Result, VaultError};

/// 32-byte hash of the platform identifier string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFingerprint([u8; 32]);

impl HostFingerprint {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Resolve the fingerprint of the machine this process runs on.
pub fn fingerprint() -> Result<HostFingerprint> {
    let identifier = platform_identifier()?;
    Ok(HostFingerprint::new(hash::sha256(identifier.as_bytes())))
}

/// Name of the OS user invoking this process.
pub fn current_user() -> String {
    whoami::username()
}

#[cfg(target_os = "linux")]
fn platform_identifier() -> Result<String> {
    const MACHINE_ID_PATHS: [&str; 2] = ["/var/lib/dbus/machine-id", "/etc/machine-id"];

    for path in MACHINE_ID_PATHS {
        if let Ok(id) = std::fs::read_to_string(path) {
            let id = id.trim();
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
    }
    Err(VaultError::IdentityUnavailable(
        "no readable machine-id file".into(),
    ))
}

#[cfg(target_os = "macos")]
fn platform_identifier() -> Result<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .map_err(|e| VaultError::IdentityUnavailable(format!("ioreg: {e}")))?;

    if !output.status.success() {
        return Err(VaultError::IdentityUnavailable(
            "ioreg exited with failure".into(),
        ));
    }

    // Line of interest: `"IOPlatformUUID" = "XXXXXXXX-..."`
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|line| line.contains("IOPlatformUUID"))
        .and_then(|line| line.split('"').nth(3))
        .map(str::to_string)
        .ok_or_else(|| {
            VaultError::IdentityUnavailable("IOPlatformUUID missing from ioreg output".into())
        })
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_identifier() -> Result<String> {
    Err(VaultError::IdentityUnavailable(
        "unsupported platform".into(),
    ))
}
