/// Argon2id key derivation binding static key material to the host identity.
///
/// Parameters: t=2, m=19 MiB, p=1
/// The key material is the password input and the host fingerprint is the
/// salt. Changing either input changes every derived key and makes existing
/// ciphertexts unrecoverable; the parameters are fixed for the same reason.
use argon2::{Algorithm, Argon2, Params, Version};

use crate::crypto::sensitive::SecretKey;
use crate::error::{Result, VaultError};
use crate::host::HostFingerprint;

const ARGON2_TIME_COST: u32 = 2;
const ARGON2_MEMORY_KIB: u32 = 19_456; // 19 MiB
const ARGON2_PARALLELISM: u32 = 1;

/// Derive the 32-byte symmetric key for one store operation.
///
/// Deterministic: encryption and decryption independently rederive the same
/// key. The result is never persisted.
pub fn derive_key(
    fingerprint: &HostFingerprint,
    key_material: &SecretKey,
) -> Result<SecretKey> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(32),
    )
    .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(key_material.as_bytes(), fingerprint.as_bytes(), &mut output)
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    Ok(SecretKey::new(output))
}
