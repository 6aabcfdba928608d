/// ChaCha20-Poly1305 sealing of secret values and record signatures.
///
/// Sealed format: hex(nonce(12) || ciphertext || tag(16)), no associated
/// data. Each seal draws a fresh random nonce; the 96-bit nonce space is
/// large enough for this store's expected record volume.
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use crate::crypto::sensitive::SecretKey;
use crate::error::{Result, VaultError};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

/// Encrypt plaintext under the derived key and hex-encode the result.
pub fn seal(plaintext: &[u8], key: &SecretKey) -> Result<String> {
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(hex::encode(sealed))
}

/// Decrypt `nonce || ciphertext || tag` bytes under the derived key.
pub fn open(sealed: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(VaultError::InputTooShort);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| VaultError::AuthenticationFailed)
}

/// Decrypt a hex-encoded sealed value, as stored in a record field.
pub fn open_hex(sealed_hex: &str, key: &SecretKey) -> Result<Vec<u8>> {
    let sealed = hex::decode(sealed_hex)
        .map_err(|e| VaultError::MalformedRecord(format!("invalid hex: {e}")))?;
    open(&sealed, key)
}
