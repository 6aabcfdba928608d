/// On-disk record codec.
///
/// One secret is one newline-terminated line of five space-separated fields:
///
/// ```text
/// object_name owner_user ciphertext process_id signature
/// ```
///
/// The signature field is the sealed SHA-256 digest of the first four fields
/// joined by single spaces, so a record either verifies wholesale or is
/// rejected wholesale. Tokenization is strict: fields are split on the ASCII
/// space character only, and values that could carry a space are sanitized
/// before they are signed.
use crate::crypto::{aead, hash, sensitive::SecretKey};
use crate::error::{Result, VaultError};

pub const FIELD_COUNT: usize = 5;

/// Reserved byte substituted for whitespace inside process identifiers so a
/// record stays a single space-separated line. Reversed on display.
pub const PROCESS_SPACE_PLACEHOLDER: char = '\u{1f}';

/// The four plaintext fields of one store line.
///
/// `process_id` is held in sanitized form (placeholder bytes, no spaces);
/// use [`SecretRecord::process_display`] to show it to a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub object: String,
    pub owner: String,
    pub ciphertext_hex: String,
    pub process_id: String,
}

impl SecretRecord {
    /// Build a record from caller-supplied values; the process identifier is
    /// sanitized here so it is signed in its stored form.
    pub fn new(object: &str, owner: &str, ciphertext_hex: String, process_id: &str) -> Self {
        Self {
            object: object.to_string(),
            owner: owner.to_string(),
            ciphertext_hex,
            process_id: sanitize_process_id(process_id),
        }
    }

    fn digest(&self) -> [u8; hash::DIGEST_LEN] {
        let signed = format!(
            "{} {} {} {}",
            self.object, self.owner, self.ciphertext_hex, self.process_id
        );
        hash::sha256(signed.as_bytes())
    }

    /// Serialize to one newline-terminated store line, signing the four
    /// plaintext fields under the derived key.
    pub fn encode(&self, key: &SecretKey) -> Result<String> {
        let signature = aead::seal(&self.digest(), key)?;
        Ok(format!(
            "{} {} {} {} {}\n",
            self.object, self.owner, self.ciphertext_hex, self.process_id, signature
        ))
    }

    /// Parse one store line and verify its signature. No field is trusted
    /// until the decrypted signature matches the recomputed digest exactly.
    pub fn decode_and_verify(line: &str, key: &SecretKey) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches('\n').split(' ').collect();
        if fields.len() != FIELD_COUNT {
            return Err(VaultError::MalformedRecord(format!(
                "expected {FIELD_COUNT} fields, found {}",
                fields.len()
            )));
        }

        let record = Self {
            object: fields[0].to_string(),
            owner: fields[1].to_string(),
            ciphertext_hex: fields[2].to_string(),
            process_id: fields[3].to_string(),
        };

        let stored_digest =
            aead::open_hex(fields[4], key).map_err(|_| VaultError::SignatureInvalid)?;
        if stored_digest != record.digest() {
            return Err(VaultError::SignatureInvalid);
        }

        Ok(record)
    }

    /// The process identifier with placeholders mapped back to spaces.
    pub fn process_display(&self) -> String {
        display_process_id(&self.process_id)
    }
}

/// Replace whitespace in a process identifier with the reserved placeholder.
pub fn sanitize_process_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_whitespace() {
                PROCESS_SPACE_PLACEHOLDER
            } else {
                c
            }
        })
        .collect()
}

/// Reverse [`sanitize_process_id`] for display.
pub fn display_process_id(stored: &str) -> String {
    stored.replace(PROCESS_SPACE_PLACEHOLDER, " ")
}

/// Object names become the first token of a line and must survive strict
/// space tokenization.
pub fn validate_object_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c == PROCESS_SPACE_PLACEHOLDER)
    {
        return Err(VaultError::InvalidObjectName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SecretKey {
        SecretKey::new([0x7E; 32])
    }

    fn sample_record() -> SecretRecord {
        SecretRecord::new(
            "mail-password",
            "alice",
            "deadbeef".to_string(),
            "/usr/bin/fetchmail --daemon",
        )
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let key = test_key();
        let line = sample_record().encode(&key).unwrap();
        assert!(line.ends_with('\n'));

        let decoded = SecretRecord::decode_and_verify(&line, &key).unwrap();
        assert_eq!(decoded, sample_record());
    }

    #[test]
    fn test_tampered_owner_rejected() {
        let key = test_key();
        let line = sample_record().encode(&key).unwrap();
        let forged = line.replacen("alice", "mallory", 1);

        assert!(matches!(
            SecretRecord::decode_and_verify(&forged, &key),
            Err(VaultError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let key = test_key();
        let line = sample_record().encode(&key).unwrap();
        // Corrupt the final hex digit of the signature field.
        let mut forged = line.trim_end().to_string();
        let last = forged.pop().unwrap();
        forged.push(if last == '0' { '1' } else { '0' });

        assert!(matches!(
            SecretRecord::decode_and_verify(&forged, &key),
            Err(VaultError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_wrong_field_count_rejected() {
        assert!(matches!(
            SecretRecord::decode_and_verify("only three fields", &test_key()),
            Err(VaultError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let line = sample_record().encode(&test_key()).unwrap();
        let other = SecretKey::new([0x7F; 32]);

        assert!(matches!(
            SecretRecord::decode_and_verify(&line, &other),
            Err(VaultError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_process_id_spaces_roundtrip() {
        let record = sample_record();
        assert!(!record.process_id.contains(' '));
        assert_eq!(record.process_display(), "/usr/bin/fetchmail --daemon");
    }

    #[test]
    fn test_record_with_spaced_process_stays_five_fields() {
        let key = test_key();
        let line = sample_record().encode(&key).unwrap();
        assert_eq!(line.trim_end().split(' ').count(), FIELD_COUNT);
    }

    #[test]
    fn test_validate_object_name() {
        assert!(validate_object_name("db-password").is_ok());
        assert!(validate_object_name("").is_err());
        assert!(validate_object_name("two words").is_err());
        assert!(validate_object_name("tab\tname").is_err());
        assert!(validate_object_name("ph\u{1f}older").is_err());
    }
}
