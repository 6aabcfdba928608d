/// The secret store CRUD engine.
///
/// A store is a flat file of signed record lines (see [`crate::record`]).
/// Adds append one line; deletes rewrite the whole file through a temp file
/// and an atomic rename so an interrupted rewrite never truncates the store.
/// The symmetric key is rederived from the host fingerprint and the static
/// key material on every operation and dropped when the operation returns.
///
/// There is no inter-process locking: concurrent writers against one file
/// can race, and callers must serialize access externally.
use std::fs::{self, OpenOptions, Permissions};
use std::io::{BufRead, BufReader, Lines, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::crypto::{
    aead, kdf,
    sensitive::{SecretKey, SecretBytes},
};
use crate::error::{Result, VaultError};
use crate::host::{self, HostFingerprint};
use crate::keyfile;
use crate::record::{self, SecretRecord};
use crate::scope::Scope;

/// Everything one operation needs: where the key material and store live,
/// and the identity of the caller. Resolved from a [`Scope`] in production;
/// tests construct it directly with temp paths and a fixed fingerprint.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub key_file: PathBuf,
    pub store_file: PathBuf,
    pub user: String,
    pub fingerprint: HostFingerprint,
}

impl StoreContext {
    pub fn resolve(scope: Scope, store_override: Option<PathBuf>) -> Result<Self> {
        let paths = scope.paths(store_override)?;
        Ok(Self {
            key_file: paths.key_file,
            store_file: paths.store_file,
            user: host::current_user(),
            fingerprint: host::fingerprint()?,
        })
    }

    fn derive_key(&self) -> Result<SecretKey> {
        let material = keyfile::load(&self.key_file)?;
        kdf::derive_key(&self.fingerprint, &material)
    }
}

/// One row of a metadata listing. Secrets stay encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub object: String,
    pub owner: String,
    pub process_id: String,
}

/// Encrypt a secret and append it to the store.
pub fn add(ctx: &StoreContext, object: &str, process_id: &str, secret: &[u8]) -> Result<()> {
    record::validate_object_name(object)?;
    if find_line(&ctx.store_file, object)?.is_some() {
        return Err(VaultError::DuplicateObject(object.to_string()));
    }

    let key = ctx.derive_key()?;
    let ciphertext_hex = aead::seal(secret, &key)?;
    let line = SecretRecord::new(object, &ctx.user, ciphertext_hex, process_id).encode(&key)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(&ctx.store_file)?;
    file.write_all(line.as_bytes())?;

    debug!(object, owner = %ctx.user, "secret stored");
    Ok(())
}

/// Verify, authorize and decrypt one secret.
///
/// Authorization is two checks after the signature verifies: the record's
/// owner must equal the calling user, and the record's process field must
/// equal the sanitized form of the supplied process identifier.
pub fn get(ctx: &StoreContext, object: &str, process_id: &str) -> Result<SecretBytes> {
    let line = find_line(&ctx.store_file, object)?
        .ok_or_else(|| VaultError::ObjectNotFound(object.to_string()))?;

    let key = ctx.derive_key()?;
    let rec = SecretRecord::decode_and_verify(&line, &key)?;

    if rec.owner != ctx.user {
        return Err(VaultError::UnauthorizedUser {
            user: ctx.user.clone(),
            object: object.to_string(),
        });
    }
    if rec.process_id != record::sanitize_process_id(process_id) {
        return Err(VaultError::UnauthorizedProcess(object.to_string()));
    }

    let secret = aead::open_hex(&rec.ciphertext_hex, &key)?;
    debug!(object, "secret read");
    Ok(SecretBytes::new(secret))
}

/// Remove one record owned by the calling user, preserving every other line
/// in its original order.
pub fn delete(ctx: &StoreContext, object: &str) -> Result<()> {
    if !ctx.store_file.exists() {
        return Err(VaultError::ObjectNotFound(object.to_string()));
    }

    let file = fs::File::open(&ctx.store_file)?;
    let mut kept = Vec::new();
    let mut matched_owner = None;
    for line in BufReader::new(file).lines() {
        let line = line?;
        let mut tokens = line.split(' ');
        if tokens.next() == Some(object) {
            matched_owner = Some(tokens.next().unwrap_or_default().to_string());
        } else {
            kept.push(line);
        }
    }

    match matched_owner {
        None => Err(VaultError::ObjectNotFound(object.to_string())),
        Some(owner) if owner != ctx.user => Err(VaultError::PermissionDenied(format!(
            "object {object} is owned by {owner}"
        ))),
        Some(_) => {
            rewrite(&ctx.store_file, &kept)?;
            debug!(object, "secret deleted");
            Ok(())
        }
    }
}

/// Lazily list `(object, owner, process)` for every record, in file order.
///
/// This is a metadata listing: nothing is decrypted and signatures are not
/// verified. Calling it again re-reads the file from the start.
pub fn list(ctx: &StoreContext) -> Result<ListIter> {
    let lines = match fs::File::open(&ctx.store_file) {
        Ok(file) => Some(BufReader::new(file).lines()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    Ok(ListIter { lines })
}

pub struct ListIter {
    lines: Option<Lines<BufReader<fs::File>>>,
}

impl Iterator for ListIter {
    type Item = Result<ListEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lines.as_mut()?.next()? {
            Ok(line) => Some(parse_entry(&line)),
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn parse_entry(line: &str) -> Result<ListEntry> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != record::FIELD_COUNT {
        return Err(VaultError::MalformedRecord(format!(
            "expected {} fields, found {}",
            record::FIELD_COUNT,
            fields.len()
        )));
    }
    Ok(ListEntry {
        object: fields[0].to_string(),
        owner: fields[1].to_string(),
        process_id: record::display_process_id(fields[3]),
    })
}

/// Find the line whose first field token equals `object` exactly.
///
/// Token equality, not substring containment: one object name being a
/// substring of another must not count as a match.
fn find_line(store_file: &Path, object: &str) -> Result<Option<String>> {
    let file = match fs::File::open(store_file) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.split(' ').next() == Some(object) {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

/// Replace the store file contents via temp-file-then-rename in the same
/// directory, so a failure partway through leaves the original intact.
fn rewrite(store_file: &Path, lines: &[String]) -> Result<()> {
    let dir = store_file.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;

    for line in lines {
        tmp.write_all(line.as_bytes())?;
        tmp.write_all(b"\n")?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(store_file).map_err(|e| VaultError::Io(e.error))?;
    fs::set_permissions(store_file, Permissions::from_mode(0o600))?;
    Ok(())
}
