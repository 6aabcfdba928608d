use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Host identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Store is not initialized - run 'hostvault init' first")]
    NotInitialized,

    #[error("Store has already been initialized")]
    AlreadyInitialized,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Object {0} already exists")]
    DuplicateObject(String),

    #[error("Object {0} does not exist")]
    ObjectNotFound(String),

    #[error("Invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("Signature verification failed - record corrupted")]
    SignatureInvalid,

    #[error("Decryption failed: wrong key or tampered data")]
    AuthenticationFailed,

    #[error("User {user} is not authorized to read {object}")]
    UnauthorizedUser { user: String, object: String },

    #[error("Process is not authorized to read {0}")]
    UnauthorizedProcess(String),

    #[error("Length of data is insufficient")]
    InputTooShort,

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
