//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while deriving identities and talking to the
//! username registry.

use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// Bad salt given to the key derivation function. Salts are exactly
    /// [`SALT_LEN`][crate::crypto::SALT_LEN] bytes, always.
    #[error("incorrect salt given for key derivation")]
    CryptoBadSalt,

    /// Could not derive a seed from a password.
    #[error("key derivation from password failed")]
    CryptoKdfFailed,

    /// A signature failed to verify.
    #[error("the given signature/public key/data combo does not verify")]
    CryptoSignatureVerificationFailed,

    /// An error while decoding base64 data.
    #[error("base64 decoding error")]
    DeserializeBase64(#[from] base64::DecodeError),

    /// A registry entry failed validation at the registry boundary. The store
    /// replicates whatever its peers hand it, so a malformed entry is corrupt
    /// data, not a caller bug.
    #[error("registry entry is corrupt: {0}")]
    EntryCorrupt(&'static str),

    /// The derived key does not match the registered key. Does not say
    /// whether the username or the password was at fault.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An empty password was given. We refuse to derive an identity from
    /// nothing at all.
    #[error("password cannot be empty")]
    PasswordEmpty,

    /// The registry collaborator could not service the request (I/O failure,
    /// connectivity loss, or not yet initialized).
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Login was attempted against a username with no registry entry.
    #[error("username not found")]
    UsernameNotFound,

    /// Registration hit an existing entry, or lost the claim race to a
    /// concurrent writer. Callers cannot tell the two cases apart.
    #[error("username is already taken")]
    UsernameTaken,
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
