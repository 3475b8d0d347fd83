//! The identity protocol: registration, login, logout.
//!
//! Every operation here is a self-contained transaction against an injected
//! [`Registry`] handle. There is no session state machine; whatever state a
//! successful call produces lives in the returned [`IdentityState`], which
//! the caller keeps for the session and drops on logout.
//!
//! Correctness of `register` under concurrency does not come from its own
//! lookup-then-claim sequence; between those two steps another writer can
//! always slip in, on this replica or a partitioned one. It comes entirely
//! from the registry's `claim` being an atomic check-and-commit within its
//! replica, plus deterministic first-write-wins convergence across replicas.
//! The early lookup exists only to fail fast with a friendlier round trip.
//!
//! Cancellation is the caller's business: wrap an operation future in a
//! timeout if you want one. A dropped future leaves nothing behind locally;
//! derived keys are plain values that drop with it. Whether a claim that was
//! already in flight lands on the network side is an external matter this
//! protocol never rolls back.

use crate::{
    crypto::{self, SignKeypair},
    error::{Error, Result},
    registry::{Registry, RegistryEntry},
    util::{ser, Timestamp},
};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use tracing::debug;

/// Session-local identity state: what you hold while logged in.
///
/// Never persisted anywhere. Re-deriving from credentials is the only
/// recovery path, which is the entire point of a brain wallet. The keypair's
/// secret half zeroizes when this drops.
#[derive(Debug, Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct IdentityState {
    /// The username this session is logged in as.
    username: String,
    /// The session signing keypair, re-derived from credentials.
    keypair: SignKeypair,
    /// The public key in registry encoding (lowercase hex).
    public_key_hex: String,
}

impl IdentityState {
    /// End the session. Purely local, always succeeds; the keypair secret is
    /// zeroized as the state drops. No registry interaction happens, and the
    /// registry entry is untouched, so anyone with the credentials can derive
    /// their way back in.
    pub fn logout(self) {}
}

/// Orchestrates registration and login against a registry collaborator.
///
/// The registry handle is injected at construction so callers (and tests)
/// decide what is behind it: a replicated network store, or
/// [`MemRegistry`][crate::registry::mem::MemRegistry].
pub struct IdentityService {
    registry: Arc<dyn Registry>,
}

impl IdentityService {
    /// Create a service around a registry handle.
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Register a new username.
    ///
    /// Generates a fresh salt, derives the keypair, and proposes the claim.
    /// Fails with [`Error::UsernameTaken`] whether the username was already
    /// registered or the claim lost a race to a concurrent writer. The
    /// caller cannot act differently on the two, so they are not
    /// distinguished.
    pub async fn register<R: RngCore + CryptoRng>(&self, rng: &mut R, username: &str, password: &str) -> Result<IdentityState> {
        if password.is_empty() {
            return Err(Error::PasswordEmpty);
        }
        if self.registry.lookup(username).await?.is_some() {
            return Err(Error::UsernameTaken);
        }
        let salt = crypto::generate_salt(rng);
        let keypair = crypto::derive_keypair(password, &salt)?;
        let public_key_hex = keypair.public_hex();
        let entry = RegistryEntry::new(public_key_hex.clone(), ser::base64_encode(salt), None, Timestamp::now());
        let accepted = self.registry.claim(username, entry).await?;
        if !accepted {
            debug!(username, "registration claim lost the race");
            return Err(Error::UsernameTaken);
        }
        Ok(IdentityState {
            username: username.to_owned(),
            keypair,
            public_key_hex,
        })
    }

    /// Log in to an existing username.
    ///
    /// Derives a keypair from the password and the *stored* salt, then
    /// compares the derived public key against the registered one in
    /// constant structure. A mismatch is [`Error::InvalidCredentials`] with
    /// no further detail; past the lookup, wrong-username and wrong-password
    /// produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<IdentityState> {
        if password.is_empty() {
            return Err(Error::PasswordEmpty);
        }
        let entry = self.registry.lookup(username).await?.ok_or(Error::UsernameNotFound)?;
        let salt = entry.salt_bytes()?;
        let keypair = crypto::derive_keypair(password, &salt)?;
        if !keypair.public_eq_hex(entry.public_key()) {
            debug!(username, "derived key does not match registered key");
            return Err(Error::InvalidCredentials);
        }
        Ok(IdentityState {
            username: username.to_owned(),
            public_key_hex: keypair.public_hex(),
            keypair,
        })
    }

    /// Enumerate every registered identity this replica knows of, validated.
    /// This is the browse/search surface; it says nothing about entries a
    /// partitioned replica may still be holding.
    pub async fn directory(&self) -> Result<Vec<(String, RegistryEntry)>> {
        let all = self.registry.list_all().await?;
        for (_, entry) in &all {
            entry.validate()?;
        }
        Ok(all)
    }
}
