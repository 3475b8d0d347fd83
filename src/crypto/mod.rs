//! The crypto module turns memorized credentials into key material.
//!
//! This is the "brain wallet" half of the system: a password and a stored
//! salt are stretched through a memory-hard KDF into a fixed-length seed,
//! and that seed deterministically generates a signing keypair. Nothing in
//! here does I/O or holds state, so the same inputs always produce the same
//! keys, from any number of concurrent callers. Derivation is CPU-bound and
//! deliberately slow; callers on an async runtime may want to run it on a
//! blocking-work thread rather than a reactor thread.
//!
//! The KDF parameters below are part of the identity format itself. Two
//! implementations only derive the same keys if they agree on every one of
//! them, so changing any value here is a breaking migration that orphans
//! every already-registered identity. They are constants, not configuration,
//! for exactly that reason.

use crate::{
    error::{Error, Result},
    util::ser::BinarySecret,
};
use rand::{rngs::OsRng, CryptoRng, RngCore, SeedableRng};

mod sign;

pub use sign::*;

/// Argon2id iteration count (CPU difficulty).
pub const KDF_OPS: u32 = 2;
/// Argon2id memory cost, in KiB.
pub const KDF_MEM: u32 = 4096;
/// Argon2id lane count.
pub const KDF_PARALLELISM: u32 = 1;
/// Length of the derived seed, in bytes. Consumed directly as the Ed25519
/// generation seed.
pub const SEED_LEN: usize = 32;
/// Length of a registration salt, in bytes.
pub const SALT_LEN: usize = 16;

/// A convenience function that returns a ChaCha20 CSRNG seeded with OS random
/// bytes. Use this if you want a nice, strong random number generator, you
/// don't want to wire one up yourself, and your platform provides good
/// entropy.
///
/// This can be used as an input to any function that accepts `&mut rng`.
/// Otherwise, you can bring your own RNG that implements [`RngCore`].
pub fn rng_chacha20() -> rand_chacha::ChaCha20Rng {
    let mut seed_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut seed_bytes);
    rand_chacha::ChaCha20Rng::from_seed(seed_bytes)
}

/// Generate a fresh registration salt.
///
/// Salts come from the given CSRNG and from nowhere else: never from the
/// password, never recycled between usernames, never regenerated on login.
pub fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    salt
}

/// A seed derived from a password and salt, used to generate a signing
/// keypair. Held in volatile memory only and zeroized on drop.
#[derive(Debug, Clone)]
pub struct Seed(BinarySecret<SEED_LEN>);

impl Seed {
    /// Grab the raw seed bytes.
    pub fn expose(&self) -> &[u8; SEED_LEN] {
        self.0.expose_secret()
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(BinarySecret::new(bytes))
    }
}

/// Derive a keypair-generation seed from a password and salt.
///
/// The salt must be exactly [`SALT_LEN`] bytes: the stored value for the
/// username on login, or a freshly generated one on registration. The
/// username itself is not mixed into the hash input; distinct identities are
/// separated by their salts alone.
///
/// Empty passwords are rejected here as a caller bug, not mapped to a login
/// failure. Everything else either derives or reports the KDF's own error.
pub fn derive_seed(password: &str, salt_bytes: &[u8]) -> Result<Seed> {
    if password.is_empty() {
        return Err(Error::PasswordEmpty);
    }
    let salt: &[u8; SALT_LEN] = salt_bytes.try_into().map_err(|_| Error::CryptoBadSalt)?;
    let argon2_ctx = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(KDF_MEM, KDF_OPS, KDF_PARALLELISM, Some(SEED_LEN)).map_err(|_| Error::CryptoKdfFailed)?,
    );
    let mut seed = [0u8; SEED_LEN];
    argon2_ctx
        .hash_password_into(password.as_bytes(), salt, &mut seed)
        .map_err(|_| Error::CryptoKdfFailed)?;
    Ok(Seed(BinarySecret::new(seed)))
}

/// Derive the signing keypair for a credential pair in one step:
/// [`derive_seed`] followed by [`SignKeypair::new_ed25519_from_seed`].
pub fn derive_keypair(password: &str, salt_bytes: &[u8]) -> Result<SignKeypair> {
    let seed = derive_seed(password, salt_bytes)?;
    Ok(SignKeypair::new_ed25519_from_seed(&seed))
}
