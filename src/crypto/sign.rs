use crate::{
    crypto::Seed,
    error::{Error, Result},
    util::ser::{Binary, BinarySecret},
};
use subtle::ConstantTimeEq;

/// A signature derived from a signing keypair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignKeypairSignature {
    Ed25519(Binary<64>),
}

impl AsRef<[u8]> for SignKeypairSignature {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Ed25519(sig) => sig.as_ref(),
        }
    }
}

/// An asymmetric signing keypair, generated deterministically from a derived
/// seed.
///
/// This is session-state only: the secret half lives in volatile memory,
/// zeroizes on drop, and is never serialized anywhere. Re-deriving from
/// credentials is the only way to get it back, which is the point.
#[derive(Debug)]
pub enum SignKeypair {
    /// Ed25519 signing keypair
    Ed25519 {
        public: Binary<32>,
        secret: BinarySecret<32>,
    },
}

impl SignKeypair {
    /// Generate an ed25519 keypair from a derived seed. For a fixed seed the
    /// resulting keypair is byte-for-byte reproducible.
    pub fn new_ed25519_from_seed(seed: &Seed) -> Self {
        let secret = ed25519_consensus::SigningKey::from(*seed.expose());
        let public = secret.verification_key();
        Self::Ed25519 {
            public: Binary::new(public.to_bytes()),
            secret: BinarySecret::new(secret.to_bytes()),
        }
    }

    /// The raw public key bytes.
    pub fn public_bytes(&self) -> &[u8; 32] {
        match self {
            Self::Ed25519 { public, .. } => public,
        }
    }

    /// The public key in its registry encoding: lowercase hexadecimal.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public_bytes())
    }

    /// The short display form of the public key: the first 8 hex characters.
    /// Cosmetic only. Never compare or look anything up with this.
    pub fn short_hex(&self) -> String {
        let mut hexed = self.public_hex();
        hexed.truncate(8);
        hexed
    }

    /// Compare our public key against a hex-encoded candidate without the
    /// comparison time depending on how much of the key matched. Malformed or
    /// wrong-length candidates simply don't match.
    pub fn public_eq_hex(&self, candidate_hex: &str) -> bool {
        let candidate = match hex::decode(candidate_hex) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        bool::from(self.public_bytes()[..].ct_eq(&candidate[..]))
    }

    /// Sign a message with the secret key.
    pub fn sign(&self, data: &[u8]) -> SignKeypairSignature {
        match self {
            Self::Ed25519 { secret, .. } => {
                let seckey = ed25519_consensus::SigningKey::from(*secret.expose_secret());
                SignKeypairSignature::Ed25519(Binary::new(seckey.sign(data).to_bytes()))
            }
        }
    }

    /// Verify a value with a detached signature given the public key of the
    /// signer.
    pub fn verify(&self, signature: &SignKeypairSignature, data: &[u8]) -> Result<()> {
        match (self, signature) {
            (Self::Ed25519 { public, .. }, SignKeypairSignature::Ed25519(sig_bytes)) => {
                let pubkey = ed25519_consensus::VerificationKey::try_from(**public)
                    .map_err(|_| Error::CryptoSignatureVerificationFailed)?;
                let sig = ed25519_consensus::Signature::from(**sig_bytes);
                pubkey
                    .verify(&sig, data)
                    .map_err(|_| Error::CryptoSignatureVerificationFailed)?;
                Ok(())
            }
        }
    }
}

impl Clone for SignKeypair {
    fn clone(&self) -> Self {
        match self {
            Self::Ed25519 { public, secret } => Self::Ed25519 {
                public: public.clone(),
                secret: secret.clone(),
            },
        }
    }
}

impl PartialEq for SignKeypair {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ed25519 { public: public1, .. }, Self::Ed25519 { public: public2, .. }) => public1 == public2,
        }
    }
}
