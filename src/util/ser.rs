//! Helpful serialization tools.
//!
//! Registry entries travel as strings (hex public keys, base64 salts), so the
//! helpers here are mostly about moving between raw bytes and their storage
//! encodings, plus a couple of fixed-length byte containers that know whether
//! their contents are secret or not.

use crate::error::Result;
use base64::Engine;
use zeroize::Zeroize;

/// Convert bytes to standard (padded) base64, the encoding salts are stored
/// under in the registry.
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes.as_ref())
}

/// Decode standard (padded) base64 into bytes.
pub fn base64_decode<T: AsRef<[u8]>>(encoded: T) -> Result<Vec<u8>> {
    Ok(base64::engine::general_purpose::STANDARD.decode(encoded.as_ref())?)
}

/// A fixed-length byte container for *public* data (public keys, signatures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary<const N: usize>([u8; N]);

impl<const N: usize> Binary<N> {
    /// Create a new fixed-length byte container.
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

impl<const N: usize> std::ops::Deref for Binary<N> {
    type Target = [u8; N];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> AsRef<[u8]> for Binary<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A fixed-length byte container for *secret* data (seeds, signing keys).
///
/// The contents are zeroized on drop and only reachable through
/// [`expose_secret`][BinarySecret::expose_secret], and the `Debug` impl is
/// deliberately opaque so secrets cannot wander into logs.
#[derive(Zeroize)]
pub struct BinarySecret<const N: usize>([u8; N]);

impl<const N: usize> BinarySecret<N> {
    /// Create a new secret byte container.
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Grab the inner secret bytes.
    pub fn expose_secret(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Drop for BinarySecret<N> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<const N: usize> Clone for BinarySecret<N> {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl<const N: usize> std::fmt::Debug for BinarySecret<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinarySecret<{}>", N)
    }
}
