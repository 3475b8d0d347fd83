//! The registry is the one piece of shared state in the system: a replicated
//! key-value store mapping usernames to identity records.
//!
//! This module defines the *contract* the identity protocol consumes, not a
//! network implementation. A registry promises eventual consistency (all
//! replicas converge on the same entry for a username, given connectivity)
//! and deterministic conflict resolution (first write wins, with a fixed
//! total tiebreak), and nothing stronger. In particular, a `lookup` right
//! after a successful `claim` on a *different* replica may well miss it; the
//! protocol is written to survive that.
//!
//! Entries are validated at this boundary. The store replicates whatever its
//! peers send, so shape problems are treated as corrupt data and surfaced as
//! typed errors rather than allowed to propagate.

use crate::{
    crypto::SALT_LEN,
    error::{Error, Result},
    util::{ser, Timestamp},
};
use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};

pub mod mem;

/// The on-store record for a username. Once a claim for it is accepted,
/// `public_key` and `salt` are immutable: they are the root of trust for the
/// username. Only `profile_ref` may be updated afterward, and not through
/// this crate.
///
/// Wire encodings are fixed for interoperability: the public key is lowercase
/// hex, the salt is standard (padded) base64, and the creation time is Unix
/// epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// The claiming identity's signing public key, lowercase hex.
    public_key: String,
    /// The registration salt, standard base64.
    salt: String,
    /// Content identifier of the claiming identity's profile, if any.
    #[serde(default)]
    profile_ref: Option<String>,
    /// When the claim was made.
    created_at: Timestamp,
}

impl RegistryEntry {
    /// Build an entry. Validation happens at the registry boundary, not here;
    /// see [`validate`][RegistryEntry::validate].
    pub fn new(public_key: String, salt: String, profile_ref: Option<String>, created_at: Timestamp) -> Self {
        Self {
            public_key,
            salt,
            profile_ref,
            created_at,
        }
    }

    /// Check the entry's shape: 32-byte lowercase-hex public key, 16-byte
    /// base64 salt. Anything else is corrupt data.
    pub fn validate(&self) -> Result<()> {
        let public_key = hex::decode(self.public_key()).map_err(|_| Error::EntryCorrupt("public key is not valid hex"))?;
        if public_key.len() != 32 {
            return Err(Error::EntryCorrupt("public key is not 32 bytes"));
        }
        if self.public_key().bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(Error::EntryCorrupt("public key hex must be lowercase"));
        }
        let salt = ser::base64_decode(self.salt()).map_err(|_| Error::EntryCorrupt("salt is not valid base64"))?;
        if salt.len() != SALT_LEN {
            return Err(Error::EntryCorrupt("salt is not 16 bytes"));
        }
        Ok(())
    }

    /// Decode the stored salt, validating the entry on the way.
    pub fn salt_bytes(&self) -> Result<[u8; SALT_LEN]> {
        self.validate()?;
        let decoded = ser::base64_decode(self.salt())?;
        decoded.as_slice().try_into().map_err(|_| Error::EntryCorrupt("salt is not 16 bytes"))
    }
}

/// The registry collaborator interface the identity protocol consumes.
///
/// Implementations are the sole writers of their stores; the protocol only
/// proposes writes through [`claim`][Registry::claim]. Whatever the backing
/// transport, implementations map their own I/O failures to
/// [`Error::RegistryUnavailable`] and reject malformed entries with
/// [`Error::EntryCorrupt`].
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the entry for a username, if this replica has one. Reads are
    /// eventually consistent.
    async fn lookup(&self, username: &str) -> Result<Option<RegistryEntry>>;

    /// Propose an entry for a username. Returns `true` iff this write won
    /// under the first-write-wins rule; `false` iff the username already had
    /// a winning entry at commit time. The absence re-check and the commit
    /// are one indivisible step within the replica's consistency domain;
    /// callers must not rely on their own lookup-then-claim sequencing.
    async fn claim(&self, username: &str, entry: RegistryEntry) -> Result<bool>;

    /// Enumerate every (username, entry) pair this replica knows of. Consumed
    /// by browse/search collaborators outside the identity protocol.
    async fn list_all(&self) -> Result<Vec<(String, RegistryEntry)>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry_fixture(public_key: &str, salt: &str, millis: i64) -> RegistryEntry {
        RegistryEntry::new(
            public_key.to_owned(),
            salt.to_owned(),
            None,
            Timestamp::from_millis(millis).unwrap(),
        )
    }

    fn valid_entry() -> RegistryEntry {
        entry_fixture(
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
            &ser::base64_encode([0u8; SALT_LEN]),
            1_700_000_000_000,
        )
    }

    #[test]
    fn entry_validate_accepts_wellformed() {
        assert_eq!(valid_entry().validate(), Ok(()));
    }

    #[test]
    fn entry_validate_rejects_bad_public_key() {
        let mut entry = valid_entry();
        entry.public_key = "zzzz".into();
        assert_eq!(entry.validate(), Err(Error::EntryCorrupt("public key is not valid hex")));

        let mut entry = valid_entry();
        entry.public_key = "d75a9801".into();
        assert_eq!(entry.validate(), Err(Error::EntryCorrupt("public key is not 32 bytes")));

        let mut entry = valid_entry();
        entry.public_key = entry.public_key.to_uppercase();
        assert_eq!(entry.validate(), Err(Error::EntryCorrupt("public key hex must be lowercase")));
    }

    #[test]
    fn entry_validate_rejects_bad_salt() {
        let mut entry = valid_entry();
        entry.salt = "!!!not base64!!!".into();
        assert_eq!(entry.validate(), Err(Error::EntryCorrupt("salt is not valid base64")));

        let mut entry = valid_entry();
        entry.salt = ser::base64_encode([0u8; 8]);
        assert_eq!(entry.validate(), Err(Error::EntryCorrupt("salt is not 16 bytes")));
    }

    #[test]
    fn entry_salt_bytes_roundtrip() {
        let salt = [42u8; SALT_LEN];
        let mut entry = valid_entry();
        entry.salt = ser::base64_encode(salt);
        assert_eq!(entry.salt_bytes().unwrap(), salt);
    }

    #[test]
    fn entry_wire_shape_is_bit_exact() {
        let entry = RegistryEntry::new(
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a".into(),
            "AAAAAAAAAAAAAAAAAAAAAA==".into(),
            None,
            Timestamp::from_millis(1_700_000_000_000).unwrap(),
        );
        let val = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            val,
            serde_json::json!({
                "publicKey": "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
                "salt": "AAAAAAAAAAAAAAAAAAAAAA==",
                "profileRef": null,
                "createdAt": 1_700_000_000_000i64,
            })
        );
        let back: RegistryEntry = serde_json::from_value(val).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn entry_deserializes_without_profile_ref() {
        let entry: RegistryEntry = serde_json::from_value(serde_json::json!({
            "publicKey": "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
            "salt": "AAAAAAAAAAAAAAAAAAAAAA==",
            "createdAt": 1_700_000_000_000i64,
        }))
        .unwrap();
        assert_eq!(entry.profile_ref(), &None);
    }
}
