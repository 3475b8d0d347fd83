//! An in-memory registry, plus a multi-replica harness around it.
//!
//! [`MemRegistry`] is a single replica: a map behind a mutex whose `claim`
//! re-checks absence and commits under one guard, which is exactly the
//! atomicity the [`Registry`] contract demands of a replica's own
//! consistency domain. [`ReplicaSet`] wires several of them together and
//! models partition and convergence: replicas accept writes independently,
//! and [`sync`][ReplicaSet::sync] merges them with the first-write-wins
//! rule: earlier creation time wins, ties broken by the lexicographic order
//! of a claim hash. The tiebreak is total and identical everywhere, so every
//! replica lands on the same winner no matter what order it hears about the
//! contenders in.
//!
//! This doubles as the registry contract's reference semantics and as the
//! substitute collaborator for anything that wants a registry without a
//! network: tests, demos, single-process tools.

use crate::{
    error::{Error, Result},
    registry::{Registry, RegistryEntry},
};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicBool, Ordering as AtomicOrdering},
    Arc, Mutex, MutexGuard,
};
use tracing::debug;

/// A single in-memory registry replica.
#[derive(Debug, Default)]
pub struct MemRegistry {
    store: Mutex<BTreeMap<String, RegistryEntry>>,
    offline: AtomicBool,
}

impl MemRegistry {
    /// Create a new, empty replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) connectivity. While offline, every
    /// operation fails with [`Error::RegistryUnavailable`] and the replica
    /// neither contributes to nor receives sync merges.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn is_offline(&self) -> bool {
        self.offline.load(AtomicOrdering::SeqCst)
    }

    fn guard(&self) -> Result<MutexGuard<'_, BTreeMap<String, RegistryEntry>>> {
        if self.is_offline() {
            return Err(Error::RegistryUnavailable("registry offline".into()));
        }
        self.store
            .lock()
            .map_err(|_| Error::RegistryUnavailable("registry store poisoned".into()))
    }
}

#[async_trait]
impl Registry for MemRegistry {
    async fn lookup(&self, username: &str) -> Result<Option<RegistryEntry>> {
        let store = self.guard()?;
        match store.get(username) {
            Some(entry) => {
                entry.validate()?;
                Ok(Some(entry.clone()))
            }
            None => Ok(None),
        }
    }

    async fn claim(&self, username: &str, entry: RegistryEntry) -> Result<bool> {
        entry.validate()?;
        // check-and-commit under a single guard: this is the indivisible step
        // the contract promises, and the only thing standing between two
        // racing registrations.
        let mut store = self.guard()?;
        if store.contains_key(username) {
            return Ok(false);
        }
        store.insert(username.to_owned(), entry);
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<(String, RegistryEntry)>> {
        let store = self.guard()?;
        Ok(store.iter().map(|(username, entry)| (username.clone(), entry.clone())).collect())
    }
}

/// Hash identifying a claim for tiebreak purposes. Covers the username and
/// the immutable fields of the entry; `profile_ref` is mutable and must not
/// influence who wins.
fn claim_hash(username: &str, entry: &RegistryEntry) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(username.as_bytes());
    hasher.update(&[0]);
    hasher.update(entry.public_key().as_bytes());
    hasher.update(&[0]);
    hasher.update(entry.salt().as_bytes());
    hasher.update(&entry.created_at().as_millis().to_be_bytes());
    *hasher.finalize().as_bytes()
}

/// First-write-wins: does `challenger` beat `incumbent` for `username`?
/// Earlier creation time wins; equal times fall through to the claim-hash
/// tiebreak, which is a total order, so the answer is the same on every
/// replica.
fn fww_wins(username: &str, challenger: &RegistryEntry, incumbent: &RegistryEntry) -> bool {
    match challenger.created_at().cmp(incumbent.created_at()) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => claim_hash(username, challenger) < claim_hash(username, incumbent),
    }
}

/// A set of [`MemRegistry`] replicas that accept writes independently and
/// converge on demand.
///
/// There is no background replication: replicas stay partitioned until
/// [`sync`][ReplicaSet::sync] is called, which makes the window between
/// "both replicas accepted a claim" and "one of them lost" explicit and easy
/// to stage in tests.
pub struct ReplicaSet {
    replicas: Vec<Arc<MemRegistry>>,
}

impl ReplicaSet {
    /// Create a set of `count` empty replicas.
    pub fn new(count: usize) -> Self {
        Self {
            replicas: (0..count).map(|_| Arc::new(MemRegistry::new())).collect(),
        }
    }

    /// Grab a handle to replica `idx`. Panics if out of range, which in a
    /// test harness is the feedback you want.
    pub fn replica(&self, idx: usize) -> Arc<MemRegistry> {
        self.replicas[idx].clone()
    }

    /// Exchange state between all online replicas and converge them on the
    /// first-write-wins winner for every username. Offline replicas neither
    /// contribute nor receive. Running this twice in a row is a no-op the
    /// second time: the merge is a fold over a total order, so it is
    /// idempotent and insensitive to replica ordering.
    pub fn sync(&self) -> Result<()> {
        let mut merged: BTreeMap<String, RegistryEntry> = BTreeMap::new();
        for replica in &self.replicas {
            if replica.is_offline() {
                continue;
            }
            let store = replica.guard()?;
            for (username, entry) in store.iter() {
                match merged.get(username) {
                    Some(incumbent) => {
                        if fww_wins(username, entry, incumbent) {
                            debug!(username = username.as_str(), "sync: replacing conflicting claim");
                            merged.insert(username.clone(), entry.clone());
                        }
                    }
                    None => {
                        merged.insert(username.clone(), entry.clone());
                    }
                }
            }
        }
        for replica in &self.replicas {
            if replica.is_offline() {
                continue;
            }
            let mut store = replica.guard()?;
            *store = merged.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{crypto::SALT_LEN, registry::tests::entry_fixture, util::ser};

    fn entry(key_byte: u8, millis: i64) -> RegistryEntry {
        entry_fixture(&hex::encode([key_byte; 32]), &ser::base64_encode([key_byte; SALT_LEN]), millis)
    }

    #[tokio::test]
    async fn claim_commits_then_rejects() {
        let registry = MemRegistry::new();
        assert_eq!(registry.claim("marcy", entry(1, 1_000)).await, Ok(true));
        assert_eq!(registry.claim("marcy", entry(2, 500)).await, Ok(false));
        // the first claim is untouched, even by an earlier-timestamped loser
        let stored = registry.lookup("marcy").await.unwrap().unwrap();
        assert_eq!(stored, entry(1, 1_000));
    }

    #[tokio::test]
    async fn claim_rejects_malformed_entry() {
        let registry = MemRegistry::new();
        let bad = entry_fixture("nothex", "AAAA", 1_000);
        let res = registry.claim("marcy", bad).await;
        assert_eq!(res, Err(Error::EntryCorrupt("public key is not valid hex")));
        assert_eq!(registry.lookup("marcy").await, Ok(None));
    }

    #[tokio::test]
    async fn lookup_surfaces_corrupt_stored_entry() {
        let registry = MemRegistry::new();
        registry
            .store
            .lock()
            .unwrap()
            .insert("marcy".into(), entry_fixture("nothex", "AAAA", 1_000));
        let res = registry.lookup("marcy").await;
        assert_eq!(res, Err(Error::EntryCorrupt("public key is not valid hex")));
    }

    #[tokio::test]
    async fn offline_registry_is_unavailable() {
        let registry = MemRegistry::new();
        registry.set_offline(true);
        assert!(matches!(registry.lookup("marcy").await, Err(Error::RegistryUnavailable(_))));
        assert!(matches!(registry.claim("marcy", entry(1, 1_000)).await, Err(Error::RegistryUnavailable(_))));
        assert!(matches!(registry.list_all().await, Err(Error::RegistryUnavailable(_))));
        registry.set_offline(false);
        assert_eq!(registry.claim("marcy", entry(1, 1_000)).await, Ok(true));
    }

    #[tokio::test]
    async fn list_all_is_sorted_by_username() {
        let registry = MemRegistry::new();
        registry.claim("zelda", entry(1, 1_000)).await.unwrap();
        registry.claim("alice", entry(2, 2_000)).await.unwrap();
        let all = registry.list_all().await.unwrap();
        let names: Vec<&str> = all.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["alice", "zelda"]);
    }

    #[tokio::test]
    async fn sync_earlier_timestamp_wins_in_any_order() {
        for flipped in [false, true] {
            let replicas = ReplicaSet::new(2);
            let (first, second) = if flipped { (1, 0) } else { (0, 1) };
            replicas.replica(first).claim("marcy", entry(1, 1_000)).await.unwrap();
            replicas.replica(second).claim("marcy", entry(2, 2_000)).await.unwrap();
            replicas.sync().unwrap();
            for idx in 0..2 {
                let stored = replicas.replica(idx).lookup("marcy").await.unwrap().unwrap();
                assert_eq!(stored, entry(1, 1_000), "flipped={}", flipped);
            }
        }
    }

    #[tokio::test]
    async fn sync_equal_timestamps_resolve_deterministically() {
        // same millisecond on both replicas; the claim-hash tiebreak must
        // pick the same winner regardless of merge order
        let winner_of = |a_first: bool| async move {
            let replicas = ReplicaSet::new(2);
            let (first, second) = if a_first { (0, 1) } else { (1, 0) };
            replicas.replica(first).claim("marcy", entry(1, 1_000)).await.unwrap();
            replicas.replica(second).claim("marcy", entry(2, 1_000)).await.unwrap();
            replicas.sync().unwrap();
            replicas.replica(0).lookup("marcy").await.unwrap().unwrap()
        };
        let winner1 = winner_of(true).await;
        let winner2 = winner_of(false).await;
        assert_eq!(winner1, winner2);
    }

    #[tokio::test]
    async fn sync_is_idempotent() {
        let replicas = ReplicaSet::new(3);
        replicas.replica(0).claim("marcy", entry(1, 1_000)).await.unwrap();
        replicas.replica(1).claim("marcy", entry(2, 2_000)).await.unwrap();
        replicas.replica(2).claim("pepper", entry(3, 3_000)).await.unwrap();
        replicas.sync().unwrap();
        let snapshot = replicas.replica(0).list_all().await.unwrap();
        replicas.sync().unwrap();
        for idx in 0..3 {
            assert_eq!(replicas.replica(idx).list_all().await.unwrap(), snapshot);
        }
    }

    #[tokio::test]
    async fn sync_skips_offline_replicas() {
        let replicas = ReplicaSet::new(2);
        replicas.replica(0).claim("marcy", entry(1, 1_000)).await.unwrap();
        replicas.replica(1).set_offline(true);
        replicas.sync().unwrap();
        replicas.replica(1).set_offline(false);
        // the offline replica heard nothing
        assert_eq!(replicas.replica(1).lookup("marcy").await, Ok(None));
        replicas.sync().unwrap();
        assert_eq!(replicas.replica(1).lookup("marcy").await.unwrap(), Some(entry(1, 1_000)));
    }

    #[test]
    fn fww_tiebreak_is_total_and_consistent() {
        let entry_a = entry(1, 1_000);
        let entry_b = entry(2, 1_000);
        let a_beats_b = fww_wins("marcy", &entry_a, &entry_b);
        let b_beats_a = fww_wins("marcy", &entry_b, &entry_a);
        assert!(a_beats_b != b_beats_a);
        // an entry never beats itself, so merging it repeatedly is stable
        assert!(!fww_wins("marcy", &entry_a, &entry_a));
    }
}
