//! Welcome to the Haven core, the identity layer of the Haven peer-to-peer
//! application.
//!
//! Haven has no account server. An identity here is a "brain wallet": the
//! signing keypair that *is* your account gets derived deterministically from
//! your username's stored salt and your memorized password, every time you
//! log in, on whatever device you happen to be holding. Nothing secret is
//! ever written to disk, so there is nothing to steal from disk and nothing
//! to lose with a device. Re-deriving from credentials is the one and only
//! recovery path.
//!
//! Username uniqueness, the other half of the problem, is settled without a
//! central authority. Usernames live in a replicated key-value registry
//! whose replicas may diverge while partitioned; a first-write-wins rule
//! with a deterministic tiebreak guarantees that every replica eventually
//! converges on the same owner for every name. Registration proposes a
//! claim; the registry decides who won.
//!
//! The goals of this crate are as follows:
//!
//! 1. To derive identical keys from identical credentials, bit for bit,
//! forever. The derivation parameters are part of the identity format.
//! 1. To keep key material out of persistent storage entirely, and out of
//! readable memory as soon as a session ends.
//! 1. To stay honest about distribution: the registry contract promises
//! eventual consistency and deterministic convergence, never more, and the
//! protocol is written against that contract rather than against wishful
//! linearizability.
//! 1. To make the collaborator seams explicit, so a test (or a single
//! process tool) can stand in a whole registry with an in-memory one.

pub mod error;
pub mod util;
pub mod crypto;
pub mod registry;
pub mod identity;
