//! Core identifiers: keys, timestamps and replica addresses.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier of an addressable record.
///
/// Keys order lexicographically; that order fixes the sibling list of a
/// multi-key write.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Creates a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-assigned write timestamp.
///
/// Timestamps are totally ordered and, with high probability, unique: the
/// upper 48 bits carry a logical clock and the lower 16 bits carry entropy
/// identifying the client (see [`Timestamp::compose`]). The value `0` is the
/// [`Timestamp::NONE`] sentinel meaning "no requirement".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The "no requirement" sentinel.
    pub const NONE: Timestamp = Timestamp(0);

    /// Number of low bits reserved for client entropy.
    pub const ENTROPY_BITS: u32 = 16;

    /// Creates a timestamp from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Largest logical clock a timestamp can carry.
    pub const MAX_LOGICAL: u64 = u64::MAX >> Self::ENTROPY_BITS;

    /// Packs a logical clock and client entropy into one timestamp.
    ///
    /// The logical clock dominates ordering; entropy only breaks ties
    /// between clients that picked the same clock value. Clocks above
    /// [`Timestamp::MAX_LOGICAL`] saturate rather than wrap, so ordering
    /// never inverts.
    #[must_use]
    pub const fn compose(logical: u64, entropy: u16) -> Self {
        let logical = if logical > Self::MAX_LOGICAL {
            Self::MAX_LOGICAL
        } else {
            logical
        };
        Self((logical << Self::ENTROPY_BITS) | entropy as u64)
    }

    /// Returns the logical clock part.
    #[must_use]
    pub const fn logical(self) -> u64 {
        self.0 >> Self::ENTROPY_BITS
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the [`Timestamp::NONE`] sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts:{}", self.0)
    }
}

/// Address of a replica.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaAddr(String);

impl ReplicaAddr {
    /// Creates a replica address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReplicaAddr {
    fn from(addr: &str) -> Self {
        Self(addr.to_owned())
    }
}

impl fmt::Display for ReplicaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
