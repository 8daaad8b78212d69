//! Core identifier types for chromegle-stats.
//!
//! A client is never stored by its network address. The address is reduced to a
//! [`Pseudonym`] by a keyed one-way digest, and the pseudonym is mapped to a compact
//! surrogate [`IdentityId`] by the storage layer.

use std::fmt;

/// Domain-separation context for deriving the pseudonym key.
const PSEUDONYM_CONTEXT: &str = "chromegle-stats 2022-07 identity pseudonym v1";

/// A 32-byte pseudonymous identity token, hex-encoded for display.
///
/// Pseudonyms are derived with blake3 from a raw address and cannot be
/// inverted back to it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pseudonym([u8; 32]);

impl Pseudonym {
    /// Return the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the hex-encoded string representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Pseudonym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pseudonym({})", self.to_hex())
    }
}

impl fmt::Display for Pseudonym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Derives pseudonyms from raw client addresses.
///
/// The digest is keyed with a server secret so that the small IPv4 space cannot
/// be enumerated to reverse a pseudonym. The same secret and address always
/// produce the same pseudonym.
#[derive(Clone)]
pub struct Pseudonymizer {
    key: [u8; 32],
}

impl Pseudonymizer {
    /// Create a pseudonymizer keyed from the given secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: blake3::derive_key(PSEUDONYM_CONTEXT, secret.as_bytes()),
        }
    }

    /// Derive the pseudonym for a raw address.
    #[must_use]
    pub fn pseudonymize(&self, raw_address: &str) -> Pseudonym {
        let hash = blake3::keyed_hash(&self.key, raw_address.trim().as_bytes());
        Pseudonym(*hash.as_bytes())
    }
}

impl Default for Pseudonymizer {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for Pseudonymizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pseudonymizer(..)")
    }
}

/// A surrogate identity identifier assigned by the storage layer.
///
/// Identifiers are allocated from a monotonically increasing sequence starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(u64);

impl IdentityId {
    /// Create a new `IdentityId` from its integer value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Big-endian byte encoding, used as an ordered storage key.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode from the big-endian storage key encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 8 bytes.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, IdError> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| IdError::InvalidLength {
            expected: 8,
            got: bytes.len(),
        })?;
        Ok(Self(u64::from_be_bytes(arr)))
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when decoding identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input has an incorrect length.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// The expected number of bytes.
        expected: usize,
        /// The actual number of bytes.
        got: usize,
    },
}
