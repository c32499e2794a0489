//! Fixed-width commitment digests
//!
//! Digests are computed off-chain (hash-chain heads, Merkle roots) and only
//! stored here. Serialized as `0x`-prefixed lowercase hex.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::{LuxbinError, Result};

/// Width in bytes of every anchored commitment
pub const DIGEST_LEN: usize = 32;

/// A 32-byte commitment digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest32(pub [u8; DIGEST_LEN]);

impl Digest32 {
    /// Build from a byte slice, failing unless it is exactly `DIGEST_LEN` long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; DIGEST_LEN] =
            bytes
                .try_into()
                .map_err(|_| LuxbinError::InvalidCommitmentSize {
                    expected: DIGEST_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Parse hex with an optional `0x` prefix
    pub fn parse_hex(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| LuxbinError::Serialization {
            message: format!("invalid digest hex: {e}"),
        })?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest32({})", self.to_hex())
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; DIGEST_LEN]> for Digest32 {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Digest32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest32::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_width() {
        assert!(Digest32::from_slice(&[7u8; 32]).is_ok());

        let short = Digest32::from_slice(&[7u8; 31]);
        assert!(matches!(
            short,
            Err(LuxbinError::InvalidCommitmentSize { expected: 32, actual: 31 })
        ));
        let long = Digest32::from_slice(&[7u8; 33]);
        assert!(matches!(
            long,
            Err(LuxbinError::InvalidCommitmentSize { actual: 33, .. })
        ));
    }

    #[test]
    fn test_hex_prefix_optional() {
        let hex = "ab".repeat(32);
        let a = Digest32::parse_hex(&hex).unwrap();
        let b = Digest32::parse_hex(&format!("0x{hex}")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), format!("0x{hex}"));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let digest = Digest32([1u8; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(32)));
        let back: Digest32 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
