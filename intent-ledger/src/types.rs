//! Primitive value types shared by both ledgers

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Native currency amount in its smallest unit (wei).
pub type Wei = u128;

/// Monotonically assigned intent identifier.
pub type IntentId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Wei per whole native-currency unit.
pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

/// Converts thousandths of a native-currency unit into wei (`milli_ether(5)` = 0.005).
pub const fn milli_ether(milli: u128) -> Wei {
    milli * (WEI_PER_ETHER / 1_000)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),

    #[error("Address must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// 20-byte account identity. The all-zero address is the "no address" sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Builds an address whose low 8 bytes hold `n` (big-endian), e.g. `0x…0007`.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_part).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
