use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{decode_hex, encode_hex, TypeError};

/// A 20-byte account address.
///
/// Contract addresses are derived deterministically from the creating
/// account and its creation nonce, so replaying the same sequence of
/// creations on the same state always yields the same addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, read as "not set".
    pub const ZERO: Address = Address([0u8; 20]);

    /// Wildcard understood by permission managers as "any address".
    pub const ANY: Address = Address([0xffu8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Address of the account created by `deployer` with the given nonce.
    pub fn derive(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"charter:create");
        hasher.update(&deployer.0);
        hasher.update(&nonce.to_be_bytes());
        Self::truncate(hasher.finalize().as_bytes())
    }

    /// Address of an externally owned account known by a human-readable name.
    pub fn named(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"charter:account");
        hasher.update(name.as_bytes());
        Self::truncate(hasher.finalize().as_bytes())
    }

    fn truncate(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", encode_hex(&self.0))
    }

    /// Parse a `0x`-prefixed, 40-digit hex string.
    pub fn from_hex(hex: &str) -> Result<Self, TypeError> {
        let digits = hex.strip_prefix("0x").ok_or(TypeError::MissingPrefix)?;
        Ok(Self(decode_hex::<20>(digits)?))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Address::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
