//! # Addresses
//!
//! An Umbra address is the public identifier senders use as a transaction
//! destination. It encodes exactly what a sender needs — the recipient's
//! X25519 view public key — behind a version byte and a Bech32 checksum:
//!
//! ```text
//! view_pubkey (32 bytes)
//!     -> [ADDRESS_VERSION] || view_pubkey  (33 bytes)
//!     -> Bech32("umbra", payload)          -> umbra1q...
//! ```
//!
//! The "default", "spend", "view", and "receive" addresses that appear in
//! integration suites are not different address types — they are simply
//! different wallets' addresses. The format is one.
//!
//! Bech32 gives built-in error detection (up to 4 character errors), which
//! matters when users copy-paste addresses into payment forms.

use std::fmt;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::PublicKey as ViewPublicKey;

use crate::config::{ADDRESS_HRP, ADDRESS_PAYLOAD_LENGTH, ADDRESS_VERSION};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur parsing an address string.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The Bech32 string could not be decoded at all.
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    /// The decoded address carries an unexpected human-readable prefix.
    #[error("invalid HRP: expected '{expected}', got '{got}'")]
    InvalidHrp {
        /// The expected HRP.
        expected: String,
        /// The HRP that was actually found.
        got: String,
    },

    /// The decoded payload has an unexpected length.
    #[error("invalid address payload length: expected {expected} bytes, got {got}")]
    InvalidPayloadLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },

    /// The payload's version byte is not one this build understands.
    #[error("unsupported address version: {0:#04x}")]
    UnsupportedVersion(u8),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A parsed, validated Umbra address.
///
/// Internally stores the recipient's view public key; the Bech32 string is
/// computed on the fly. Equality is over the view key — two strings that
/// decode to the same key are the same address.
///
/// # Examples
///
/// ```
/// use umbra_wallet::address::Address;
/// use umbra_wallet::keys::WalletKeys;
///
/// let wallet = WalletKeys::derive("Receive", "passphrase").unwrap();
/// let addr = Address::from_view_key(wallet.view().public());
/// assert!(addr.to_string().starts_with("umbra1"));
///
/// let parsed: Address = addr.to_string().parse().unwrap();
/// assert_eq!(addr, parsed);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    view_key: [u8; 32],
}

impl Address {
    /// Builds the address for a view public key.
    pub fn from_view_key(view_public: &ViewPublicKey) -> Self {
        Self {
            view_key: view_public.to_bytes(),
        }
    }

    /// Parses and validates a Bech32 address string.
    ///
    /// Checks the checksum, the HRP, the payload length, and the version
    /// byte. Anything else is [`AddressError`] — senders must not be able
    /// to aim funds at a string that merely looks like an address.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (hrp, payload) =
            bech32::decode(s).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

        let expected_hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        if hrp != expected_hrp {
            return Err(AddressError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }

        if payload.len() != ADDRESS_PAYLOAD_LENGTH {
            return Err(AddressError::InvalidPayloadLength {
                expected: ADDRESS_PAYLOAD_LENGTH,
                got: payload.len(),
            });
        }

        if payload[0] != ADDRESS_VERSION {
            return Err(AddressError::UnsupportedVersion(payload[0]));
        }

        let mut view_key = [0u8; 32];
        view_key.copy_from_slice(&payload[1..]);
        Ok(Self { view_key })
    }

    /// The view public key this address routes to.
    pub fn view_key(&self) -> ViewPublicKey {
        ViewPublicKey::from(self.view_key)
    }

    /// The encoded `umbra1...` string.
    pub fn encoded(&self) -> String {
        let hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        let mut payload = [0u8; ADDRESS_PAYLOAD_LENGTH];
        payload[0] = ADDRESS_VERSION;
        payload[1..].copy_from_slice(&self.view_key);
        bech32::encode::<Bech32>(hrp, &payload)
            .expect("encoding a 33-byte payload should never fail")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encoded())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.encoded();
        write!(f, "Address({}…{})", &s[..12], &s[s.len() - 6..])
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
