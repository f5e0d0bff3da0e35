//! # Monetary Amounts
//!
//! [`Amount`] is the only numeric type money is allowed to wear in Umbra.
//! It wraps a `u128` of base units: non-negative by construction, checked
//! on every operation, and serialized as a decimal string so that JSON
//! transports with float-flavored number types cannot mangle it.
//!
//! Why `u128` and not a bigint crate? The supply cap is 10^19 base units,
//! which overflows `i64` (devnet genesis wallets hold 2.5 * 10^18 each)
//! but leaves ~19 orders of magnitude of `u128` headroom even for
//! whole-ledger sums. Checked arithmetic catches the impossible anyway.

use std::fmt;
use std::iter::Sum;
use std::ops::Deref;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::MAX_SUPPLY;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur constructing or combining amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The value exceeds the protocol supply cap.
    #[error("amount {0} exceeds the maximum supply of {MAX_SUPPLY}")]
    ExceedsSupply(u128),

    /// Addition overflowed the supply cap. If this fires outside a test,
    /// the conservation invariant is already broken somewhere upstream.
    #[error("amount addition overflow: {lhs} + {rhs}")]
    AddOverflow {
        /// Left operand.
        lhs: u128,
        /// Right operand.
        rhs: u128,
    },

    /// Subtraction would produce a negative amount. Amounts are unsigned;
    /// there is no such thing as negative money in the ledger.
    #[error("amount underflow: {lhs} - {rhs}")]
    SubUnderflow {
        /// Left operand.
        lhs: u128,
        /// Right operand.
        rhs: u128,
    },

    /// The decimal string could not be parsed.
    #[error("malformed decimal amount: {0:?}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A non-negative quantity of base units.
///
/// No implicit decimals, no display units, no floating point. Conversion
/// to and from human denominations is a presentation-layer problem.
///
/// # Examples
///
/// ```
/// use umbra_wallet::amount::Amount;
///
/// let genesis: Amount = "2500000000000000000".parse().unwrap();
/// let sent: Amount = "500000000000000000".parse().unwrap();
/// let left = genesis.checked_sub(sent).unwrap();
/// assert_eq!(left.to_string(), "2000000000000000000");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Creates an amount, enforcing the supply cap.
    ///
    /// Individual amounts above [`MAX_SUPPLY`] cannot exist by
    /// construction — they could never appear in a valid ledger.
    pub fn new(base_units: u128) -> Result<Self, AmountError> {
        if base_units > MAX_SUPPLY {
            return Err(AmountError::ExceedsSupply(base_units));
        }
        Ok(Amount(base_units))
    }

    /// Raw base units.
    pub fn base_units(&self) -> u128 {
        self.0
    }

    /// Returns `true` if this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition. Errors instead of wrapping or saturating —
    /// a silently clamped balance is worse than a loud failure. A sum past
    /// the supply cap is [`AmountError::ExceedsSupply`]: no such amount can
    /// exist in a valid ledger, so it must not exist as a value either.
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, AmountError> {
        let sum = self
            .0
            .checked_add(rhs.0)
            .ok_or(AmountError::AddOverflow {
                lhs: self.0,
                rhs: rhs.0,
            })?;
        Amount::new(sum)
    }

    /// Checked subtraction. Errors on underflow.
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_sub(rhs.0)
            .map(Amount)
            .ok_or(AmountError::SubUnderflow {
                lhs: self.0,
                rhs: rhs.0,
            })
    }

    /// Sums a sequence of amounts with checked arithmetic.
    ///
    /// This is what balance resolution uses — never `Iterator::sum`,
    /// which would panic on overflow in debug and wrap in release.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Result<Amount, AmountError> {
        let mut total = Amount::ZERO;
        for a in amounts {
            total = total.checked_add(a)?;
        }
        Ok(total)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses a plain decimal string. No sign, no separators, no exponent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed(s.to_string()));
        }
        let value: u128 = s.parse().map_err(|_| AmountError::Malformed(s.to_string()))?;
        Amount::new(value)
    }
}

impl Deref for Amount {
    type Target = u128;

    fn deref(&self) -> &u128 {
        &self.0
    }
}

impl Sum<Amount> for Result<Amount, AmountError> {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount::checked_sum(iter)
    }
}

// Serde: decimal strings on the wire, always. A JSON number would round-trip
// through f64 in enough clients to corrupt anything above 2^53.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
