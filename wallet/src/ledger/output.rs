//! Ledger output records.
//!
//! An [`Output`] is a discrete unit of value: created by one finalized
//! transaction, destroyed (marked spent) by at most one later finalized
//! transaction. Everything else about it is immutable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::keys::StealthTag;

// ---------------------------------------------------------------------------
// OutputId
// ---------------------------------------------------------------------------

/// Globally unique reference to one output: the creating transaction's id
/// plus the output's position within it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputId {
    /// Hex id of the transaction that created this output.
    pub tx_id: String,
    /// Zero-based position within that transaction's output list.
    pub index: u32,
}

impl OutputId {
    /// Convenience constructor.
    pub fn new(tx_id: impl Into<String>, index: u32) -> Self {
        Self {
            tx_id: tx_id.into(),
            index,
        }
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}

// ---------------------------------------------------------------------------
// NewOutput / Output
// ---------------------------------------------------------------------------

/// An output as it appears inside a transaction, before the ledger has
/// assigned it an id and a creation height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOutput {
    /// Recipient-detection material (see [`crate::keys::stealth`]).
    pub stealth: StealthTag,
    /// Value in base units.
    pub amount: Amount,
}

/// A fully recorded ledger output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Unique reference: creating tx id + index.
    pub id: OutputId,

    /// Recipient-detection material. Only the matching view key can tell
    /// that this output belongs to its wallet.
    pub stealth: StealthTag,

    /// Value in base units.
    pub amount: Amount,

    /// Logical height at which the creating transaction finalized.
    /// Genesis outputs sit at height 0. Drives oldest-first selection.
    pub created_at: u64,

    /// Id of the transaction that consumed this output, if any.
    /// The transition from `None` to `Some` is one-way and irreversible.
    pub spent_by: Option<String>,
}

impl Output {
    /// Returns `true` once the output has been consumed.
    pub fn is_spent(&self) -> bool {
        self.spent_by.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
