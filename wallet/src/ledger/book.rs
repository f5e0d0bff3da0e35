//! # OutputLedger — the finalized output book
//!
//! Thread-safe store of every finalized output. Reads (balance scans,
//! input-candidate listing) take the shared lock and may run concurrently;
//! every mutation takes the exclusive lock and follows a strict
//! validate-then-mutate discipline so that a failed application leaves the
//! book untouched.
//!
//! ## Write authority
//!
//! All mutating methods are `pub(crate)` and are called only from the
//! settlement module. The transaction engine and the balance resolver see
//! a read-only surface — pending transactions literally cannot touch the
//! book, which is what makes balance reads reflect finalized state only.
//!
//! ## Double-spend prevention
//!
//! [`OutputLedger::apply_finalized`] is the single entry point through
//! which a finalized transaction lands. Two transactions racing to consume
//! the same output serialize on the write lock; the first marks it spent,
//! the second fails validation with [`LedgerError::AlreadySpent`] before
//! any of its effects are recorded. Exactly one winner, by construction.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::output::{NewOutput, Output, OutputId};
use crate::amount::{Amount, AmountError};
use crate::keys::keyring::ViewKeypair;

/// Transaction id under which genesis outputs are recorded.
pub const GENESIS_TX_ID: &str = "genesis";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The referenced output was already consumed by another transaction.
    /// This is the double-spend signal; it is always surfaced, never
    /// silently retried.
    #[error("output {output} already spent by transaction {spender}")]
    AlreadySpent {
        /// The contested output.
        output: OutputId,
        /// The transaction that got there first.
        spender: String,
    },

    /// The referenced output does not exist in the book. Indicates a
    /// consistency bug upstream — a finalized transaction referenced
    /// something the ledger never recorded.
    #[error("unknown output reference {0}")]
    UnknownOutput(OutputId),

    /// Summation overflow. Unreachable while the conservation invariant
    /// holds (the supply cap is 19 orders of magnitude below `u128::MAX`),
    /// but checked arithmetic does not take that on faith.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

// ---------------------------------------------------------------------------
// OutputLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Book {
    /// All outputs in creation order. Never reordered, never removed.
    outputs: Vec<Output>,
    /// Output id -> position in `outputs`.
    positions: HashMap<OutputId, usize>,
    /// Transaction ids whose outputs have been recorded. Makes
    /// `append_outputs` idempotent — a retried settlement cannot
    /// double-credit.
    applied: HashSet<String>,
    /// Logical height of the most recently applied transaction.
    tip_height: u64,
}

/// The authoritative set of finalized transaction outputs.
pub struct OutputLedger {
    book: RwLock<Book>,
}

impl OutputLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            book: RwLock::new(Book::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// All unspent outputs visible under the given view key, in creation
    /// order. Finite, snapshot semantics — the returned outputs are clones
    /// and later ledger writes do not mutate them.
    pub fn unspent_under(&self, view: &ViewKeypair) -> Vec<Output> {
        let book = self.book.read();
        book.outputs
            .iter()
            .filter(|o| !o.is_spent() && o.stealth.matches(view))
            .cloned()
            .collect()
    }

    /// Looks up a single output by reference.
    pub fn output(&self, id: &OutputId) -> Option<Output> {
        let book = self.book.read();
        book.positions.get(id).map(|&pos| book.outputs[pos].clone())
    }

    /// The logical height of the latest applied transaction.
    pub fn tip_height(&self) -> u64 {
        self.book.read().tip_height
    }

    /// Total number of outputs ever recorded (spent and unspent).
    pub fn output_count(&self) -> usize {
        self.book.read().outputs.len()
    }

    /// Clone of the whole book, spent outputs included. Explorer/status
    /// surface and the conservation-law checks in the test suite.
    pub fn snapshot(&self) -> Vec<Output> {
        self.book.read().outputs.clone()
    }

    /// Sum of all currently unspent output amounts, across every wallet.
    pub fn total_unspent(&self) -> Result<Amount, AmountError> {
        let book = self.book.read();
        Amount::checked_sum(
            book.outputs
                .iter()
                .filter(|o| !o.is_spent())
                .map(|o| o.amount),
        )
    }

    // -----------------------------------------------------------------------
    // Write surface — settlement only
    // -----------------------------------------------------------------------

    /// Records the outputs of a finalized transaction.
    ///
    /// Idempotent per `tx_id`: replaying a settlement (broadcast retry,
    /// duplicate finality notification) is a no-op, not a double-credit.
    pub(crate) fn append_outputs(&self, tx_id: &str, outputs: Vec<NewOutput>) {
        let mut book = self.book.write();
        if book.applied.contains(tx_id) {
            debug!(tx_id, "append_outputs replay ignored");
            return;
        }
        let height = book.tip_height + 1;
        book.tip_height = height;
        Self::record_outputs(&mut book, tx_id, outputs, height);
    }

    /// Applies a finalized transaction as one unit: every input is marked
    /// spent and every output is recorded, all or nothing.
    ///
    /// Validation of all inputs happens before any mutation, under the
    /// same exclusive lock, so a failure cannot leave inputs spent with
    /// outputs missing (or vice versa). Replays of an already-applied
    /// `tx_id` return the recorded height without touching the book.
    pub(crate) fn apply_finalized(
        &self,
        tx_id: &str,
        inputs: &[OutputId],
        outputs: Vec<NewOutput>,
    ) -> Result<u64, LedgerError> {
        let mut book = self.book.write();

        if book.applied.contains(tx_id) {
            debug!(tx_id, "apply_finalized replay ignored");
            return Ok(book.tip_height);
        }

        // Validate everything first. No mutation until the whole
        // transaction is known to apply cleanly.
        for input in inputs {
            Self::validate_unspent(&book, input)?;
        }

        for input in inputs {
            Self::mark_spent(&mut book, input, tx_id)?;
        }

        let height = book.tip_height + 1;
        book.tip_height = height;
        Self::record_outputs(&mut book, tx_id, outputs, height);

        debug!(tx_id, height, inputs = inputs.len(), "transaction applied");
        Ok(height)
    }

    /// Installs the genesis distribution at height 0. Idempotent; outputs
    /// are recorded under [`GENESIS_TX_ID`].
    pub(crate) fn seed_genesis(&self, outputs: Vec<NewOutput>) {
        let mut book = self.book.write();
        if book.applied.contains(GENESIS_TX_ID) {
            warn!("genesis already seeded, ignoring");
            return;
        }
        Self::record_outputs(&mut book, GENESIS_TX_ID, outputs, 0);
    }

    // -----------------------------------------------------------------------
    // Internal helpers — callers hold the write lock
    // -----------------------------------------------------------------------

    fn validate_unspent(book: &Book, id: &OutputId) -> Result<(), LedgerError> {
        let pos = *book
            .positions
            .get(id)
            .ok_or_else(|| LedgerError::UnknownOutput(id.clone()))?;
        if let Some(spender) = &book.outputs[pos].spent_by {
            return Err(LedgerError::AlreadySpent {
                output: id.clone(),
                spender: spender.clone(),
            });
        }
        Ok(())
    }

    /// Marks a single output as consumed by `spending_tx_id`.
    ///
    /// The transition is one-way: a second attempt fails with
    /// [`LedgerError::AlreadySpent`] even if it names the same spender.
    fn mark_spent(
        book: &mut Book,
        id: &OutputId,
        spending_tx_id: &str,
    ) -> Result<(), LedgerError> {
        Self::validate_unspent(book, id)?;
        let pos = book.positions[id];
        book.outputs[pos].spent_by = Some(spending_tx_id.to_string());
        Ok(())
    }

    fn record_outputs(book: &mut Book, tx_id: &str, outputs: Vec<NewOutput>, height: u64) {
        for (index, new_output) in outputs.into_iter().enumerate() {
            let id = OutputId::new(tx_id, index as u32);
            let pos = book.outputs.len();
            book.positions.insert(id.clone(), pos);
            book.outputs.push(Output {
                id,
                stealth: new_output.stealth,
                amount: new_output.amount,
                created_at: height,
                spent_by: None,
            });
        }
        book.applied.insert(tx_id.to_string());
    }
}

impl Default for OutputLedger {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
