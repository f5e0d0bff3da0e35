//! The transaction engine: authority check, selection, change, signing.
//!
//! [`TransactionEngine`] is the only place a [`Transaction`] is assembled.
//! It reads the ledger but never writes it; the outputs it consumes stay
//! unspent until settlement finalizes the transaction.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::address::Address;
use crate::amount::{Amount, AmountError};
use crate::config::TX_VERSION;
use crate::keys::{StealthTag, WalletKeys};
use crate::ledger::{NewOutput, OutputLedger};

use super::fee::LinearFee;
use super::selection::{select_inputs, SelectionError};
use super::types::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from transaction construction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The wallet holds no spend key. View-only wallets can watch balances
    /// but never authorize a transfer.
    #[error("wallet '{wallet}' is view-only and cannot authorize spends")]
    Unauthorized {
        /// Name of the offending wallet.
        wallet: String,
    },

    /// A transfer of zero base units. Always a caller bug; rejecting it
    /// here is kinder than broadcasting a pointless transaction.
    #[error("transfer amount must be greater than zero")]
    ZeroAmount,

    /// Input selection failed, usually [`SelectionError::InsufficientFunds`].
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Arithmetic failure while assembling outputs.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

// ---------------------------------------------------------------------------
// TransactionEngine
// ---------------------------------------------------------------------------

/// Builds signed transactions against a shared ledger.
#[derive(Clone)]
pub struct TransactionEngine {
    ledger: Arc<OutputLedger>,
    schedule: LinearFee,
}

impl TransactionEngine {
    /// Creates an engine over the given ledger and fee schedule.
    pub fn new(ledger: Arc<OutputLedger>, schedule: LinearFee) -> Self {
        Self { ledger, schedule }
    }

    /// Builds and signs a transfer of `amount` to `destination`.
    ///
    /// The procedure:
    /// 1. Require spend authority; a view-only wallet fails immediately.
    /// 2. Resolve the wallet's unspent outputs and select inputs oldest
    ///    first until they cover amount plus fee.
    /// 3. Emit the payment output addressed to the destination's view key
    ///    and, when the selection leaves change, a change output addressed
    ///    back to the sender's own view key.
    /// 4. Compute the id and sign the canonical bytes with the spend key.
    ///
    /// The returned transaction satisfies
    /// `sum(selected inputs) == sum(outputs) + fee` exactly. The ledger is
    /// not modified; the inputs remain spendable until settlement.
    pub fn build_send(
        &self,
        wallet: &WalletKeys,
        destination: &Address,
        amount: Amount,
    ) -> Result<Transaction, EngineError> {
        let Some(spend) = wallet.spend() else {
            return Err(EngineError::Unauthorized {
                wallet: wallet.name().to_string(),
            });
        };
        if amount.is_zero() {
            return Err(EngineError::ZeroAmount);
        }

        let candidates = self.ledger.unspent_under(wallet.view());
        let selection = select_inputs(&candidates, amount, &self.schedule)?;

        let mut outputs = vec![NewOutput {
            stealth: StealthTag::address_to(&destination.view_key()),
            amount,
        }];
        if !selection.change.is_zero() {
            outputs.push(NewOutput {
                stealth: StealthTag::address_to(wallet.view().public()),
                amount: selection.change,
            });
        }

        let mut tx = Transaction {
            id: String::new(),
            version: TX_VERSION,
            inputs: selection.inputs.iter().map(|o| o.id.clone()).collect(),
            outputs,
            fee: selection.fee,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            sender_public_key: None,
            signature: None,
        };
        tx.id = tx.compute_id();

        let signable = tx.signable_bytes();
        tx.signature = Some(hex::encode(spend.sign(&signable)));
        tx.sender_public_key = Some(hex::encode(spend.public_bytes()));

        debug_assert_eq!(
            tx.declared_spend().ok(),
            Some(selection.total),
            "value conservation broken at construction"
        );

        debug!(
            tx_id = %tx.id,
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee = %tx.fee,
            "built transfer"
        );
        Ok(tx)
    }

    /// The fee schedule this engine builds against.
    pub fn schedule(&self) -> &LinearFee {
        &self.schedule
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
