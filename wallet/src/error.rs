//! Crate-level error aggregation.
//!
//! Each module owns a narrow error enum; [`WalletError`] is the union that
//! crosses the crate boundary. Callers who care about a specific failure
//! match on the variant; callers who don't get a coherent `Display` chain
//! for free.

use thiserror::Error;

use crate::address::AddressError;
use crate::amount::AmountError;
use crate::broadcast::BroadcastError;
use crate::keys::KeyError;
use crate::ledger::LedgerError;
use crate::settlement::SettlementError;
use crate::transaction::EngineError;

/// Any failure the wallet can hand to its callers.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Key derivation refused its inputs.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// An address failed to parse or validate.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Amount parsing or checked arithmetic failed.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// The ledger refused a mutation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Transaction construction failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Broadcast failed.
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// Settlement tracking failed or timed out.
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl WalletError {
    /// Returns `true` when the failure was caused by the caller's request
    /// rather than the wallet's own machinery. Useful at API boundaries
    /// that distinguish 4xx-style from 5xx-style failures.
    pub fn is_caller_fault(&self) -> bool {
        match self {
            WalletError::Key(_) | WalletError::Address(_) | WalletError::Amount(_) => true,
            WalletError::Engine(e) => !matches!(e, EngineError::Amount(_)),
            WalletError::Ledger(_) | WalletError::Broadcast(_) | WalletError::Settlement(_) => {
                false
            }
        }
    }
}
