//! # Transaction Construction & Authorization
//!
//! Everything between "I want to send N base units to this address" and a
//! signed, broadcast-ready transaction:
//!
//! - [`types`] — the [`Transaction`](types::Transaction) structure, its
//!   canonical signable bytes, and the deterministic id derived from them.
//! - [`fee`] — the linear fee schedule.
//! - [`selection`] — deterministic oldest-first input selection.
//! - [`engine`] — [`TransactionEngine`](engine::TransactionEngine), which
//!   checks spend authority, selects inputs, computes change, and signs.
//!
//! Construction is read-only over the ledger. A built transaction changes
//! nothing until it is broadcast, accepted, and finalized.

pub mod engine;
pub mod fee;
pub mod selection;
pub mod types;

pub use engine::{EngineError, TransactionEngine};
pub use fee::LinearFee;
pub use selection::{select_inputs, Selection, SelectionError};
pub use types::Transaction;
