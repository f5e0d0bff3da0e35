//! # The Output Ledger
//!
//! The authoritative record of every transaction output the wallet engine
//! knows about: who can see it (via its stealth tag), how much it is worth,
//! and whether it has been consumed.
//!
//! The ledger is append-only except for the one-way unspent → spent
//! transition, and it only ever changes when a transaction reaches
//! finality — the mutating surface is `pub(crate)` and reachable solely
//! from the settlement module. Everything else reads.

pub mod book;
pub mod output;

pub use book::{LedgerError, OutputLedger};
pub use output::{NewOutput, Output, OutputId};
