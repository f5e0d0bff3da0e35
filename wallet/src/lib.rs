// Copyright (c) 2026 Umbra Labs. MIT License.
// See LICENSE for details.

//! # Umbra Wallet — Core Library
//!
//! A balance and settlement engine for a privacy-leaning payment network.
//! Umbra's organizing idea is that *seeing* money and *moving* money are
//! different powers and deserve different keys: the X25519 view key can
//! detect the outputs a wallet owns (and therefore its balance), while the
//! Ed25519 spend key is the only thing that can authorize a transfer.
//!
//! The second idea is that broadcast is not settlement. A transfer returns
//! as soon as consensus accepts it; balances move only when the settlement
//! pipeline finalizes the transaction against the ledger. Everything in the
//! public API is honest about that gap.
//!
//! ## Architecture
//!
//! - **keys** — Key derivation, role separation, stealth output tags.
//! - **address** — Bech32 receiving addresses wrapping the view key.
//! - **amount** — Checked 128-bit base-unit arithmetic. No floats, ever.
//! - **ledger** — The output book: append, one-way spend, atomic apply.
//! - **resolver** — Balance = sum of unspent outputs under a view key.
//! - **transaction** — Construction, fee schedule, selection, signing.
//! - **broadcast** — At-most-once submission to a consensus endpoint.
//! - **settlement** — Pending → Final | Rejected, and the only ledger writer.
//! - **consensus** — The in-process devnet finality source.
//! - **service** — The facade the node exposes over JSON-RPC.
//!
//! ## Design Philosophy
//!
//! 1. The ledger has one writer. Everyone else reads.
//! 2. Value is conserved by construction and re-checked at settlement.
//! 3. If it touches money, it has tests. Plural.

pub mod address;
pub mod amount;
pub mod broadcast;
pub mod config;
pub mod consensus;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod resolver;
pub mod service;
pub mod settlement;
pub mod transaction;

pub use address::Address;
pub use amount::Amount;
pub use error::WalletError;
pub use keys::WalletKeys;
pub use service::{SendRequest, WalletRequest, WalletService};
