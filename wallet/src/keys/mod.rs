//! # Key Roles
//!
//! Umbra separates balance *visibility* from spend *authority* at the key
//! level:
//!
//! - The **view keypair** (X25519) can detect outputs addressed to the
//!   wallet and therefore compute its balance. It cannot move funds.
//! - The **spend keypair** (Ed25519) authorizes transactions that consume
//!   the wallet's outputs. Without it, a wallet is watch-only.
//!
//! [`keyring`] derives both roles deterministically from a passphrase;
//! [`stealth`] implements the one-time output tags that make visibility a
//! cryptographic property of the view key rather than an access-control
//! list.

pub mod keyring;
pub mod stealth;

pub use keyring::{verify_spend_signature, KeyError, SpendKeypair, ViewKeypair, WalletKeys};
pub use stealth::StealthTag;
