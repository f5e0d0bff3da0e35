//! # Protocol Configuration & Constants
//!
//! Every magic number in Umbra lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values define the DNA of the wallet protocol. Changing the supply
//! cap or the address format after launch is somewhere between "difficult"
//! and "career-ending", so choose wisely during devnet.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Human-readable prefix for all Umbra addresses.
/// Bech32 HRP — short enough to type, long enough to be unambiguous.
pub const ADDRESS_HRP: &str = "umbra";

/// Address format version byte. Prefixed to the view public key before
/// Bech32 encoding so the format can evolve without ambiguity.
pub const ADDRESS_VERSION: u8 = 0x01;

/// Raw address payload length: 1 version byte + 32-byte X25519 view pubkey.
pub const ADDRESS_PAYLOAD_LENGTH: usize = 33;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Transaction format version. Bump on breaking changes to the canonical
/// signable-byte layout. A.k.a. "everyone re-syncs".
pub const TX_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 for spend authorization. Deterministic signatures, 128-bit
/// security in 32+32 bytes, and well-audited constant-time implementations.
pub const SPEND_ALGORITHM: &str = "Ed25519";

/// X25519 for view-key output detection. Same curve as Ed25519 in
/// Montgomery form — Diffie-Hellman without spend authority.
pub const VIEW_ALGORITHM: &str = "X25519";

/// Secret and public key lengths. 32 bytes for both roles.
pub const KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// KDF context prefix for deriving wallet keys from passphrase material.
/// The wallet name and key role are appended, so two wallets (or the two
/// roles within one wallet) never share key material.
pub const KEY_DERIVATION_CONTEXT: &str = "umbra wallet v1 key derivation";

/// KDF context for one-time output tags (stealth detection).
pub const OUTPUT_TAG_CONTEXT: &str = "umbra output tag v1";

// ---------------------------------------------------------------------------
// Monetary Parameters
// ---------------------------------------------------------------------------

/// Maximum total supply in base units: 10^19.
///
/// Note that this exceeds `i64::MAX` (and 2^63) — devnet genesis grants
/// are on the order of 2.5 * 10^18 per wallet. All amount arithmetic is
/// 128-bit and checked; transport encodings use decimal strings, never
/// floating point.
pub const MAX_SUPPLY: u128 = 10_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Fee Schedule
// ---------------------------------------------------------------------------

/// Devnet base fee in base units. Zero on devnet so that balance
/// assertions in the integration suite come out exact.
pub const DEVNET_FEE_BASE: u128 = 0;

/// Devnet per-input fee coefficient.
pub const DEVNET_FEE_PER_INPUT: u128 = 0;

/// Devnet per-output fee coefficient.
pub const DEVNET_FEE_PER_OUTPUT: u128 = 0;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long `wait_final` is willing to block before reporting a timeout.
/// There is no protocol-level latency bound — this is a client-side
/// patience limit, and timing out does not cancel the settlement.
pub const FINALITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Artificial finality delay used by the in-process devnet consensus.
/// Long enough that an immediate balance read observes the pre-broadcast
/// state, short enough that tests stay fast.
pub const DEVNET_FINALITY_DELAY: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Broadcast Retry Policy
// ---------------------------------------------------------------------------

/// Maximum submission attempts for one transaction when the consensus
/// client reports transient network failures. Rejections are never retried.
pub const BROADCAST_MAX_ATTEMPTS: u32 = 3;

/// Backoff between broadcast retries. Flat rather than exponential — with
/// three attempts there is nothing to be gained from a fancier curve.
pub const BROADCAST_RETRY_BACKOFF: Duration = Duration::from_millis(200);
