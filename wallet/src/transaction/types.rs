//! The transaction structure and its canonical byte encoding.
//!
//! A transaction consumes a set of recorded outputs (referenced by id) and
//! creates a set of new outputs, each addressed via a stealth tag. The
//! transaction id is the double-SHA-256 hash of a deterministic binary
//! serialization of everything except the authorization fields, so the id
//! is stable across signing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::amount::Amount;
use crate::config::SIGNATURE_LENGTH;
use crate::keys::verify_spend_signature;
use crate::ledger::{NewOutput, OutputId};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A value transfer: consumed inputs on one side, fresh outputs and a fee
/// on the other.
///
/// The balance law `sum(inputs) == sum(outputs) + fee` is not encoded in
/// the structure itself (the input values live in the ledger, not here);
/// it is enforced at construction by the engine and re-checked against the
/// ledger when the transaction finalizes.
///
/// # Canonical Byte Format
///
/// Signing and id computation use [`Transaction::signable_bytes`], which
/// deterministically serializes: version, inputs, outputs, fee, timestamp.
/// `id`, `sender_public_key`, and `signature` are excluded, so signing a
/// transaction never changes its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id: `hex(double_sha256(signable_bytes))`.
    pub id: String,

    /// Format version at the time of creation.
    pub version: u16,

    /// References to the outputs this transaction consumes. Their values
    /// are resolved against the ledger, never restated here.
    pub inputs: Vec<OutputId>,

    /// The outputs this transaction creates, in order. Output `i` of a
    /// finalized transaction gets id `{tx_id}:{i}`.
    pub outputs: Vec<NewOutput>,

    /// Fee in base units. `sum(input values) - sum(output values)`.
    pub fee: Amount,

    /// Unix timestamp in milliseconds when the transaction was built.
    pub timestamp: u64,

    /// Hex-encoded Ed25519 public key of the spend key that authorized
    /// this transaction. Embedded so verification needs no key lookup.
    pub sender_public_key: Option<String>,

    /// Hex-encoded Ed25519 signature over [`Transaction::signable_bytes`].
    /// `None` until the engine signs.
    pub signature: Option<String>,
}

impl Transaction {
    /// Returns the canonical byte representation used for signing and id
    /// computation.
    ///
    /// Deterministic concatenation with null-byte separators for strings
    /// and fixed-width little-endian integers. JSON/serde is intentionally
    /// avoided because field ordering is not guaranteed across formats.
    ///
    /// Excluded fields: `id`, `sender_public_key`, `signature`.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        // Format version (2 bytes, LE).
        buf.extend_from_slice(&self.version.to_le_bytes());

        // Inputs: count, then each reference as tx id string + index.
        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(input.tx_id.as_bytes());
            buf.push(0x00);
            buf.extend_from_slice(&input.index.to_le_bytes());
        }

        // Outputs: count, then each tag pair + value.
        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(output.stealth.ephemeral.as_bytes());
            buf.push(0x00);
            buf.extend_from_slice(output.stealth.tag.as_bytes());
            buf.push(0x00);
            buf.extend_from_slice(&output.amount.base_units().to_le_bytes());
        }

        // Fee as little-endian u128.
        buf.extend_from_slice(&self.fee.base_units().to_le_bytes());

        // Timestamp as little-endian u64.
        buf.extend_from_slice(&self.timestamp.to_le_bytes());

        buf
    }

    /// Computes the transaction id from the current field values.
    ///
    /// `id = hex(double_sha256(signable_bytes))`. Deterministic and
    /// independent of signature state.
    pub fn compute_id(&self) -> String {
        hex::encode(double_sha256(&self.signable_bytes()))
    }

    /// Returns `true` if the transaction carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Verifies the embedded signature against the embedded public key.
    ///
    /// Returns `false` for unsigned transactions, malformed hex, or a
    /// signature that does not cover the current signable bytes.
    pub fn verify_signature(&self) -> bool {
        let (Some(public_hex), Some(signature_hex)) =
            (&self.sender_public_key, &self.signature)
        else {
            return false;
        };
        let Ok(public) = hex::decode(public_hex) else {
            return false;
        };
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        if signature.len() != SIGNATURE_LENGTH {
            return false;
        }
        verify_spend_signature(&public, &self.signable_bytes(), &signature)
    }

    /// Total value created by this transaction's outputs, fee included.
    ///
    /// A correctly built transaction satisfies
    /// `declared_spend() == sum of its input values`.
    pub fn declared_spend(&self) -> Result<Amount, crate::amount::AmountError> {
        let outputs = Amount::checked_sum(self.outputs.iter().map(|o| o.amount))?;
        outputs.checked_add(self.fee)
    }
}

/// `sha256(sha256(data))`, the id hash for transactions.
fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
