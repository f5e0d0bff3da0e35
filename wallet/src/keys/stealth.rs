//! # One-Time Output Tags
//!
//! Every ledger output carries a [`StealthTag`]: an ephemeral X25519 public
//! key plus a 32-byte tag derived from the Diffie-Hellman shared secret
//! between that ephemeral key and the recipient's view key.
//!
//! ```text
//! sender:    e <- random, E = e*G
//!            tag = KDF(DH(e, V) || E)          V = recipient view pubkey
//! recipient: tag' = KDF(DH(v, E) || E)         v = recipient view secret
//!            output is mine  <=>  tag' == tag
//! ```
//!
//! Only the holder of the view secret can recompute the tag, so "which
//! outputs belong to this wallet" is a cryptographic question the ledger
//! itself cannot answer. The spend key plays no part here — detection and
//! authority stay separated.
//!
//! A fresh ephemeral key is drawn per output, so two payments to the same
//! address produce unlinkable tags.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey as ViewPublicKey};

use super::keyring::ViewKeypair;
use crate::config::OUTPUT_TAG_CONTEXT;

/// The recipient-detection material attached to one output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthTag {
    /// Compressed ephemeral X25519 public key, hex-encoded. Generated by
    /// the sender, one per output, never reused.
    pub ephemeral: String,

    /// `KDF(shared_secret || ephemeral_pub)`, hex-encoded. Matchable only
    /// with the recipient's view secret.
    pub tag: String,
}

impl StealthTag {
    /// Creates a tag addressed to the given view public key.
    ///
    /// Draws a fresh ephemeral secret from the OS RNG; the
    /// `EphemeralSecret` type enforces single use at the type level.
    pub fn address_to(recipient_view: &ViewPublicKey) -> Self {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = ViewPublicKey::from(&ephemeral_secret);
        let shared = ephemeral_secret.diffie_hellman(recipient_view);
        let tag = derive_tag(shared.as_bytes(), &ephemeral_public.to_bytes());
        Self {
            ephemeral: hex::encode(ephemeral_public.to_bytes()),
            tag: hex::encode(tag),
        }
    }

    /// Returns `true` if this tag is addressed to the given view keypair.
    ///
    /// Malformed tags (bad hex, wrong lengths) simply don't match —
    /// scanning a ledger must not be interruptible by a garbage output.
    pub fn matches(&self, view: &ViewKeypair) -> bool {
        let ephemeral_bytes: [u8; 32] = match hex::decode(&self.ephemeral) {
            Ok(v) => match v.try_into() {
                Ok(b) => b,
                Err(_) => return false,
            },
            Err(_) => return false,
        };
        let ephemeral_public = ViewPublicKey::from(ephemeral_bytes);
        let shared = view.diffie_hellman(&ephemeral_public);
        let expected = derive_tag(&shared, &ephemeral_bytes);
        self.tag == hex::encode(expected)
    }
}

/// `BLAKE3_derive_key(context, shared || ephemeral)`.
///
/// Binding the ephemeral public key into the tag prevents a tag computed
/// for one ephemeral key from being replayed under another.
fn derive_tag(shared_secret: &[u8; 32], ephemeral_public: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(OUTPUT_TAG_CONTEXT);
    hasher.update(shared_secret);
    hasher.update(ephemeral_public);
    *hasher.finalize().as_bytes()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
