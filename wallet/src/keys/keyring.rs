//! # Deterministic Wallet Key Derivation
//!
//! A wallet's keys are derived from its passphrase with `blake3::derive_key`
//! under a context string that bakes in both the wallet name and the key
//! role. The same (name, passphrase) pair always yields the same keys;
//! different names — or the two roles within one wallet — never share key
//! material, because the KDF context differs.
//!
//! ## Security considerations
//!
//! - Secret key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.
//! - `Debug` implementations print public halves only.
//! - Persistence of key material is deliberately out of scope here — this
//!   module is pure key arithmetic, no I/O.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;
use x25519_dalek::{PublicKey as ViewPublicKey, StaticSecret};

use crate::config::{KEY_DERIVATION_CONTEXT, SIGNATURE_LENGTH};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during key derivation.
///
/// Intentionally vague about key material — leaking details about secrets
/// through error messages is a classic footgun.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The passphrase is empty or otherwise unusable as input material.
    #[error("malformed passphrase: empty input material")]
    MalformedPassphrase,

    /// The wallet name is empty. Names are part of the derivation context,
    /// so an empty name would collapse distinct wallets onto one key.
    #[error("malformed wallet name: must be non-empty")]
    MalformedName,
}

// ---------------------------------------------------------------------------
// SpendKeypair
// ---------------------------------------------------------------------------

/// The spend role: an Ed25519 keypair that authorizes transactions.
///
/// This is the crown jewel. A wallet holding one of these has full spend
/// authority over every output its view key can see.
pub struct SpendKeypair {
    signing_key: SigningKey,
}

impl SpendKeypair {
    /// Constructs a spend keypair from a 32-byte seed.
    pub(crate) fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public verification half, safe to embed in transactions.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Raw public key bytes (32 bytes).
    pub fn public_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signs a message. Ed25519 is deterministic — same key, same message,
    /// same signature. No nonce management, no RNG at signing time.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verifies an Ed25519 signature against raw public key bytes.
///
/// Returns `false` on any malformation — wrong lengths, invalid points,
/// bad signatures. Callers get a boolean: the failure mode is not their
/// problem to distinguish.
pub fn verify_spend_signature(public_bytes: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let key_bytes: [u8; 32] = match public_bytes.try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let sig_bytes: [u8; SIGNATURE_LENGTH] = match signature.try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &sig).is_ok()
}

impl Clone for SpendKeypair {
    /// Cloning a spend key is allowed but should make you uncomfortable.
    /// Every copy is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for SpendKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material. Not even "partially".
        write!(f, "SpendKeypair(pub={})", hex::encode(self.public_bytes()))
    }
}

// ---------------------------------------------------------------------------
// ViewKeypair
// ---------------------------------------------------------------------------

/// The view role: an X25519 keypair that detects incoming outputs.
///
/// Knowing the secret half lets a wallet recognize which ledger outputs
/// are addressed to it (see [`super::stealth`]) and therefore compute its
/// balance. It grants no spend authority whatsoever.
pub struct ViewKeypair {
    secret: StaticSecret,
    public: ViewPublicKey,
}

impl ViewKeypair {
    /// Constructs a view keypair from a 32-byte seed.
    pub(crate) fn from_seed(seed: [u8; 32]) -> Self {
        let secret = StaticSecret::from(seed);
        let public = ViewPublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half — the payload of the wallet's address.
    pub fn public(&self) -> &ViewPublicKey {
        &self.public
    }

    /// Raw public key bytes (32 bytes).
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Diffie-Hellman with a counterparty public key. Internal to output
    /// tag computation — do not hand the shared secret to anything else.
    pub(crate) fn diffie_hellman(&self, their_public: &ViewPublicKey) -> [u8; 32] {
        self.secret.diffie_hellman(their_public).to_bytes()
    }
}

impl Clone for ViewKeypair {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret.clone(),
            public: self.public,
        }
    }
}

impl fmt::Debug for ViewKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewKeypair(pub={})", hex::encode(self.public_bytes()))
    }
}

// ---------------------------------------------------------------------------
// WalletKeys
// ---------------------------------------------------------------------------

/// The key material of one named wallet.
///
/// Every wallet has exactly one view keypair. The spend keypair is
/// optional: a wallet derived via [`WalletKeys::derive_view_only`] can
/// watch incoming funds but cannot authorize spends.
#[derive(Clone)]
pub struct WalletKeys {
    name: String,
    view: ViewKeypair,
    spend: Option<SpendKeypair>,
}

impl WalletKeys {
    /// Derives a full wallet (view + spend) from a name and passphrase.
    ///
    /// Deterministic: identical inputs always produce identical keys.
    /// Distinct names produce unrelated keys even under the same
    /// passphrase, because the name is folded into the KDF context.
    ///
    /// # Errors
    ///
    /// [`KeyError::MalformedPassphrase`] for an empty passphrase,
    /// [`KeyError::MalformedName`] for an empty name.
    pub fn derive(name: &str, passphrase: &str) -> Result<Self, KeyError> {
        let view = Self::derive_view_keypair(name, passphrase)?;
        let spend_seed = derive_role_seed(name, passphrase, "spend")?;
        Ok(Self {
            name: name.to_string(),
            view,
            spend: Some(SpendKeypair::from_seed(&spend_seed)),
        })
    }

    /// Derives a view-only wallet: same view keys as [`derive`](Self::derive)
    /// would produce, no spend authority.
    pub fn derive_view_only(name: &str, passphrase: &str) -> Result<Self, KeyError> {
        let view = Self::derive_view_keypair(name, passphrase)?;
        Ok(Self {
            name: name.to_string(),
            view,
            spend: None,
        })
    }

    fn derive_view_keypair(name: &str, passphrase: &str) -> Result<ViewKeypair, KeyError> {
        let view_seed = derive_role_seed(name, passphrase, "view")?;
        Ok(ViewKeypair::from_seed(view_seed))
    }

    /// The wallet's identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The view keypair. Always present.
    pub fn view(&self) -> &ViewKeypair {
        &self.view
    }

    /// The spend keypair, if this wallet has spend authority.
    pub fn spend(&self) -> Option<&SpendKeypair> {
        self.spend.as_ref()
    }

    /// Whether this wallet can authorize spends.
    pub fn can_spend(&self) -> bool {
        self.spend.is_some()
    }
}

impl fmt::Debug for WalletKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletKeys")
            .field("name", &self.name)
            .field("view", &self.view)
            .field("can_spend", &self.can_spend())
            .finish()
    }
}

/// Derives one 32-byte role seed from (name, passphrase, role).
///
/// The KDF context is `"<base>/<role>/<name>"`; the passphrase is the input
/// key material. BLAKE3's derive_key mode gives domain separation for free.
fn derive_role_seed(name: &str, passphrase: &str, role: &str) -> Result<[u8; 32], KeyError> {
    if passphrase.is_empty() {
        return Err(KeyError::MalformedPassphrase);
    }
    if name.is_empty() {
        return Err(KeyError::MalformedName);
    }
    let context = format!("{KEY_DERIVATION_CONTEXT}/{role}/{name}");
    Ok(blake3::derive_key(&context, passphrase.as_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
