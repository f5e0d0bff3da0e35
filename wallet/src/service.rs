//! The wallet service facade.
//!
//! [`WalletService`] wires the whole pipeline together behind the three
//! operations an RPC surface needs: balance, send, address. Wallets are
//! derived on demand from `(name, passphrase)`; there is no wallet file
//! and nothing to unlock, which keeps the facade stateless apart from the
//! shared ledger and settlement tracker.
//!
//! `wallet_sendtoaddress` returns at broadcast *acceptance*. The returned
//! transaction id is a claim ticket against the settlement pipeline, not
//! proof that money moved; callers poll balances or use
//! [`SettlementScheduler::wait_final`] for that.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::amount::Amount;
use crate::broadcast::{Broadcaster, ConsensusClient};
use crate::consensus::DevnetConsensus;
use crate::error::WalletError;
use crate::keys::{StealthTag, WalletKeys};
use crate::ledger::{NewOutput, OutputLedger};
use crate::resolver::BalanceResolver;
use crate::settlement::SettlementScheduler;
use crate::transaction::{LinearFee, TransactionEngine};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Identifies a wallet by its derivation inputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletRequest {
    /// Wallet name; part of the derivation context.
    pub name: String,
    /// Derivation passphrase. Never logged.
    pub passphrase: String,
}

/// Parameters of a transfer request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendRequest {
    /// The sending wallet.
    pub wallet: WalletRequest,
    /// Destination address, bech32-encoded.
    pub to_address: String,
    /// Amount in base units, as a decimal string.
    pub amount: String,
}

// ---------------------------------------------------------------------------
// WalletService
// ---------------------------------------------------------------------------

/// Balance, transfer, and address operations over a shared ledger.
pub struct WalletService {
    ledger: Arc<OutputLedger>,
    scheduler: Arc<SettlementScheduler>,
    resolver: BalanceResolver,
    engine: TransactionEngine,
    caster: Broadcaster,
}

impl WalletService {
    /// Builds a service over an explicit consensus client.
    pub fn new(client: Arc<dyn ConsensusClient>, schedule: LinearFee) -> Self {
        let ledger = Arc::new(OutputLedger::new());
        let scheduler = Arc::new(SettlementScheduler::new(Arc::clone(&ledger)));
        Self {
            resolver: BalanceResolver::new(Arc::clone(&ledger)),
            engine: TransactionEngine::new(Arc::clone(&ledger), schedule),
            caster: Broadcaster::new(client, Arc::clone(&scheduler)),
            ledger,
            scheduler,
        }
    }

    /// Builds a self-contained devnet service: in-process consensus, free
    /// fee schedule, delayed finality.
    pub fn devnet() -> Self {
        let ledger = Arc::new(OutputLedger::new());
        let scheduler = Arc::new(SettlementScheduler::new(Arc::clone(&ledger)));
        let consensus = Arc::new(DevnetConsensus::new(Arc::clone(&scheduler)));
        Self {
            resolver: BalanceResolver::new(Arc::clone(&ledger)),
            engine: TransactionEngine::new(Arc::clone(&ledger), LinearFee::devnet()),
            caster: Broadcaster::new(consensus, Arc::clone(&scheduler)),
            ledger,
            scheduler,
        }
    }

    /// Seeds the genesis distribution with outputs addressed to `address`.
    /// Idempotent; meaningful only before any transaction has settled.
    pub fn seed_genesis(&self, address: &Address, amounts: Vec<Amount>) {
        let outputs = amounts
            .into_iter()
            .map(|amount| NewOutput {
                stealth: StealthTag::address_to(&address.view_key()),
                amount,
            })
            .collect();
        self.scheduler.install_genesis(outputs);
    }

    /// Current balance of the wallet, as a decimal string in base units.
    ///
    /// Only the view key is derived; a passphrase with no spend authority
    /// attached resolves balances exactly like a full wallet.
    pub fn wallet_balance(&self, request: &WalletRequest) -> Result<String, WalletError> {
        let keys = WalletKeys::derive_view_only(&request.name, &request.passphrase)?;
        let balance = self.resolver.balance_of(&keys)?;
        Ok(balance.to_string())
    }

    /// Builds, signs, and broadcasts a transfer; returns the transaction id
    /// once consensus accepts the submission.
    pub async fn wallet_sendtoaddress(&self, request: &SendRequest) -> Result<String, WalletError> {
        let keys = WalletKeys::derive(&request.wallet.name, &request.wallet.passphrase)?;
        let destination = Address::parse(&request.to_address)?;
        let amount: Amount = request.amount.parse()?;

        let tx = self.engine.build_send(&keys, &destination, amount)?;
        let tx_id = self.caster.broadcast(tx).await?;
        info!(tx_id = %tx_id, wallet = %request.wallet.name, "transfer accepted");
        Ok(tx_id)
    }

    /// The wallet's receiving address.
    pub fn wallet_address(&self, request: &WalletRequest) -> Result<String, WalletError> {
        let keys = WalletKeys::derive_view_only(&request.name, &request.passphrase)?;
        Ok(Address::from_view_key(keys.view().public()).encoded())
    }

    /// The shared settlement scheduler, for callers that wait on finality
    /// or subscribe to settlement events.
    pub fn scheduler(&self) -> &Arc<SettlementScheduler> {
        &self.scheduler
    }

    /// The shared ledger, read-only from outside the settlement pipeline.
    pub fn ledger(&self) -> &Arc<OutputLedger> {
        &self.ledger
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
