//! Transaction broadcast.
//!
//! The [`Broadcaster`] hands signed transactions to a [`ConsensusClient`]
//! and enforces two rules the rest of the pipeline relies on:
//!
//! - **At most one submission per accepted transaction id.** Broadcasting
//!   a transaction the endpoint already took is a no-op returning the same
//!   id, not a second submission.
//! - **Pending before submitted.** The transaction is registered with the
//!   settlement scheduler before the client sees it, so a finality
//!   notification can never arrive for an unregistered id, no matter how
//!   fast consensus is.
//!
//! Transient network failures are retried a bounded number of times. A
//! rejection from consensus is a verdict and is never retried. When
//! retries are exhausted the transaction stays Pending — the last attempt
//! may have reached consensus, and inventing a local rejection would let
//! the tracker contradict a later finality notification — but the id is
//! released for resubmission: a failed delivery is not an acceptance, and
//! the caller may hand the same transaction back in.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BROADCAST_MAX_ATTEMPTS, BROADCAST_RETRY_BACKOFF};
use crate::settlement::SettlementScheduler;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Consensus seam
// ---------------------------------------------------------------------------

/// A single submission failure, as reported by the consensus endpoint.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Consensus examined the transaction and refused it. Permanent.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The transaction may not have reached consensus at all. Transient;
    /// the broadcaster retries these.
    #[error("network error: {0}")]
    Network(String),
}

/// The wire between a wallet and whatever accepts its transactions. The
/// devnet implements this in-process; a real deployment would put an RPC
/// client behind it.
#[async_trait]
pub trait ConsensusClient: Send + Sync {
    /// Submits one signed transaction for inclusion.
    async fn submit(&self, tx: &Transaction) -> Result<(), SubmitError>;
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

/// Errors surfaced by [`Broadcaster::broadcast`].
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Consensus rejected the transaction outright.
    #[error("transaction '{tx_id}' rejected at broadcast: {reason}")]
    Rejected {
        /// The rejected transaction.
        tx_id: String,
        /// Reason reported by consensus.
        reason: String,
    },

    /// Every attempt failed with a transient error. The transaction's
    /// fate is unknown; it remains Pending in the tracker.
    #[error("transaction '{tx_id}' broadcast failed after {attempts} attempts: {last_error}")]
    Network {
        /// The transaction whose submission kept failing.
        tx_id: String,
        /// How many submissions were attempted.
        attempts: u32,
        /// The final attempt's error text.
        last_error: String,
    },
}

/// Submits transactions to consensus, exactly once per id.
pub struct Broadcaster {
    client: Arc<dyn ConsensusClient>,
    scheduler: Arc<SettlementScheduler>,
    submitted: DashSet<String>,
}

impl Broadcaster {
    /// Creates a broadcaster feeding `client` and tracking via `scheduler`.
    pub fn new(client: Arc<dyn ConsensusClient>, scheduler: Arc<SettlementScheduler>) -> Self {
        Self {
            client,
            scheduler,
            submitted: DashSet::new(),
        }
    }

    /// Broadcasts a signed transaction and returns its id.
    ///
    /// Returns as soon as consensus *accepts* the submission; finality is
    /// asynchronous and observed through the settlement scheduler. Calling
    /// again with an id the endpoint already took returns the id without
    /// touching the network. An id whose every attempt failed with a
    /// network error is not considered taken — a later call submits it
    /// again.
    pub async fn broadcast(&self, tx: Transaction) -> Result<String, BroadcastError> {
        let tx_id = tx.id.clone();

        if !self.submitted.insert(tx_id.clone()) {
            debug!(tx_id = %tx_id, "duplicate broadcast suppressed");
            return Ok(tx_id);
        }

        self.scheduler.register_pending(tx.clone());

        let mut last_error = String::new();
        for attempt in 1..=BROADCAST_MAX_ATTEMPTS {
            match self.client.submit(&tx).await {
                Ok(()) => {
                    info!(tx_id = %tx_id, attempt, "broadcast accepted");
                    return Ok(tx_id);
                }
                Err(SubmitError::Rejected(reason)) => {
                    warn!(tx_id = %tx_id, reason = %reason, "broadcast rejected");
                    // Ignore the tracker result: the id was registered above.
                    let _ = self.scheduler.observe_rejected(&tx_id, &reason);
                    return Err(BroadcastError::Rejected { tx_id, reason });
                }
                Err(SubmitError::Network(message)) => {
                    warn!(tx_id = %tx_id, attempt, error = %message, "broadcast attempt failed");
                    last_error = message;
                    if attempt < BROADCAST_MAX_ATTEMPTS {
                        tokio::time::sleep(BROADCAST_RETRY_BACKOFF).await;
                    }
                }
            }
        }

        // Nothing reached the endpoint for certain, so the id is not
        // "submitted" — release it so the caller can retry the same
        // transaction instead of being silently no-op'd forever. The
        // Pending tracker entry stays: register_pending on the retry is
        // idempotent.
        self.submitted.remove(&tx_id);
        Err(BroadcastError::Network {
            tx_id,
            attempts: BROADCAST_MAX_ATTEMPTS,
            last_error,
        })
    }

    /// Returns `true` if an id has been handed to the endpoint (accepted
    /// or rejected — not merely attempted and lost to the network).
    pub fn was_submitted(&self, tx_id: &str) -> bool {
        self.submitted.contains(tx_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::address::Address;
    use crate::amount::Amount;
    use crate::keys::{StealthTag, WalletKeys};
    use crate::ledger::{NewOutput, OutputLedger};
    use crate::settlement::SettlementState;
    use crate::transaction::{LinearFee, TransactionEngine};

    /// Scripted endpoint: fails the first `failures` submissions with a
    /// network error, optionally rejects everything after that.
    struct ScriptedClient {
        failures: u32,
        reject: bool,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn flaky(failures: u32) -> Self {
            Self {
                failures,
                reject: false,
                calls: AtomicU32::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                failures: 0,
                reject: true,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConsensusClient for ScriptedClient {
        async fn submit(&self, _tx: &Transaction) -> Result<(), SubmitError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SubmitError::Network("connection refused".into()));
            }
            if self.reject {
                return Err(SubmitError::Rejected("signature check failed".into()));
            }
            Ok(())
        }
    }

    fn signed_transfer() -> (Arc<SettlementScheduler>, Transaction) {
        let ledger = Arc::new(OutputLedger::new());
        let scheduler = Arc::new(SettlementScheduler::new(Arc::clone(&ledger)));
        let sender = WalletKeys::derive("cast-sender", "cast passphrase").unwrap();
        scheduler.install_genesis(vec![NewOutput {
            stealth: StealthTag::address_to(sender.view().public()),
            amount: Amount::new(1_000).unwrap(),
        }]);
        let recipient = WalletKeys::derive("cast-recipient", "cast passphrase").unwrap();
        let engine = TransactionEngine::new(ledger, LinearFee::devnet());
        let tx = engine
            .build_send(
                &sender,
                &Address::from_view_key(recipient.view().public()),
                Amount::new(250).unwrap(),
            )
            .unwrap();
        (scheduler, tx)
    }

    #[tokio::test]
    async fn successful_broadcast_registers_pending() {
        let (scheduler, tx) = signed_transfer();
        let tx_id = tx.id.clone();
        let client = Arc::new(ScriptedClient::flaky(0));
        let caster = Broadcaster::new(client.clone(), Arc::clone(&scheduler));

        let returned = caster.broadcast(tx).await.unwrap();
        assert_eq!(returned, tx_id);
        assert_eq!(client.calls(), 1);
        assert_eq!(scheduler.state_of(&tx_id), Some(SettlementState::Pending));
    }

    #[tokio::test]
    async fn duplicate_broadcast_is_suppressed() {
        let (scheduler, tx) = signed_transfer();
        let tx_id = tx.id.clone();
        let client = Arc::new(ScriptedClient::flaky(0));
        let caster = Broadcaster::new(client.clone(), scheduler);

        caster.broadcast(tx.clone()).await.unwrap();
        let again = caster.broadcast(tx).await.unwrap();

        assert_eq!(again, tx_id);
        assert_eq!(client.calls(), 1, "second call must not reach the network");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let (scheduler, tx) = signed_transfer();
        let client = Arc::new(ScriptedClient::flaky(2));
        let caster = Broadcaster::new(client.clone(), scheduler);

        caster.broadcast(tx).await.unwrap();
        assert_eq!(client.calls(), 3, "two failures plus the success");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_leave_pending() {
        let (scheduler, tx) = signed_transfer();
        let tx_id = tx.id.clone();
        let client = Arc::new(ScriptedClient::flaky(u32::MAX));
        let caster = Broadcaster::new(client.clone(), Arc::clone(&scheduler));

        let err = caster.broadcast(tx).await.unwrap_err();
        assert!(matches!(err, BroadcastError::Network { attempts, .. }
            if attempts == BROADCAST_MAX_ATTEMPTS));
        assert_eq!(client.calls(), BROADCAST_MAX_ATTEMPTS);

        // Fate unknown: the tracker must not invent a rejection, and the
        // id must not count as submitted.
        assert_eq!(scheduler.state_of(&tx_id), Some(SettlementState::Pending));
        assert!(!caster.was_submitted(&tx_id));
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_releases_the_id_for_retry() {
        let (scheduler, tx) = signed_transfer();
        let tx_id = tx.id.clone();
        // The endpoint is down for exactly one full round of attempts.
        let client = Arc::new(ScriptedClient::flaky(BROADCAST_MAX_ATTEMPTS));
        let caster = Broadcaster::new(client.clone(), Arc::clone(&scheduler));

        let err = caster.broadcast(tx.clone()).await.unwrap_err();
        assert!(matches!(err, BroadcastError::Network { .. }));

        // The retry must reach the network again, not be swallowed as a
        // duplicate of a submission that never happened.
        let returned = caster.broadcast(tx).await.unwrap();
        assert_eq!(returned, tx_id);
        assert_eq!(
            client.calls(),
            BROADCAST_MAX_ATTEMPTS + 1,
            "retry after exhaustion must resubmit"
        );
        assert!(caster.was_submitted(&tx_id));
        assert_eq!(scheduler.state_of(&tx_id), Some(SettlementState::Pending));
    }

    #[tokio::test]
    async fn rejection_is_terminal_and_never_retried() {
        let (scheduler, tx) = signed_transfer();
        let tx_id = tx.id.clone();
        let client = Arc::new(ScriptedClient::rejecting());
        let caster = Broadcaster::new(client.clone(), Arc::clone(&scheduler));

        let err = caster.broadcast(tx).await.unwrap_err();
        assert!(matches!(err, BroadcastError::Rejected { .. }));
        assert_eq!(client.calls(), 1);
        assert!(matches!(
            scheduler.state_of(&tx_id),
            Some(SettlementState::Rejected { .. })
        ));
    }
}
