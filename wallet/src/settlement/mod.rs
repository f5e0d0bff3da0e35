//! # Settlement Pipeline
//!
//! A broadcast transaction is not money moved. It enters this pipeline as
//! **Pending** and leaves in exactly one terminal state:
//!
//! - **Final** -- consensus finalized it; the ledger atomically marks its
//!   inputs spent and records its outputs, and balances move.
//! - **Rejected** -- consensus refused it, or applying it to the ledger
//!   failed (a competing transaction finalized one of its inputs first).
//!
//! Terminal states are immutable. A finality notification for a rejected
//! transaction, or a rejection for a final one, is logged and dropped.
//!
//! The [`SettlementScheduler`] is the only component holding write access
//! to the [`OutputLedger`]; everything else in the crate reads. Callers
//! who need synchronous semantics block on [`SettlementScheduler::wait_final`],
//! which distinguishes "rejected" from "still pending when I gave up".

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ledger::{LedgerError, NewOutput, OutputLedger};
use crate::transaction::Transaction;

/// Capacity of the settlement event channel. Slow subscribers that fall
/// further behind than this observe a lag and re-read tracker state.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

/// Where a tracked transaction sits in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementState {
    /// Broadcast accepted, finality outcome unknown.
    Pending,
    /// Terminal: applied to the ledger at the given height.
    Final {
        /// Ledger height at which the transaction was applied.
        height: u64,
    },
    /// Terminal: will never be applied.
    Rejected {
        /// Why consensus (or the ledger) refused the transaction.
        reason: String,
    },
}

impl SettlementState {
    /// Returns `true` for the immutable end states.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementState::Pending)
    }
}

/// One state transition, published to all subscribers.
#[derive(Clone, Debug)]
pub struct SettlementEvent {
    /// The transaction that moved.
    pub tx_id: String,
    /// The state it moved to.
    pub state: SettlementState,
}

/// Errors surfaced to callers waiting on settlement.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The transaction id was never registered with this scheduler.
    #[error("transaction '{0}' is not tracked")]
    Unknown(String),

    /// The transaction reached the Rejected terminal state.
    #[error("transaction '{tx_id}' rejected: {reason}")]
    Rejected {
        /// The rejected transaction.
        tx_id: String,
        /// Reason recorded at rejection.
        reason: String,
    },

    /// The transaction was still pending when the caller's patience ran
    /// out. Says nothing about the eventual outcome.
    #[error("transaction '{tx_id}' not final within {waited:?}")]
    Timeout {
        /// The still-pending transaction.
        tx_id: String,
        /// How long the caller waited.
        waited: Duration,
    },
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct TrackedTx {
    transaction: Transaction,
    state: SettlementState,
}

/// Tracks every broadcast transaction to its terminal state and applies
/// finalized ones to the ledger.
pub struct SettlementScheduler {
    ledger: Arc<OutputLedger>,
    tracked: DashMap<String, TrackedTx>,
    events: broadcast::Sender<SettlementEvent>,
}

impl SettlementScheduler {
    /// Creates a scheduler owning write access to `ledger`.
    pub fn new(ledger: Arc<OutputLedger>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ledger,
            tracked: DashMap::new(),
            events,
        }
    }

    /// Installs the genesis distribution at height 0. Idempotent.
    pub fn install_genesis(&self, outputs: Vec<NewOutput>) {
        self.ledger.seed_genesis(outputs);
    }

    /// Registers a freshly broadcast transaction as Pending.
    ///
    /// Re-registering a known id is a no-op; the first registration wins.
    pub fn register_pending(&self, transaction: Transaction) {
        let tx_id = transaction.id.clone();
        let mut inserted = false;
        self.tracked.entry(tx_id.clone()).or_insert_with(|| {
            inserted = true;
            TrackedTx {
                transaction,
                state: SettlementState::Pending,
            }
        });
        if inserted {
            debug!(tx_id = %tx_id, "tracking new pending transaction");
        } else {
            debug!(tx_id = %tx_id, "already tracked, registration ignored");
        }
    }

    /// Returns the current state of a tracked transaction.
    pub fn state_of(&self, tx_id: &str) -> Option<SettlementState> {
        self.tracked.get(tx_id).map(|t| t.state.clone())
    }

    /// Returns a copy of a tracked transaction.
    pub fn transaction(&self, tx_id: &str) -> Option<Transaction> {
        self.tracked.get(tx_id).map(|t| t.transaction.clone())
    }

    /// Number of transactions still pending.
    pub fn pending_count(&self) -> usize {
        self.tracked
            .iter()
            .filter(|t| t.state == SettlementState::Pending)
            .count()
    }

    /// Subscribes to settlement state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
        self.events.subscribe()
    }

    /// Handles a finality notification from consensus.
    ///
    /// Applies the transaction to the ledger as one atomic unit and moves
    /// it to Final. If the ledger refuses (an input was finalized away by
    /// a competing transaction) the transaction moves to Rejected instead:
    /// from the wallet's point of view, losing the race *is* rejection.
    ///
    /// Notifications for unknown ids fail; for already-terminal ids they
    /// are dropped.
    pub fn observe_final(&self, tx_id: &str) -> Result<(), SettlementError> {
        let mut entry = self
            .tracked
            .get_mut(tx_id)
            .ok_or_else(|| SettlementError::Unknown(tx_id.to_string()))?;

        if entry.state.is_terminal() {
            warn!(tx_id, state = ?entry.state, "finality for terminal transaction dropped");
            return Ok(());
        }

        let applied = self.ledger.apply_finalized(
            tx_id,
            &entry.transaction.inputs,
            entry.transaction.outputs.clone(),
        );

        let next = match applied {
            Ok(height) => {
                info!(tx_id, height, "transaction finalized");
                SettlementState::Final { height }
            }
            Err(err @ LedgerError::AlreadySpent { .. })
            | Err(err @ LedgerError::UnknownOutput(_)) => {
                warn!(tx_id, %err, "finalized transaction lost its inputs");
                SettlementState::Rejected {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                warn!(tx_id, %err, "ledger refused finalized transaction");
                SettlementState::Rejected {
                    reason: err.to_string(),
                }
            }
        };

        entry.state = next.clone();
        drop(entry);
        self.publish(tx_id, next);
        Ok(())
    }

    /// Handles a rejection notification from consensus.
    ///
    /// Terminal states win: rejecting an already-final transaction is
    /// dropped with a warning.
    pub fn observe_rejected(&self, tx_id: &str, reason: &str) -> Result<(), SettlementError> {
        let mut entry = self
            .tracked
            .get_mut(tx_id)
            .ok_or_else(|| SettlementError::Unknown(tx_id.to_string()))?;

        if entry.state.is_terminal() {
            warn!(tx_id, state = ?entry.state, "rejection for terminal transaction dropped");
            return Ok(());
        }

        info!(tx_id, reason, "transaction rejected");
        let next = SettlementState::Rejected {
            reason: reason.to_string(),
        };
        entry.state = next.clone();
        drop(entry);
        self.publish(tx_id, next);
        Ok(())
    }

    /// Blocks until `tx_id` reaches a terminal state or `timeout` elapses.
    ///
    /// Returns the finalization height on success. A rejection and a
    /// timeout are distinct errors: the first is a verdict, the second
    /// only means the verdict had not arrived yet.
    pub async fn wait_final(&self, tx_id: &str, timeout: Duration) -> Result<u64, SettlementError> {
        // Subscribe before the first state read so a transition between
        // the read and the subscription cannot be missed.
        let mut events = self.events.subscribe();
        let deadline = Instant::now() + timeout;

        loop {
            match self.state_of(tx_id) {
                None => return Err(SettlementError::Unknown(tx_id.to_string())),
                Some(SettlementState::Final { height }) => return Ok(height),
                Some(SettlementState::Rejected { reason }) => {
                    return Err(SettlementError::Rejected {
                        tx_id: tx_id.to_string(),
                        reason,
                    });
                }
                Some(SettlementState::Pending) => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SettlementError::Timeout {
                    tx_id: tx_id.to_string(),
                    waited: timeout,
                });
            }

            match tokio::time::timeout(remaining, events.recv()).await {
                Ok(Ok(event)) if event.tx_id == tx_id => {
                    // Loop re-reads tracker state; the event is only a wakeup.
                }
                Ok(Ok(_)) => {}
                // Lagged or closed: fall through and re-read the tracker.
                Ok(Err(_)) => {}
                Err(_) => {
                    return Err(SettlementError::Timeout {
                        tx_id: tx_id.to_string(),
                        waited: timeout,
                    });
                }
            }
        }
    }

    fn publish(&self, tx_id: &str, state: SettlementState) {
        // Send fails only when nobody subscribes, which is fine.
        let _ = self.events.send(SettlementEvent {
            tx_id: tx_id.to_string(),
            state,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::address::Address;
    use crate::keys::{StealthTag, WalletKeys};
    use crate::transaction::{LinearFee, TransactionEngine};

    fn funded_setup(values: &[u128]) -> (Arc<OutputLedger>, SettlementScheduler, WalletKeys) {
        let ledger = Arc::new(OutputLedger::new());
        let scheduler = SettlementScheduler::new(Arc::clone(&ledger));
        let owner = WalletKeys::derive("settle-owner", "settle passphrase").unwrap();
        scheduler.install_genesis(
            values
                .iter()
                .map(|&v| NewOutput {
                    stealth: StealthTag::address_to(owner.view().public()),
                    amount: Amount::new(v).unwrap(),
                })
                .collect(),
        );
        (ledger, scheduler, owner)
    }

    fn build_transfer(
        ledger: &Arc<OutputLedger>,
        sender: &WalletKeys,
        recipient: &WalletKeys,
        amount: u128,
    ) -> Transaction {
        let engine = TransactionEngine::new(Arc::clone(ledger), LinearFee::devnet());
        let address = Address::from_view_key(recipient.view().public());
        engine
            .build_send(sender, &address, Amount::new(amount).unwrap())
            .unwrap()
    }

    #[test]
    fn finality_applies_to_the_ledger() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let recipient = WalletKeys::derive("settle-recipient", "settle passphrase").unwrap();
        let tx = build_transfer(&ledger, &owner, &recipient, 400);
        let tx_id = tx.id.clone();

        scheduler.register_pending(tx);
        assert_eq!(scheduler.state_of(&tx_id), Some(SettlementState::Pending));

        scheduler.observe_final(&tx_id).unwrap();
        assert_eq!(
            scheduler.state_of(&tx_id),
            Some(SettlementState::Final { height: 1 })
        );

        // Recipient sees the payment, sender sees only the change.
        let received = ledger.unspent_under(recipient.view());
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].amount, Amount::new(400).unwrap());
        let change = ledger.unspent_under(owner.view());
        assert_eq!(change.len(), 1);
        assert_eq!(change[0].amount, Amount::new(600).unwrap());
    }

    #[test]
    fn rejection_leaves_the_ledger_alone() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let recipient = WalletKeys::derive("settle-reject", "settle passphrase").unwrap();
        let tx = build_transfer(&ledger, &owner, &recipient, 400);
        let tx_id = tx.id.clone();

        scheduler.register_pending(tx);
        scheduler.observe_rejected(&tx_id, "validator said no").unwrap();

        assert!(matches!(
            scheduler.state_of(&tx_id),
            Some(SettlementState::Rejected { .. })
        ));
        assert_eq!(ledger.unspent_under(owner.view()).len(), 1);
        assert!(ledger.unspent_under(recipient.view()).is_empty());
    }

    #[test]
    fn terminal_states_are_immutable() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let recipient = WalletKeys::derive("settle-immutable", "settle passphrase").unwrap();
        let tx = build_transfer(&ledger, &owner, &recipient, 100);
        let tx_id = tx.id.clone();

        scheduler.register_pending(tx);
        scheduler.observe_final(&tx_id).unwrap();
        scheduler.observe_rejected(&tx_id, "too late").unwrap();

        assert_eq!(
            scheduler.state_of(&tx_id),
            Some(SettlementState::Final { height: 1 })
        );
    }

    #[test]
    fn conflicting_spends_settle_to_one_winner() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let recipient = WalletKeys::derive("settle-race", "settle passphrase").unwrap();

        // Both transfers consume the same genesis output.
        let first = build_transfer(&ledger, &owner, &recipient, 300);
        let second = build_transfer(&ledger, &owner, &recipient, 500);
        let (first_id, second_id) = (first.id.clone(), second.id.clone());

        scheduler.register_pending(first);
        scheduler.register_pending(second);

        scheduler.observe_final(&first_id).unwrap();
        scheduler.observe_final(&second_id).unwrap();

        assert_eq!(
            scheduler.state_of(&first_id),
            Some(SettlementState::Final { height: 1 })
        );
        assert!(matches!(
            scheduler.state_of(&second_id),
            Some(SettlementState::Rejected { .. })
        ));

        // Exactly one payment landed.
        let received = ledger.unspent_under(recipient.view());
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].amount, Amount::new(300).unwrap());
    }

    #[test]
    fn unknown_id_is_an_error() {
        let (_, scheduler, _) = funded_setup(&[1_000]);
        assert!(matches!(
            scheduler.observe_final("no-such-tx"),
            Err(SettlementError::Unknown(_))
        ));
        assert!(matches!(
            scheduler.observe_rejected("no-such-tx", "nope"),
            Err(SettlementError::Unknown(_))
        ));
    }

    #[tokio::test]
    async fn wait_final_returns_height() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let scheduler = Arc::new(scheduler);
        let recipient = WalletKeys::derive("settle-wait", "settle passphrase").unwrap();
        let tx = build_transfer(&ledger, &owner, &recipient, 100);
        let tx_id = tx.id.clone();
        scheduler.register_pending(tx);

        let waiter = {
            let scheduler = Arc::clone(&scheduler);
            let tx_id = tx_id.clone();
            tokio::spawn(async move { scheduler.wait_final(&tx_id, Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        scheduler.observe_final(&tx_id).unwrap();

        let height = waiter.await.unwrap().unwrap();
        assert_eq!(height, 1);
    }

    #[tokio::test]
    async fn wait_final_distinguishes_rejection_from_timeout() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let recipient = WalletKeys::derive("settle-verdicts", "settle passphrase").unwrap();

        let rejected = build_transfer(&ledger, &owner, &recipient, 100);
        let rejected_id = rejected.id.clone();
        scheduler.register_pending(rejected);
        scheduler.observe_rejected(&rejected_id, "nope").unwrap();
        assert!(matches!(
            scheduler
                .wait_final(&rejected_id, Duration::from_millis(50))
                .await,
            Err(SettlementError::Rejected { .. })
        ));

        let stuck = build_transfer(&ledger, &owner, &recipient, 250);
        let stuck_id = stuck.id.clone();
        scheduler.register_pending(stuck);
        assert!(matches!(
            scheduler
                .wait_final(&stuck_id, Duration::from_millis(50))
                .await,
            Err(SettlementError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn wait_final_unknown_id() {
        let (_, scheduler, _) = funded_setup(&[1_000]);
        assert!(matches!(
            scheduler
                .wait_final("missing", Duration::from_millis(10))
                .await,
            Err(SettlementError::Unknown(_))
        ));
    }

    #[test]
    fn events_reach_subscribers() {
        let (ledger, scheduler, owner) = funded_setup(&[1_000]);
        let recipient = WalletKeys::derive("settle-events", "settle passphrase").unwrap();
        let tx = build_transfer(&ledger, &owner, &recipient, 100);
        let tx_id = tx.id.clone();

        let mut events = scheduler.subscribe();
        scheduler.register_pending(tx);
        scheduler.observe_final(&tx_id).unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.tx_id, tx_id);
        assert_eq!(event.state, SettlementState::Final { height: 1 });
    }
}
