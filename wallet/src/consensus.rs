//! In-process devnet consensus.
//!
//! [`DevnetConsensus`] stands where a real network would: it accepts
//! submissions, performs the stateless checks a validator would run first,
//! and finalizes every accepted transaction after a short fixed delay.
//! The delay is the point. Callers experience the same Pending window and
//! asynchronous finality they would against a real chain, just compressed
//! enough for tests and local development.
//!
//! Stateful validation (inputs exist, inputs unspent, values conserved)
//! happens at apply time inside the settlement pipeline, which is also
//! where a real network's verdict would land.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::broadcast::{ConsensusClient, SubmitError};
use crate::config::DEVNET_FINALITY_DELAY;
use crate::settlement::SettlementScheduler;
use crate::transaction::Transaction;

/// The devnet's stand-in for a consensus network.
pub struct DevnetConsensus {
    scheduler: Arc<SettlementScheduler>,
    finality_delay: Duration,
}

impl DevnetConsensus {
    /// Creates a devnet consensus reporting finality to `scheduler` after
    /// the default delay.
    pub fn new(scheduler: Arc<SettlementScheduler>) -> Self {
        Self::with_delay(scheduler, DEVNET_FINALITY_DELAY)
    }

    /// Creates a devnet consensus with an explicit finality delay.
    pub fn with_delay(scheduler: Arc<SettlementScheduler>, finality_delay: Duration) -> Self {
        Self {
            scheduler,
            finality_delay,
        }
    }

    /// Stateless admission checks, the devnet equivalent of a validator's
    /// first look at a submission.
    fn admit(tx: &Transaction) -> Result<(), SubmitError> {
        if tx.inputs.is_empty() {
            return Err(SubmitError::Rejected("transaction consumes no inputs".into()));
        }
        if tx.outputs.is_empty() {
            return Err(SubmitError::Rejected("transaction creates no outputs".into()));
        }
        if !tx.verify_signature() {
            return Err(SubmitError::Rejected(
                "missing or invalid spend signature".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConsensusClient for DevnetConsensus {
    async fn submit(&self, tx: &Transaction) -> Result<(), SubmitError> {
        Self::admit(tx)?;

        let tx_id = tx.id.clone();
        let scheduler = Arc::clone(&self.scheduler);
        let delay = self.finality_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(tx_id = %tx_id, "devnet finality reached");
            if let Err(err) = scheduler.observe_final(&tx_id) {
                warn!(tx_id = %tx_id, %err, "devnet finality not applied");
            }
        });

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::amount::Amount;
    use crate::broadcast::Broadcaster;
    use crate::keys::{StealthTag, WalletKeys};
    use crate::ledger::{NewOutput, OutputLedger};
    use crate::settlement::SettlementState;
    use crate::transaction::{LinearFee, TransactionEngine};

    struct Devnet {
        ledger: Arc<OutputLedger>,
        scheduler: Arc<SettlementScheduler>,
        engine: TransactionEngine,
        caster: Broadcaster,
    }

    fn devnet_with_funds(owner: &WalletKeys, value: u128) -> Devnet {
        let ledger = Arc::new(OutputLedger::new());
        let scheduler = Arc::new(SettlementScheduler::new(Arc::clone(&ledger)));
        scheduler.install_genesis(vec![NewOutput {
            stealth: StealthTag::address_to(owner.view().public()),
            amount: Amount::new(value).unwrap(),
        }]);
        let consensus = Arc::new(DevnetConsensus::with_delay(
            Arc::clone(&scheduler),
            Duration::from_millis(10),
        ));
        Devnet {
            ledger: Arc::clone(&ledger),
            scheduler: Arc::clone(&scheduler),
            engine: TransactionEngine::new(ledger, LinearFee::devnet()),
            caster: Broadcaster::new(consensus, scheduler),
        }
    }

    #[tokio::test]
    async fn accepted_submission_finalizes_after_the_delay() {
        let sender = WalletKeys::derive("devnet-sender", "devnet passphrase").unwrap();
        let devnet = devnet_with_funds(&sender, 1_000);
        let recipient = WalletKeys::derive("devnet-recipient", "devnet passphrase").unwrap();

        let tx = devnet
            .engine
            .build_send(
                &sender,
                &Address::from_view_key(recipient.view().public()),
                Amount::new(300).unwrap(),
            )
            .unwrap();
        let tx_id = devnet.caster.broadcast(tx).await.unwrap();

        // Accepted but not yet final.
        assert_eq!(
            devnet.scheduler.state_of(&tx_id),
            Some(SettlementState::Pending)
        );

        let height = devnet
            .scheduler
            .wait_final(&tx_id, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(height, 1);
        assert_eq!(devnet.ledger.unspent_under(recipient.view()).len(), 1);
    }

    #[tokio::test]
    async fn unsigned_submission_is_rejected() {
        let sender = WalletKeys::derive("devnet-unsigned", "devnet passphrase").unwrap();
        let devnet = devnet_with_funds(&sender, 1_000);
        let recipient = WalletKeys::derive("devnet-unsigned-rcpt", "devnet passphrase").unwrap();

        let mut tx = devnet
            .engine
            .build_send(
                &sender,
                &Address::from_view_key(recipient.view().public()),
                Amount::new(300).unwrap(),
            )
            .unwrap();
        tx.signature = None;
        tx.sender_public_key = None;

        let err = devnet.caster.broadcast(tx).await.unwrap_err();
        assert!(err.to_string().contains("signature"));
    }

    #[tokio::test]
    async fn tampered_submission_is_rejected() {
        let sender = WalletKeys::derive("devnet-tamper", "devnet passphrase").unwrap();
        let devnet = devnet_with_funds(&sender, 1_000);
        let recipient = WalletKeys::derive("devnet-tamper-rcpt", "devnet passphrase").unwrap();

        let mut tx = devnet
            .engine
            .build_send(
                &sender,
                &Address::from_view_key(recipient.view().public()),
                Amount::new(300).unwrap(),
            )
            .unwrap();
        tx.outputs[0].amount = Amount::new(999).unwrap();

        let err = devnet.caster.broadcast(tx).await.unwrap_err();
        assert!(err.to_string().contains("signature"));
    }
}
