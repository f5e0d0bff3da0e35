//! # Balance Resolution
//!
//! A balance is never stored — it is derived on demand by scanning the
//! finalized ledger for unspent outputs visible under a wallet's view key
//! and summing their amounts. Two reads against the same finalized ledger
//! state return the same answer; pending transactions are invisible
//! because they have not touched the ledger yet.

use std::sync::Arc;

use tracing::debug;

use crate::amount::{Amount, AmountError};
use crate::keys::WalletKeys;
use crate::ledger::OutputLedger;

/// Read-only balance queries over the finalized output ledger.
#[derive(Clone)]
pub struct BalanceResolver {
    ledger: Arc<OutputLedger>,
}

impl BalanceResolver {
    /// Creates a resolver over the shared ledger.
    pub fn new(ledger: Arc<OutputLedger>) -> Self {
        Self { ledger }
    }

    /// Current finalized balance of the wallet.
    ///
    /// Sums with checked 128-bit arithmetic — genesis-scale outputs exceed
    /// 2^63, and a wallet holding several of them must still sum exactly.
    /// Never negative by construction: amounts are unsigned and spent
    /// outputs simply drop out of the scan.
    pub fn balance_of(&self, wallet: &WalletKeys) -> Result<Amount, AmountError> {
        let outputs = self.ledger.unspent_under(wallet.view());
        let balance = Amount::checked_sum(outputs.iter().map(|o| o.amount))?;
        debug!(
            wallet = wallet.name(),
            outputs = outputs.len(),
            balance = %balance,
            "balance resolved"
        );
        Ok(balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::StealthTag;
    use crate::ledger::NewOutput;

    fn wallet(name: &str) -> WalletKeys {
        WalletKeys::derive(name, "test passphrase").unwrap()
    }

    fn output_for(w: &WalletKeys, amount: u128) -> NewOutput {
        NewOutput {
            stealth: StealthTag::address_to(w.view().public()),
            amount: Amount::new(amount).unwrap(),
        }
    }

    #[test]
    fn empty_wallet_has_zero_balance() {
        let ledger = Arc::new(OutputLedger::new());
        let resolver = BalanceResolver::new(ledger);
        let w = wallet("Empty");
        assert_eq!(resolver.balance_of(&w).unwrap(), Amount::ZERO);
    }

    #[test]
    fn balance_sums_only_own_unspent_outputs() {
        let ledger = Arc::new(OutputLedger::new());
        let alice = wallet("Alice");
        let bob = wallet("Bob");
        ledger.seed_genesis(vec![
            output_for(&alice, 100),
            output_for(&alice, 250),
            output_for(&bob, 999),
        ]);

        let resolver = BalanceResolver::new(ledger);
        assert_eq!(
            resolver.balance_of(&alice).unwrap(),
            Amount::new(350).unwrap()
        );
        assert_eq!(resolver.balance_of(&bob).unwrap(), Amount::new(999).unwrap());
    }

    #[test]
    fn genesis_scale_balance_exceeds_u64_sums() {
        // Two outputs of 2.5e18 already sum past i64::MAX. Exactness is
        // the point.
        let ledger = Arc::new(OutputLedger::new());
        let whale = wallet("Whale");
        ledger.seed_genesis(vec![
            output_for(&whale, 2_500_000_000_000_000_000),
            output_for(&whale, 2_500_000_000_000_000_000),
            output_for(&whale, 2_500_000_000_000_000_000),
        ]);

        let resolver = BalanceResolver::new(ledger);
        assert_eq!(
            resolver.balance_of(&whale).unwrap().base_units(),
            7_500_000_000_000_000_000
        );
    }

    #[test]
    fn balance_reads_are_idempotent() {
        let ledger = Arc::new(OutputLedger::new());
        let alice = wallet("Alice");
        ledger.seed_genesis(vec![output_for(&alice, 4_000)]);

        let resolver = BalanceResolver::new(ledger);
        let first = resolver.balance_of(&alice).unwrap();
        let second = resolver.balance_of(&alice).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn view_only_wallet_resolves_balance() {
        let ledger = Arc::new(OutputLedger::new());
        let watch = WalletKeys::derive_view_only("View", "test passphrase").unwrap();
        ledger.seed_genesis(vec![output_for(&watch, 3_000_000_000_000_000_000)]);

        let resolver = BalanceResolver::new(ledger);
        assert_eq!(
            resolver.balance_of(&watch).unwrap().base_units(),
            3_000_000_000_000_000_000
        );
    }

    #[test]
    fn spent_outputs_drop_out() {
        let ledger = Arc::new(OutputLedger::new());
        let alice = wallet("Alice");
        let bob = wallet("Bob");
        ledger.seed_genesis(vec![output_for(&alice, 100), output_for(&alice, 50)]);
        ledger
            .apply_finalized(
                "tx1",
                &[crate::ledger::OutputId::new(
                    crate::ledger::book::GENESIS_TX_ID,
                    0,
                )],
                vec![output_for(&bob, 100)],
            )
            .unwrap();

        let resolver = BalanceResolver::new(ledger);
        assert_eq!(resolver.balance_of(&alice).unwrap(), Amount::new(50).unwrap());
        assert_eq!(resolver.balance_of(&bob).unwrap(), Amount::new(100).unwrap());
    }
}
