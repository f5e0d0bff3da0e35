//! Deterministic input selection.
//!
//! Candidates arrive in ledger creation order and are consumed oldest
//! first. Determinism matters more here than coin-selection cleverness: two
//! wallets holding the same outputs must build the same transaction for the
//! same request, or debugging a devnet becomes guesswork.
//!
//! Selection is fee-aware. Each time an input is added the schedule is
//! re-estimated for the resulting shape, both with and without a change
//! output, and the loop stops as soon as the accumulated value covers the
//! requested amount plus the fee.

use thiserror::Error;

use crate::amount::{Amount, AmountError};
use crate::ledger::Output;

use super::fee::LinearFee;

/// Errors from input selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The wallet's unspent outputs cannot cover the amount plus fee.
    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds {
        /// Total unspent value the wallet holds.
        available: Amount,
        /// The amount the caller asked to send (fee excluded).
        requested: Amount,
    },

    /// Arithmetic failure while accumulating values. Outside a corrupted
    /// ledger this cannot happen, but it is not this module's call to panic.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// The outcome of a successful selection.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The chosen inputs, oldest first.
    pub inputs: Vec<Output>,
    /// Sum of the chosen input values.
    pub total: Amount,
    /// The fee the transaction will declare.
    pub fee: Amount,
    /// Value returned to the sender. [`Amount::ZERO`] means no change
    /// output is emitted.
    pub change: Amount,
}

/// Picks inputs from `candidates` (in the order given) until they cover
/// `amount` plus the estimated fee.
///
/// The payment itself is one output; change, when any, is a second. The
/// conservation law holds on return: `total == amount + change + fee`.
///
/// When the accumulated value lands in the narrow band where it covers the
/// no-change fee but a change output would not be worth its own fee, the
/// surplus is folded into the fee instead of emitting a zero-value output.
pub fn select_inputs(
    candidates: &[Output],
    amount: Amount,
    schedule: &LinearFee,
) -> Result<Selection, SelectionError> {
    let mut inputs: Vec<Output> = Vec::new();
    let mut total = Amount::ZERO;

    for candidate in candidates {
        total = total.checked_add(candidate.amount)?;
        inputs.push(candidate.clone());

        let fee_no_change = schedule.estimate(inputs.len(), 1)?;
        let fee_with_change = schedule.estimate(inputs.len(), 2)?;

        let needed = amount.checked_add(fee_no_change)?;
        if total < needed {
            continue;
        }

        let needed_with_change = amount.checked_add(fee_with_change)?;
        if total > needed_with_change {
            let change = total.checked_sub(needed_with_change)?;
            return Ok(Selection {
                inputs,
                total,
                fee: fee_with_change,
                change,
            });
        }

        // Covers the payment but not a worthwhile change output. The
        // surplus (zero in the exact-match case) becomes extra fee.
        let fee = total.checked_sub(amount)?;
        return Ok(Selection {
            inputs,
            total,
            fee,
            change: Amount::ZERO,
        });
    }

    Err(SelectionError::InsufficientFunds {
        available: total,
        requested: amount,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{StealthTag, WalletKeys};
    use crate::ledger::OutputId;

    fn outputs_with_values(values: &[u128]) -> Vec<Output> {
        let owner = WalletKeys::derive("selection-owner", "selection passphrase").unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Output {
                id: OutputId::new("genesis", i as u32),
                stealth: StealthTag::address_to(owner.view().public()),
                amount: Amount::new(v).unwrap(),
                created_at: 0,
                spent_by: None,
            })
            .collect()
    }

    fn assert_conserved(selection: &Selection, amount: Amount) {
        let spent = amount
            .checked_add(selection.change)
            .unwrap()
            .checked_add(selection.fee)
            .unwrap();
        assert_eq!(selection.total, spent, "total must equal amount + change + fee");
    }

    #[test]
    fn takes_oldest_outputs_first() {
        let candidates = outputs_with_values(&[100, 200, 300]);
        let selection =
            select_inputs(&candidates, Amount::new(150).unwrap(), &LinearFee::devnet()).unwrap();

        let ids: Vec<u32> = selection.inputs.iter().map(|o| o.id.index).collect();
        assert_eq!(ids, vec![0, 1], "must consume in creation order");
        assert_eq!(selection.change, Amount::new(150).unwrap());
        assert_conserved(&selection, Amount::new(150).unwrap());
    }

    #[test]
    fn exact_match_emits_no_change() {
        let candidates = outputs_with_values(&[500]);
        let selection =
            select_inputs(&candidates, Amount::new(500).unwrap(), &LinearFee::devnet()).unwrap();
        assert_eq!(selection.inputs.len(), 1);
        assert_eq!(selection.change, Amount::ZERO);
        assert_eq!(selection.fee, Amount::ZERO);
    }

    #[test]
    fn insufficient_funds_reports_totals() {
        let candidates = outputs_with_values(&[100, 100]);
        let err = select_inputs(&candidates, Amount::new(500).unwrap(), &LinearFee::devnet())
            .unwrap_err();
        match err {
            SelectionError::InsufficientFunds { available, requested } => {
                assert_eq!(available, Amount::new(200).unwrap());
                assert_eq!(requested, Amount::new(500).unwrap());
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn empty_candidates_are_insufficient() {
        let err =
            select_inputs(&[], Amount::new(1).unwrap(), &LinearFee::devnet()).unwrap_err();
        assert!(matches!(err, SelectionError::InsufficientFunds { .. }));
    }

    #[test]
    fn fee_aware_selection_pulls_extra_input() {
        // 100 covers the payment of 95 but not the 10-per-shape fee, so a
        // second input must be drawn.
        let schedule = LinearFee::new(10, 0, 0);
        let candidates = outputs_with_values(&[100, 50]);
        let selection =
            select_inputs(&candidates, Amount::new(95).unwrap(), &schedule).unwrap();
        assert_eq!(selection.inputs.len(), 2);
        assert_eq!(selection.fee, Amount::new(10).unwrap());
        assert_eq!(selection.change, Amount::new(45).unwrap());
        assert_conserved(&selection, Amount::new(95).unwrap());
    }

    #[test]
    fn narrow_band_surplus_folds_into_fee() {
        // One-output fee is 15, two-output fee is 20. A 103 input covers
        // 85 + 15 but not 85 + 20, so the 18-unit surplus becomes fee
        // instead of a change output that cannot pay for itself.
        let schedule = LinearFee::new(10, 0, 5);
        let candidates = outputs_with_values(&[103]);
        let selection =
            select_inputs(&candidates, Amount::new(85).unwrap(), &schedule).unwrap();
        assert_eq!(selection.change, Amount::ZERO);
        assert_eq!(selection.fee, Amount::new(18).unwrap());
        assert_conserved(&selection, Amount::new(85).unwrap());
    }

    #[test]
    fn conservation_holds_across_shapes() {
        let schedule = LinearFee::new(7, 3, 2);
        let candidates = outputs_with_values(&[40, 40, 40, 40]);
        for request in [1u128, 25, 50, 99] {
            let amount = Amount::new(request).unwrap();
            let selection = select_inputs(&candidates, amount, &schedule).unwrap();
            assert_conserved(&selection, amount);
        }
    }
}
