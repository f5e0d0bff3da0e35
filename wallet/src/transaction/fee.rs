//! Linear fee schedule.
//!
//! The fee for a transaction is a pure function of its shape:
//!
//! ```text
//! fee = base + per_input * inputs + per_output * outputs
//! ```
//!
//! Input selection calls [`LinearFee::estimate`] while it is still deciding
//! how many inputs and outputs the transaction will have, so the estimate
//! must be cheap and side-effect free. The devnet schedule is free across
//! the board; a real network would load coefficients from chain parameters.

use crate::amount::{Amount, AmountError};
use crate::config::{DEVNET_FEE_BASE, DEVNET_FEE_PER_INPUT, DEVNET_FEE_PER_OUTPUT};

/// Fee coefficients, all in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearFee {
    base: u128,
    per_input: u128,
    per_output: u128,
}

impl LinearFee {
    /// A schedule with explicit coefficients.
    pub fn new(base: u128, per_input: u128, per_output: u128) -> Self {
        Self {
            base,
            per_input,
            per_output,
        }
    }

    /// The devnet schedule. All coefficients are zero, so transfers move
    /// their full face value.
    pub fn devnet() -> Self {
        Self::new(DEVNET_FEE_BASE, DEVNET_FEE_PER_INPUT, DEVNET_FEE_PER_OUTPUT)
    }

    /// Returns the fee for a transaction with the given shape.
    ///
    /// Fails only if the coefficients are large enough to overflow the
    /// supply cap, which no sane schedule does.
    pub fn estimate(&self, inputs: usize, outputs: usize) -> Result<Amount, AmountError> {
        // Saturation is fine here: anything that saturates u128 is far past
        // the supply cap and fails the `Amount::new` check below anyway.
        let total = self
            .base
            .saturating_add(self.per_input.saturating_mul(inputs as u128))
            .saturating_add(self.per_output.saturating_mul(outputs as u128));
        Amount::new(total)
    }

    /// Returns `true` if every coefficient is zero.
    pub fn is_free(&self) -> bool {
        self.base == 0 && self.per_input == 0 && self.per_output == 0
    }
}

impl Default for LinearFee {
    fn default() -> Self {
        Self::devnet()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
