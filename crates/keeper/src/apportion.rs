//! Splitting one withdrawal across many pools.
//!
//! Each pool gives up the same proportion of its withdrawable collateral.
//! Truncating every share would leave the total short, so a non-final share
//! is bumped by one unit whenever the pool can afford it, and the final pool
//! absorbs whatever is left.

use shield_types::{div_half_even, mul_half_even, truncate_units, Decimal, DecimalError};

/// Running state of one apportionment.
#[derive(Debug, Clone)]
pub struct Apportioner {
    proportion: Decimal,
    remaining: u128,
}

impl Apportioner {
    /// Start apportioning `amount` out of a total of `withdrawable`.
    ///
    /// Fails with `DivisionByZero` when nothing is withdrawable.
    pub fn new(amount: u128, withdrawable: u128) -> Result<Self, DecimalError> {
        let proportion = div_half_even(Decimal::from(amount), Decimal::from(withdrawable))?;
        Ok(Self {
            proportion,
            remaining: amount,
        })
    }

    /// `amount / withdrawable`, rounded half-to-even at 18 decimals.
    pub fn proportion(&self) -> Decimal {
        self.proportion
    }

    /// Amount not yet assigned to a pool.
    pub fn remaining(&self) -> u128 {
        self.remaining
    }

    /// Share for the next entry, given what that entry can release.
    ///
    /// Does not consume anything; call [`Apportioner::record`] once the
    /// share has actually been withdrawn.
    pub fn share(&self, entry_withdrawable: u128, is_last: bool) -> Result<u128, DecimalError> {
        if is_last {
            return Ok(self.remaining);
        }
        let mut share =
            truncate_units(mul_half_even(Decimal::from(entry_withdrawable), self.proportion)?)?;
        if self.remaining <= share {
            share = self.remaining;
        } else if entry_withdrawable > share {
            share += 1;
        }
        Ok(share)
    }

    /// Mark `share` as withdrawn.
    pub fn record(&mut self, share: u128) {
        self.remaining = self.remaining.saturating_sub(share);
    }
}
