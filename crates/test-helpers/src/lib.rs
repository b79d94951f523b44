//! Test helpers for the shield core.
//!
//! In-memory stand-ins for the host collaborators. All of them are
//! deterministic and safe to share behind `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use shield_test_helpers::{test_context, MockStaking, RecordingPremiumSink, StaticParams};
//!
//! let staking = MockStaking::new().with_balance(&admin(), 1_000);
//! let sink = RecordingPremiumSink::new();
//! let ctx = test_context();
//! ```

use shield_core::{BlockContext, ParamSource, PremiumError, PremiumSink, StakingKeeper};
use shield_types::{Address, Coins, PoolParams};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

pub use shield_types::test_utils::{bond, test_address, test_pool, TEST_BOND_DENOM};

/// Height of the block returned by [`test_context`].
pub const TEST_BLOCK_HEIGHT: u64 = 100;

/// Timestamp of the block returned by [`test_context`].
pub const TEST_BLOCK_TIME: u64 = 1_700_000_000;

/// Minimum pool life used by [`StaticParams::for_tests`]: one hour.
pub const TEST_MIN_POOL_LIFE_SECS: u64 = 3_600;

/// Withdraw period used by [`StaticParams::for_tests`]: one day.
pub const TEST_WITHDRAW_PERIOD_SECS: u64 = 86_400;

/// A block context at a fixed height and time.
pub fn test_context() -> BlockContext {
    BlockContext::new(TEST_BLOCK_HEIGHT, TEST_BLOCK_TIME)
}

/// The administrator address used by keeper tests.
pub fn admin() -> Address {
    test_address("admin")
}

/// Staking subsystem with settable bonded balances.
#[derive(Debug)]
pub struct MockStaking {
    bond_denom: String,
    balances: Mutex<BTreeMap<Address, u128>>,
}

impl MockStaking {
    /// Staking in [`TEST_BOND_DENOM`] with no bonded accounts.
    pub fn new() -> Self {
        Self::with_denom(TEST_BOND_DENOM)
    }

    pub fn with_denom(bond_denom: impl Into<String>) -> Self {
        Self {
            bond_denom: bond_denom.into(),
            balances: Mutex::new(BTreeMap::new()),
        }
    }

    /// Builder form of [`MockStaking::set_balance`].
    pub fn with_balance(self, address: &Address, amount: u128) -> Self {
        self.set_balance(address, amount);
        self
    }

    pub fn set_balance(&self, address: &Address, amount: u128) {
        self.balances.lock().insert(address.clone(), amount);
    }
}

impl Default for MockStaking {
    fn default() -> Self {
        Self::new()
    }
}

impl StakingKeeper for MockStaking {
    fn bond_denom(&self) -> String {
        self.bond_denom.clone()
    }

    fn bonded_balance(&self, address: &Address) -> u128 {
        self.balances.lock().get(address).copied().unwrap_or(0)
    }
}

/// Parameter store returning whatever was last set.
#[derive(Debug)]
pub struct StaticParams {
    params: Mutex<PoolParams>,
}

impl StaticParams {
    pub fn new(params: PoolParams) -> Self {
        Self {
            params: Mutex::new(params),
        }
    }

    /// Short lifetimes so tests can cross them in a few blocks.
    pub fn for_tests() -> Self {
        Self::new(PoolParams {
            min_pool_life_secs: TEST_MIN_POOL_LIFE_SECS,
            withdraw_period_secs: TEST_WITHDRAW_PERIOD_SECS,
        })
    }

    pub fn set_min_pool_life(&self, min_pool_life: Duration) {
        self.params.lock().min_pool_life_secs = min_pool_life.as_secs();
    }

    pub fn set_withdraw_period(&self, withdraw_period: Duration) {
        self.params.lock().withdraw_period_secs = withdraw_period.as_secs();
    }
}

impl ParamSource for StaticParams {
    fn pool_params(&self) -> PoolParams {
        self.params.lock().clone()
    }
}

/// Premium sink that accepts every deposit and remembers it.
#[derive(Debug, Default)]
pub struct RecordingPremiumSink {
    deposits: Mutex<Vec<(Address, Coins)>>,
}

impl RecordingPremiumSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposits received so far, in call order.
    pub fn deposits(&self) -> Vec<(Address, Coins)> {
        self.deposits.lock().clone()
    }

    /// Sum of every deposit received.
    pub fn total(&self) -> Coins {
        self.deposits.lock()
            .iter()
            .fold(Coins::new(), |acc, (_, amount)| {
                acc.checked_add(amount).unwrap_or(acc)
            })
    }
}

impl PremiumSink for RecordingPremiumSink {
    fn deposit_native_premium(&self, amount: &Coins, payer: &Address) -> Result<(), PremiumError> {
        self.deposits.lock().push((payer.clone(), amount.clone()));
        Ok(())
    }
}

/// Premium sink that rejects every deposit.
#[derive(Debug)]
pub struct FailingPremiumSink {
    reason: String,
}

impl FailingPremiumSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for FailingPremiumSink {
    fn default() -> Self {
        Self::new("insufficient funds")
    }
}

impl PremiumSink for FailingPremiumSink {
    fn deposit_native_premium(&self, amount: &Coins, payer: &Address) -> Result<(), PremiumError> {
        Err(PremiumError {
            payer: payer.clone(),
            amount: amount.clone(),
            reason: self.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mock_staking_balances() {
        let staking = MockStaking::new().with_balance(&admin(), 500);
        assert_eq!(staking.bond_denom(), TEST_BOND_DENOM);
        assert_eq!(staking.bonded_balance(&admin()), 500);
        assert_eq!(staking.bonded_balance(&test_address("nobody")), 0);
    }

    #[test]
    fn test_mock_usable_after_panicking_holder() {
        let staking = Arc::new(MockStaking::new().with_balance(&admin(), 5));
        let shared = staking.clone();
        let joined = std::thread::spawn(move || {
            let _held = shared.balances.lock();
            panic!("holder panicked");
        })
        .join();
        assert!(joined.is_err());

        staking.set_balance(&admin(), 9);
        assert_eq!(staking.bonded_balance(&admin()), 9);
    }

    #[test]
    fn test_recording_sink_totals() {
        let sink = RecordingPremiumSink::new();
        sink.deposit_native_premium(&bond(3), &admin()).unwrap();
        sink.deposit_native_premium(&bond(4), &admin()).unwrap();
        assert_eq!(sink.deposits().len(), 2);
        assert_eq!(sink.total(), bond(7));
    }

    #[test]
    fn test_failing_sink_reports_payer() {
        let err = FailingPremiumSink::default()
            .deposit_native_premium(&bond(1), &admin())
            .unwrap_err();
        assert_eq!(err.payer, admin());
    }
}
