//! Message generation for simulations.
//!
//! Generators draw from a seeded RNG and a read-only view of current state,
//! so a run is reproducible from its seed alone.

use crate::config::WorkloadConfig;
use shield_core::ShieldMsg;
use shield_types::{Address, Coins, MixedCoins, Pool, PoolParams, AVERAGE_BLOCK_TIME_SECS};

/// Number of distinct non-administrator signers.
const FOREIGN_SIGNERS: u32 = 8;

/// One in this many durations is too short to be accepted.
const SHORT_COVERAGE_ONE_IN: u32 = 20;

/// One in this many withdrawals asks for more than is withdrawable.
const OVER_WITHDRAW_ONE_IN: u32 = 10;

/// State the generator may inspect when building a message.
#[derive(Debug, Clone, Copy)]
pub struct ShieldView<'a> {
    pub admin: &'a Address,
    pub pools: &'a [Pool],
    /// Administrator collateral not already being withdrawn.
    pub withdrawable: u128,
}

/// Trait for generating message workloads.
pub trait WorkloadGenerator {
    /// Generate the next message.
    fn generate_one(&mut self, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> ShieldMsg;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MsgKind {
    Create,
    Update,
    Pause,
    Resume,
    Withdraw,
}

/// Weighted mix of every shield message.
///
/// Most messages are valid against the view. A configurable share is signed
/// by a stranger, and a small share carries a bad duration or an oversized
/// withdrawal, so rejection paths run as often as the happy path.
#[derive(Debug, Clone)]
pub struct ShieldWorkload {
    config: WorkloadConfig,
    params: PoolParams,
    bond_denom: String,
    sponsors_created: u64,
}

impl ShieldWorkload {
    pub fn new(config: WorkloadConfig, params: PoolParams, bond_denom: impl Into<String>) -> Self {
        Self {
            config,
            params,
            bond_denom: bond_denom.into(),
            sponsors_created: 0,
        }
    }

    fn pick_kind(&self, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> MsgKind {
        let c = &self.config;
        let total = c.total_weight();
        if total == 0 {
            return MsgKind::Create;
        }
        let mut roll = rng.gen_range(0..total);
        let weighted = [
            (MsgKind::Create, c.create_weight),
            (MsgKind::Update, c.update_weight),
            (MsgKind::Pause, c.pause_weight),
            (MsgKind::Resume, c.resume_weight),
            (MsgKind::Withdraw, c.withdraw_weight),
        ];
        let kind = weighted
            .iter()
            .find_map(|(kind, weight)| {
                if roll < *weight {
                    Some(*kind)
                } else {
                    roll -= weight;
                    None
                }
            })
            .unwrap_or(MsgKind::Create);

        // Pool messages need a pool to target.
        match kind {
            MsgKind::Update | MsgKind::Pause | MsgKind::Resume if view.pools.is_empty() => {
                MsgKind::Create
            }
            kind => kind,
        }
    }

    fn signer(&self, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> Address {
        if rng.gen_range(0..100) < self.config.foreign_signer_percent {
            let n = rng.gen_range(0..FOREIGN_SIGNERS);
            Address::new(format!("shield1user{}", n))
        } else {
            view.admin.clone()
        }
    }

    fn bond(&self, amount: u128) -> Coins {
        Coins::single(self.bond_denom.clone(), amount)
    }

    fn shield(&self, rng: &mut impl rand::Rng) -> Coins {
        self.bond(u128::from(rng.gen_range(1..=self.config.max_shield.max(1))))
    }

    fn deposit(&self, rng: &mut impl rand::Rng) -> MixedCoins {
        let amount = rng.gen_range(0..=self.config.max_deposit);
        MixedCoins::native(self.bond(u128::from(amount)))
    }

    /// Coverage as `(seconds, blocks)`, only one of them set.
    fn coverage(&self, time_based: bool, rng: &mut impl rand::Rng) -> (u64, u64) {
        let min_secs = self.params.min_pool_life_secs;
        let short = rng.gen_range(0..SHORT_COVERAGE_ONE_IN) == 0;
        if time_based {
            if short {
                (min_secs.max(1), 0)
            } else {
                (min_secs + rng.gen_range(1..=min_secs.max(1) * 2), 0)
            }
        } else if short {
            (0, 0)
        } else {
            (0, min_secs / AVERAGE_BLOCK_TIME_SECS + rng.gen_range(1..=20))
        }
    }

    fn create(&mut self, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> ShieldMsg {
        self.sponsors_created += 1;
        let time_based = rng.gen_bool(2.0 / 3.0);
        let (time_of_coverage, blocks_of_coverage) = self.coverage(time_based, rng);
        ShieldMsg::CreatePool {
            creator: self.signer(view, rng),
            shield: self.shield(rng),
            deposit: self.deposit(rng),
            sponsor: format!("sponsor-{}", self.sponsors_created),
            time_of_coverage,
            blocks_of_coverage,
        }
    }

    fn update(&self, pool: &Pool, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> ShieldMsg {
        // Extensions mostly match the pool's coverage kind.
        let time_based = if rng.gen_range(0..SHORT_COVERAGE_ONE_IN) == 0 {
            !pool.end.is_time_based()
        } else {
            pool.end.is_time_based()
        };
        let (additional_time, additional_blocks) = if rng.gen_bool(0.5) {
            (0, 0)
        } else {
            self.coverage(time_based, rng)
        };
        ShieldMsg::UpdatePool {
            updater: self.signer(view, rng),
            pool_id: pool.id,
            shield: self.shield(rng),
            deposit: self.deposit(rng),
            additional_time,
            additional_blocks,
        }
    }

    fn withdraw(&self, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> ShieldMsg {
        let amount = if view.withdrawable == 0 || rng.gen_range(0..OVER_WITHDRAW_ONE_IN) == 0 {
            view.withdrawable + rng.gen_range(1..=100)
        } else {
            rng.gen_range(1..=view.withdrawable)
        };
        ShieldMsg::WithdrawFromPools {
            provider: self.signer(view, rng),
            amount: self.bond(amount),
        }
    }
}

impl WorkloadGenerator for ShieldWorkload {
    fn generate_one(&mut self, view: &ShieldView<'_>, rng: &mut impl rand::Rng) -> ShieldMsg {
        let kind = self.pick_kind(view, rng);
        match kind {
            MsgKind::Create => self.create(view, rng),
            MsgKind::Update => {
                let pool = &view.pools[rng.gen_range(0..view.pools.len())];
                self.update(pool, view, rng)
            }
            MsgKind::Pause => {
                let pool_id = view.pools[rng.gen_range(0..view.pools.len())].id;
                ShieldMsg::PausePool {
                    updater: self.signer(view, rng),
                    pool_id,
                }
            }
            MsgKind::Resume => {
                let pool_id = view.pools[rng.gen_range(0..view.pools.len())].id;
                ShieldMsg::ResumePool {
                    updater: self.signer(view, rng),
                    pool_id,
                }
            }
            MsgKind::Withdraw => self.withdraw(view, rng),
        }
    }
}
