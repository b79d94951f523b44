//! Key layout of shield state.
//!
//! Every record family lives under its own one-byte prefix:
//!
//! | Prefix | Contents                                             |
//! |--------|------------------------------------------------------|
//! | `0x01` | pools, by id                                         |
//! | `0x02` | next pool id                                         |
//! | `0x03` | providers, by address                                |
//! | `0x04` | collaterals, by pool id then provider address        |
//! | `0x05` | withdrawal queue, by completion time then sequence   |
//! | `0x06` | administrator                                        |
//! | `0x07` | withdrawal sequence counter                          |

use crate::{Item, Map};
use shield_types::{Address, Collateral, Pool, PoolId, Provider, Withdrawal};

pub const POOLS: Map<PoolId, Pool> = Map::new(&[0x01]);

pub const NEXT_POOL_ID: Item<PoolId> = Item::new(&[0x02]);

pub const PROVIDERS: Map<Address, Provider> = Map::new(&[0x03]);

pub const COLLATERALS: Map<(PoolId, Address), Collateral> = Map::new(&[0x04]);

/// Keyed by `(completion_time, sequence)` so a prefix scan yields releases in
/// maturity order, ties broken by queueing order.
pub const WITHDRAW_QUEUE: Map<(u64, u64), Withdrawal> = Map::new(&[0x05]);

pub const ADMIN: Item<Address> = Item::new(&[0x06]);

pub const WITHDRAW_SEQUENCE: Item<u64> = Item::new(&[0x07]);
