//! Multi-denomination amounts.
//!
//! All sets are backed by `BTreeMap` so iteration is ordered by denomination
//! and identical on every replica. Zero entries are never stored.

use crate::DecimalError;
use radix_common::math::{CheckedAdd, Decimal};
use radix_common::ScryptoSbor;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors from coin arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinsError {
    #[error("Amount overflow in {denom}")]
    Overflow { denom: String },

    #[error("Insufficient {denom}: have {available}, need {requested}")]
    Insufficient {
        denom: String,
        available: u128,
        requested: u128,
    },

    #[error(transparent)]
    Decimal(#[from] DecimalError),
}

/// A single denomination amount.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ScryptoSbor)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A non-negative integer amount per denomination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, ScryptoSbor)]
#[sbor(transparent)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set holding one denomination.
    pub fn single(denom: impl Into<String>, amount: u128) -> Self {
        let mut coins = Self::new();
        if amount > 0 {
            coins.0.insert(denom.into(), amount);
        }
        coins
    }

    /// Build a set from coins, merging duplicate denominations.
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Result<Self, CoinsError> {
        coins.into_iter().try_fold(Self::new(), |acc, coin| {
            acc.checked_add(&Self::single(coin.denom, coin.amount))
        })
    }

    /// Amount held in `denom`, zero if absent.
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of denominations held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(denom, amount)` pairs in denomination order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> + '_ {
        self.0.iter().map(|(denom, amount)| (denom.as_str(), *amount))
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins, CoinsError> {
        let mut sum = self.0.clone();
        for (denom, amount) in other.iter() {
            let entry = sum.entry(denom.to_string()).or_insert(0);
            *entry = entry.checked_add(amount).ok_or_else(|| CoinsError::Overflow {
                denom: denom.to_string(),
            })?;
        }
        Ok(Coins(sum))
    }

    /// Subtract `other`, failing if any denomination would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, CoinsError> {
        let mut diff = self.0.clone();
        for (denom, requested) in other.iter() {
            let available = self.amount_of(denom);
            let remaining =
                available
                    .checked_sub(requested)
                    .ok_or_else(|| CoinsError::Insufficient {
                        denom: denom.to_string(),
                        available,
                        requested,
                    })?;
            if remaining == 0 {
                diff.remove(denom);
            } else {
                diff.insert(denom.to_string(), remaining);
            }
        }
        Ok(Coins(diff))
    }

    /// True if every denomination in `other` is covered by `self`.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other
            .iter()
            .all(|(denom, amount)| self.amount_of(denom) >= amount)
    }
}

impl FromIterator<(String, u128)> for Coins {
    fn from_iter<T: IntoIterator<Item = (String, u128)>>(iter: T) -> Self {
        Coins(iter.into_iter().filter(|(_, amount)| *amount > 0).collect())
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(denom, amount)| format!("{}{}", amount, denom))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// A decimal amount per denomination.
#[derive(Debug, Clone, Default, PartialEq, Eq, ScryptoSbor)]
#[sbor(transparent)]
pub struct DecCoins(BTreeMap<String, Decimal>);

impl DecCoins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert an integer coin set to its decimal form.
    pub fn from_coins(coins: &Coins) -> Self {
        DecCoins(
            coins
                .iter()
                .map(|(denom, amount)| (denom.to_string(), Decimal::from(amount)))
                .collect(),
        )
    }

    pub fn amount_of(&self, denom: &str) -> Decimal {
        self.0.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.0.iter().map(|(denom, amount)| (denom.as_str(), *amount))
    }

    pub fn checked_add(&self, other: &DecCoins) -> Result<DecCoins, CoinsError> {
        let mut sum = self.0.clone();
        for (denom, amount) in other.iter() {
            let entry = sum.entry(denom.to_string()).or_insert(Decimal::ZERO);
            *entry = entry
                .checked_add(amount)
                .ok_or(CoinsError::Decimal(DecimalError::Overflow))?;
        }
        sum.retain(|_, amount| !amount.is_zero());
        Ok(DecCoins(sum))
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(denom, amount)| format!("{}{}", amount, denom))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// A deposit split into the bonding denomination and everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, ScryptoSbor)]
pub struct MixedCoins {
    /// Amount in the bonding denomination, paid through the premium sink.
    pub native: Coins,

    /// Amounts in other denominations.
    pub foreign: Coins,
}

impl MixedCoins {
    pub fn new(native: Coins, foreign: Coins) -> Self {
        Self { native, foreign }
    }

    /// A deposit with only a native component.
    pub fn native(native: Coins) -> Self {
        Self {
            native,
            foreign: Coins::new(),
        }
    }
}

/// Decimal form of [`MixedCoins`], used for accumulated premium.
#[derive(Debug, Clone, Default, PartialEq, Eq, ScryptoSbor)]
pub struct MixedDecCoins {
    pub native: DecCoins,
    pub foreign: DecCoins,
}

impl MixedDecCoins {
    pub fn from_mixed_coins(coins: &MixedCoins) -> Self {
        Self {
            native: DecCoins::from_coins(&coins.native),
            foreign: DecCoins::from_coins(&coins.foreign),
        }
    }

    pub fn checked_add(&self, other: &MixedDecCoins) -> Result<MixedDecCoins, CoinsError> {
        Ok(Self {
            native: self.native.checked_add(&other.native)?,
            foreign: self.foreign.checked_add(&other.foreign)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.native.is_zero() && self.foreign.is_zero()
    }
}
