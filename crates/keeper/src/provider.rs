//! Provider ledger.

use crate::{Keeper, ShieldError};
use shield_store::{keys, KvStore};
use shield_types::{Address, Provider};
use tracing::debug;

impl Keeper {
    pub fn get_provider(
        &self,
        store: &dyn KvStore,
        address: &Address,
    ) -> Result<Option<Provider>, ShieldError> {
        Ok(keys::PROVIDERS.may_load(store, address)?)
    }

    pub fn set_provider(
        &self,
        store: &mut dyn KvStore,
        provider: &Provider,
    ) -> Result<(), ShieldError> {
        keys::PROVIDERS.save(store, &provider.address, provider)?;
        Ok(())
    }

    /// Register `address` as a provider, seeding `available` from its bonded
    /// balance.
    pub fn add_provider(
        &self,
        store: &mut dyn KvStore,
        address: &Address,
    ) -> Result<Provider, ShieldError> {
        let provider = self.new_provider(address);
        self.set_provider(store, &provider)?;
        Ok(provider)
    }

    /// Every provider, in store key order.
    pub fn get_all_providers(&self, store: &dyn KvStore) -> Result<Vec<Provider>, ShieldError> {
        Ok(keys::PROVIDERS
            .entries(store)?
            .into_iter()
            .map(|(_, provider)| provider)
            .collect())
    }

    /// Build an unsaved provider record from staking.
    pub(crate) fn new_provider(&self, address: &Address) -> Provider {
        let available = self.staking().bonded_balance(address);
        debug!(provider = %address, available, "Seeding provider from bonded balance");
        Provider::new(address.clone(), available)
    }

    pub(crate) fn load_provider(
        &self,
        store: &dyn KvStore,
        address: &Address,
    ) -> Result<Provider, ShieldError> {
        self.get_provider(store, address)?
            .ok_or_else(|| ShieldError::NoDelegation(address.clone()))
    }
}
