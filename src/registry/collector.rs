use crate::registry::ServiceContract;
use crate::store::RegistryStore;
use crate::StoreError;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// In-memory contract→providers model for a single build pass.
///
/// Every provider, whether replayed from disk or newly declared, is added
/// through [`RegistryCollector::register`] so the reverse index from
/// declaring type to contracts always mirrors the forward map.
#[derive(Debug, Default)]
pub struct RegistryCollector {
    registries: BTreeMap<String, ServiceContract>,
    contributions: BTreeMap<String, BTreeSet<String>>,
}

impl RegistryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collector with every descriptor the store can find.
    ///
    /// Missing descriptors are treated as having no prior providers.
    /// Unreadable ones are marked so the pass never overwrites or deletes
    /// them. Neither stops the pass.
    pub fn load_from(store: &RegistryStore) -> Self {
        let mut collector = Self::new();
        for name in store.try_find_all() {
            match store.load(&name) {
                Ok(providers) => collector.seed(&name, providers),
                Err(err @ StoreError::NotFound { .. }) => {
                    debug!(contract = %name, "{err}");
                }
                Err(err) => {
                    warn!(contract = %name, error = %err, "ignoring unreadable descriptor");
                    collector.get_or_create(&name).mark_unreadable();
                }
            }
        }
        debug!(contracts = collector.len(), "seeded registry collector");
        collector
    }

    /// Record prior on-disk state for `name` and replay it through the
    /// registration path.
    pub fn seed<I>(&mut self, name: &str, providers: I)
    where
        I: IntoIterator<Item = String>,
    {
        let providers: Vec<String> = providers.into_iter().collect();
        self.get_or_create(name).mark_persisted(providers.iter().cloned());
        for provider in &providers {
            self.register(name, provider);
        }
    }

    /// Existing contract or a new empty one; never reads from disk.
    pub fn get_or_create(&mut self, name: &str) -> &mut ServiceContract {
        self.registries
            .entry(name.to_string())
            .or_insert_with(|| ServiceContract::new(name))
    }

    /// Add `provider` to `contract`. Returns whether the provider set changed.
    pub fn register(&mut self, contract: &str, provider: &str) -> bool {
        let added = self.get_or_create(contract).insert(provider);
        self.contributions
            .entry(provider.to_string())
            .or_default()
            .insert(contract.to_string());
        added
    }

    /// Retract every provider entry `declaring_type` previously added.
    ///
    /// Unknown types are a no-op. Returns how many entries were removed.
    pub fn remove_contributions_of(&mut self, declaring_type: &str) -> usize {
        let Some(contracts) = self.contributions.remove(declaring_type) else {
            return 0;
        };
        let mut removed = 0;
        for name in &contracts {
            if let Some(contract) = self.registries.get_mut(name) {
                if contract.remove(declaring_type) {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            debug!(declaring_type, removed, "removed stale contributions");
        }
        removed
    }

    /// Contracts that must be written or deleted, in name order.
    pub fn dirty_contracts(&self) -> impl Iterator<Item = &ServiceContract> {
        self.registries.values().filter(|c| c.is_dirty())
    }

    /// Unreadable contracts that still received providers this pass.
    pub fn held_back(&self) -> impl Iterator<Item = &ServiceContract> {
        self.registries
            .values()
            .filter(|c| c.is_unreadable() && !c.is_empty())
    }

    pub fn contract(&self, name: &str) -> Option<&ServiceContract> {
        self.registries.get(name)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &ServiceContract> {
        self.registries.values()
    }

    /// Contracts `declaring_type` currently contributes to.
    pub fn contributions_of(&self, declaring_type: &str) -> impl Iterator<Item = &str> {
        self.contributions
            .get(declaring_type)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
