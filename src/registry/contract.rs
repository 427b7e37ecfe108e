use std::collections::BTreeSet;

/// One service contract and the providers currently registered for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceContract {
    name: String,
    providers: BTreeSet<String>,
    persisted: Option<BTreeSet<String>>,
    unreadable: bool,
}

impl ServiceContract {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            providers: BTreeSet::new(),
            persisted: None,
            unreadable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Providers in sorted order.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(String::as_str)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().cloned().collect()
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.providers.contains(provider)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether a descriptor existed on disk when the pass started.
    pub fn was_persisted(&self) -> bool {
        self.persisted.is_some()
    }

    /// Whether a descriptor exists on disk but could not be read.
    pub fn is_unreadable(&self) -> bool {
        self.unreadable
    }

    /// Whether the contract needs to be written or deleted at end of pass.
    ///
    /// A descriptor that exists but is (or became) empty is always dirty so
    /// that its file gets removed rather than left behind empty. Unreadable
    /// descriptors are never dirty; their on-disk content is unknown.
    pub fn is_dirty(&self) -> bool {
        if self.unreadable {
            return false;
        }
        match &self.persisted {
            None => !self.providers.is_empty(),
            Some(persisted) => self.providers.is_empty() || *persisted != self.providers,
        }
    }

    pub(crate) fn mark_persisted<I>(&mut self, providers: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.persisted
            .get_or_insert_with(BTreeSet::new)
            .extend(providers);
    }

    pub(crate) fn mark_unreadable(&mut self) {
        self.unreadable = true;
    }

    pub(crate) fn insert(&mut self, provider: &str) -> bool {
        self.providers.insert(provider.to_string())
    }

    pub(crate) fn remove(&mut self, provider: &str) -> bool {
        self.providers.remove(provider)
    }
}
