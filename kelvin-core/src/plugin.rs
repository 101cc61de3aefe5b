//! Ordered registry of the providers consulted for every request.

use std::sync::Arc;

use crate::model::ProviderId;
use crate::ports::TemperaturePort;

/// Providers fixed at startup and shared read-only by all requests.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: Vec<Arc<dyn TemperaturePort>>,
}

impl ProviderSet {
    /// Build a set from the provided list, keeping its order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn TemperaturePort>>) -> Self {
        Self { providers }
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Identifiers of all providers in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProviderId> {
        self.providers
            .iter()
            .map(|provider| provider.id().clone())
            .collect()
    }

    /// Iterator over the registered providers.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TemperaturePort>> {
        self.providers.iter()
    }
}

impl FromIterator<Arc<dyn TemperaturePort>> for ProviderSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn TemperaturePort>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
