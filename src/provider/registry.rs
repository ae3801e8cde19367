//! Provider registry: ordered adapter dispatch.

use std::sync::Arc;

use tracing::debug;

use super::ProviderAdapter;
use crate::chat::ChatRequest;
use crate::error::ParleyError;

/// Ordered list of adapters.
///
/// Dispatch evaluates acceptance predicates in registration order and the
/// first adapter that accepts a request wins. Registering a second adapter
/// for an already-claimed model never overrides the first.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        debug!(provider = adapter.name(), position = self.adapters.len(), "registering adapter");
        self.adapters.push(adapter);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Pick the adapter for a request.
    pub fn dispatch(&self, request: &ChatRequest) -> Result<Arc<dyn ProviderAdapter>, ParleyError> {
        let mut accepting = self.adapters.iter().filter(|a| a.accepts(request));
        let chosen = accepting
            .next()
            .cloned()
            .ok_or_else(|| ParleyError::UnregisteredProvider {
                model: request.model.to_string(),
            })?;
        for shadowed in accepting {
            debug!(
                model = %request.model,
                chosen = chosen.name(),
                shadowed = shadowed.name(),
                "model claimed by more than one adapter"
            );
        }
        Ok(chosen)
    }

    /// Names of every adapter accepting the request, in priority order.
    pub fn claimants(&self, request: &ChatRequest) -> Vec<&str> {
        self.adapters
            .iter()
            .filter(|a| a.accepts(request))
            .map(|a| a.name())
            .collect()
    }

    /// Registered adapter names, in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("adapters", &self.provider_names())
            .finish()
    }
}
