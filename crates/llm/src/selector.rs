//! Active provider selection.
//!
//! A [`ProviderSelector`] holds exactly one active provider. It starts out
//! as the schema-native provider, created on first access, and changes only
//! through [`ProviderSelector::select`]. Callers fetch the handle per call
//! instead of keeping it across a selection change; a call already in flight
//! keeps running on the provider it started with.
//!
//! [`select_provider`] and [`active_provider`] operate on a process-wide
//! selector built from the environment. Code that needs several independent
//! selections can construct and pass its own `ProviderSelector`.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::client::StructuredProvider;
use crate::error::ProviderError;
use crate::factory::create_provider;
use crate::types::{ProviderKind, ProviderSettings};

/// Holder of the active structured provider.
pub struct ProviderSelector {
    settings: ProviderSettings,
    active: RwLock<Option<Arc<dyn StructuredProvider>>>,
}

impl ProviderSelector {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            active: RwLock::new(None),
        }
    }

    /// Selector whose settings are read from the environment now.
    pub fn from_env() -> Self {
        Self::new(ProviderSettings::from_env())
    }

    /// The active provider, creating the schema-native default on first use.
    pub fn active(&self) -> Result<Arc<dyn StructuredProvider>, ProviderError> {
        if let Some(provider) = self.active.read().as_ref() {
            return Ok(Arc::clone(provider));
        }

        let mut slot = self.active.write();
        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }

        let provider = create_provider(ProviderKind::SchemaNative, &self.settings)?;
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }

    /// Kind of the active provider, if one has been created.
    pub fn active_kind(&self) -> Option<ProviderKind> {
        self.active.read().as_ref().map(|provider| provider.kind())
    }

    /// Replace the active provider with a fresh instance of `kind`.
    ///
    /// On error the previous provider stays active.
    pub fn select(&self, kind: ProviderKind) -> Result<Arc<dyn StructuredProvider>, ProviderError> {
        let provider = create_provider(kind, &self.settings)?;
        *self.active.write() = Some(Arc::clone(&provider));
        tracing::info!(kind = %kind, provider = provider.provider_name(), "Selected provider");
        Ok(provider)
    }
}

/// Process-wide selector, built from the environment on first use.
pub fn global() -> &'static ProviderSelector {
    static SELECTOR: OnceLock<ProviderSelector> = OnceLock::new();
    SELECTOR.get_or_init(ProviderSelector::from_env)
}

/// Select the process-wide active provider.
pub fn select_provider(kind: ProviderKind) -> Result<(), ProviderError> {
    global().select(kind).map(|_| ())
}

/// The process-wide active provider.
pub fn active_provider() -> Result<Arc<dyn StructuredProvider>, ProviderError> {
    global().active()
}
