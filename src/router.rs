use thiserror::Error;

use crate::catalog::{Catalog, PolicyDefinition};
use crate::provider::{Platform, Provider, ProviderError, Scope};
use crate::value::PolicyValue;

/// Errors surfaced by the policy router
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Bad catalog lookup - a programmer or baseline-authoring error,
    /// surfaced immediately and never retried
    #[error("unknown policy '{name}' for platform {platform}")]
    UnknownPolicy { platform: Platform, name: String },

    /// The native store was unreachable or rejected the operation
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),
}

/// A policy's current state as read from the native store
#[derive(Debug, Clone)]
pub struct CurrentSetting {
    pub policy_name: String,
    pub description: String,
    /// `None` when the setting is unset in the store (absent, not an error)
    pub value: Option<PolicyValue>,
}

/// Resolves friendly policy names into provider calls
///
/// The router is the public surface for external tooling: `get_policy`,
/// `set_policy` and `list_available_policies`. It is written against the
/// `Provider` trait only; the adapter is injected once at startup.
pub struct PolicyRouter<'a> {
    catalog: &'a Catalog,
    provider: Box<dyn Provider>,
}

impl<'a> PolicyRouter<'a> {
    pub fn new(catalog: &'a Catalog, provider: Box<dyn Provider>) -> Self {
        Self { catalog, provider }
    }

    /// Read a policy's current value
    ///
    /// Raw stored values are normalized into the definition's declared type
    /// when losslessly possible (a DWORD 1 for a bool policy reads as
    /// `Bool(true)`); otherwise the raw value is returned untouched so type
    /// drift stays visible.
    pub fn get_policy(
        &self,
        platform: Platform,
        name: &str,
        scope: Scope,
    ) -> Result<CurrentSetting, PolicyError> {
        let def = self.catalog.lookup(platform, name)?;
        let raw = self.provider.read(def.native_key, scope)?;

        let value = raw.map(|v| v.coerce_to(def.value_type).unwrap_or(v));

        Ok(CurrentSetting {
            policy_name: def.friendly_name.to_string(),
            description: def.description.to_string(),
            value,
        })
    }

    /// Write a policy value
    ///
    /// The definition's declared type drives native coercion (bool becomes a
    /// registry DWORD 0/1, a plist Boolean, ...), not caller guesswork.
    /// Setting an already-correct value is a no-op from the caller's
    /// observable standpoint.
    pub fn set_policy(
        &self,
        platform: Platform,
        name: &str,
        value: &PolicyValue,
        scope: Scope,
    ) -> Result<(), PolicyError> {
        let def = self.catalog.lookup(platform, name)?;
        self.provider
            .write(def.native_key, value, def.value_type, scope)?;
        Ok(())
    }

    /// List catalog entries, sorted by friendly name
    pub fn list_available_policies(&self, platform: Option<Platform>) -> Vec<&PolicyDefinition> {
        self.catalog.list(platform)
    }
}
