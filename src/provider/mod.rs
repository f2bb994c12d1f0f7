// Platform-specific settings-store adapters
//
// Adapters perform raw native key read/write against exactly one store
// (Windows registry, macOS preference domains). They know nothing about
// friendly policy names, baselines, or compliance - that is the router's
// and engine's business.

pub mod common;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(test)]
pub mod testing;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::value::{PolicyValue, ValueType};

/// Platforms with a native settings store adapter
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    #[serde(rename = "macos")]
    #[value(name = "macos")]
    MacOs,
}

impl Platform {
    /// Detect the platform this process is running on
    pub fn current() -> Option<Platform> {
        #[cfg(target_os = "windows")]
        return Some(Platform::Windows);

        #[cfg(target_os = "macos")]
        return Some(Platform::MacOs);

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return None;
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a policy is stored: machine-wide or per-user
///
/// Selects the registry root on Windows (HKLM vs HKCU); the macOS adapter
/// ignores it. Scope changes where an adapter writes, never what.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ValueEnum, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Machine,
    User,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Machine => "machine",
            Scope::User => "user",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a settings-store adapter
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed value: {0}")]
    Malformed(String),
}

/// Raw key/value access to one native settings store
///
/// `read` reports an unset setting as `Ok(None)`, not an error. `write`
/// coerces the value to the store's native representation for the declared
/// type (e.g. bool becomes a registry DWORD 0/1) and must be idempotent.
pub trait Provider {
    fn read(&self, native_key: &str, scope: Scope) -> Result<Option<PolicyValue>, ProviderError>;

    fn write(
        &self,
        native_key: &str,
        value: &PolicyValue,
        value_type: ValueType,
        scope: Scope,
    ) -> Result<(), ProviderError>;
}

/// Select the native adapter for the given platform
///
/// Called once at startup; everything above this point is written against the
/// `Provider` trait only.
pub fn native_provider(platform: Platform) -> Result<Box<dyn Provider>> {
    match platform {
        #[cfg(target_os = "windows")]
        Platform::Windows => Ok(Box::new(windows::RegistryProvider::new())),

        #[cfg(target_os = "macos")]
        Platform::MacOs => Ok(Box::new(macos::PreferencesProvider::new())),

        other => anyhow::bail!("no native settings provider for {} on this host", other),
    }
}
