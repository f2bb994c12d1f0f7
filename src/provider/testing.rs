// In-memory settings store for router and engine tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{Provider, ProviderError, Scope};
use crate::value::{PolicyValue, ValueType};

/// A fake settings store with failure injection
///
/// Stores values per (scope, native key) and records every write so tests
/// can assert what was (and was not) touched. Writes coerce the value by the
/// declared type the way the native adapters do.
#[derive(Default)]
pub struct MemoryProvider {
    values: RefCell<HashMap<(Scope, String), PolicyValue>>,
    denied: HashSet<String>,
    write_denied: HashSet<String>,
    stuck: HashSet<String>,
    writes: Rc<RefCell<Vec<String>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a stored value
    pub fn seed(&self, scope: Scope, native_key: &str, value: PolicyValue) {
        self.values
            .borrow_mut()
            .insert((scope, native_key.to_string()), value);
    }

    /// All reads and writes of this key fail with AccessDenied
    pub fn deny(&mut self, native_key: &str) {
        self.denied.insert(native_key.to_string());
    }

    /// Writes of this key fail with AccessDenied; reads still work
    pub fn deny_writes(&mut self, native_key: &str) {
        self.write_denied.insert(native_key.to_string());
    }

    /// Writes of this key report success but do not change the store
    pub fn stick(&mut self, native_key: &str) {
        self.stuck.insert(native_key.to_string());
    }

    /// The stored value, if any
    pub fn stored(&self, scope: Scope, native_key: &str) -> Option<PolicyValue> {
        self.values
            .borrow()
            .get(&(scope, native_key.to_string()))
            .cloned()
    }

    /// Native keys written so far, in call order
    pub fn write_log(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    /// A handle on the write log that stays usable after the provider is
    /// boxed behind the router
    pub fn write_log_handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.writes)
    }
}

impl Provider for MemoryProvider {
    fn read(&self, native_key: &str, scope: Scope) -> Result<Option<PolicyValue>, ProviderError> {
        if self.denied.contains(native_key) {
            return Err(ProviderError::AccessDenied(native_key.to_string()));
        }

        Ok(self.stored(scope, native_key))
    }

    fn write(
        &self,
        native_key: &str,
        value: &PolicyValue,
        value_type: ValueType,
        scope: Scope,
    ) -> Result<(), ProviderError> {
        if self.denied.contains(native_key) || self.write_denied.contains(native_key) {
            return Err(ProviderError::AccessDenied(native_key.to_string()));
        }

        self.writes.borrow_mut().push(native_key.to_string());

        if self.stuck.contains(native_key) {
            return Ok(());
        }

        let coerced = value.coerce_to(value_type).ok_or_else(|| {
            ProviderError::Malformed(format!("cannot store {} as {}", value, value_type))
        })?;

        self.values
            .borrow_mut()
            .insert((scope, native_key.to_string()), coerced);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_values_read_back() {
        let provider = MemoryProvider::new();
        provider.seed(Scope::Machine, "a\\b", PolicyValue::Int(1));

        assert_eq!(
            provider.read("a\\b", Scope::Machine).unwrap(),
            Some(PolicyValue::Int(1))
        );
        assert_eq!(provider.read("a\\b", Scope::User).unwrap(), None);
    }

    #[test]
    fn writes_coerce_by_declared_type() {
        let provider = MemoryProvider::new();
        provider
            .write("a\\b", &PolicyValue::Bool(true), ValueType::Int, Scope::Machine)
            .unwrap();

        assert_eq!(
            provider.stored(Scope::Machine, "a\\b"),
            Some(PolicyValue::Int(1))
        );
    }

    #[test]
    fn repeated_writes_are_idempotent() {
        let provider = MemoryProvider::new();
        for _ in 0..2 {
            provider
                .write("a\\b", &PolicyValue::Int(255), ValueType::Int, Scope::Machine)
                .unwrap();
        }

        assert_eq!(
            provider.stored(Scope::Machine, "a\\b"),
            Some(PolicyValue::Int(255))
        );
        assert_eq!(provider.write_log().len(), 2);
    }

    #[test]
    fn denied_keys_fail_with_access_denied() {
        let mut provider = MemoryProvider::new();
        provider.deny("a\\b");

        assert!(matches!(
            provider.read("a\\b", Scope::Machine),
            Err(ProviderError::AccessDenied(_))
        ));
    }

    #[test]
    fn stuck_keys_accept_writes_without_storing() {
        let mut provider = MemoryProvider::new();
        provider.stick("a\\b");

        provider
            .write("a\\b", &PolicyValue::Int(1), ValueType::Int, Scope::Machine)
            .unwrap();

        assert_eq!(provider.stored(Scope::Machine, "a\\b"), None);
        assert_eq!(provider.write_log(), vec!["a\\b".to_string()]);
    }
}
