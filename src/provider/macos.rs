use plist::{Dictionary, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Provider, ProviderError, Scope};
use crate::value::{PolicyValue, ValueType};

/// Default location of system-wide preference domains
const SYSTEM_PREFERENCES_DIR: &str = "/Library/Preferences";

/// Preference-domain settings adapter
///
/// Native keys use the form `domain:Key`, e.g.
/// `com.apple.screensaver:askForPassword`. Each domain is one plist file
/// under the preferences directory; scope is ignored on macOS.
pub struct PreferencesProvider {
    prefs_dir: PathBuf,
}

impl PreferencesProvider {
    pub fn new() -> Self {
        Self {
            prefs_dir: PathBuf::from(SYSTEM_PREFERENCES_DIR),
        }
    }

    /// Use an alternate preferences directory (tests)
    pub fn with_prefs_dir(prefs_dir: impl Into<PathBuf>) -> Self {
        Self {
            prefs_dir: prefs_dir.into(),
        }
    }

    fn plist_path(&self, domain: &str) -> PathBuf {
        self.prefs_dir.join(format!("{}.plist", domain))
    }

    /// Load a domain's dictionary, or an empty one if the plist is absent
    fn load_domain(&self, path: &Path) -> Result<Dictionary, ProviderError> {
        if !path.exists() {
            return Ok(Dictionary::new());
        }

        let file = std::fs::File::open(path)
            .map_err(|e| fs_error(&format!("failed to open '{}'", path.display()), e))?;

        match plist::from_reader(file) {
            Ok(Value::Dictionary(dict)) => Ok(dict),
            Ok(_) => Err(ProviderError::Malformed(format!(
                "'{}' is not a plist dictionary",
                path.display()
            ))),
            Err(e) => Err(ProviderError::Malformed(format!(
                "failed to parse '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

impl Default for PreferencesProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a native key into (preference domain, key name)
fn split_native_key(native_key: &str) -> Result<(&str, &str), ProviderError> {
    native_key.split_once(':').ok_or_else(|| {
        ProviderError::Malformed(format!(
            "preference key '{}' has no domain separator",
            native_key
        ))
    })
}

fn fs_error(context: &str, err: std::io::Error) -> ProviderError {
    match err.kind() {
        ErrorKind::PermissionDenied => ProviderError::AccessDenied(format!("{}: {}", context, err)),
        ErrorKind::NotFound => ProviderError::NotFound(format!("{}: {}", context, err)),
        _ => ProviderError::Malformed(format!("{}: {}", context, err)),
    }
}

/// Convert a stored plist value into a policy value
fn from_plist(value: &Value, native_key: &str) -> Result<PolicyValue, ProviderError> {
    match value {
        Value::Boolean(b) => Ok(PolicyValue::Bool(*b)),
        Value::Integer(i) => i.as_signed().map(PolicyValue::Int).ok_or_else(|| {
            ProviderError::Malformed(format!("integer at '{}' out of range", native_key))
        }),
        Value::String(s) => Ok(PolicyValue::String(s.clone())),
        Value::Data(bytes) => Ok(PolicyValue::Binary(bytes.clone())),
        Value::Real(r) if r.fract() == 0.0 => Ok(PolicyValue::Int(*r as i64)),
        other => Err(ProviderError::Malformed(format!(
            "unsupported plist type {:?} at '{}'",
            other, native_key
        ))),
    }
}

/// Coerce a policy value to the plist representation for the declared type
fn to_plist(value: &PolicyValue, value_type: ValueType) -> Result<Value, ProviderError> {
    match (value_type, value) {
        (ValueType::Bool, PolicyValue::Bool(b)) => Ok(Value::Boolean(*b)),
        (ValueType::Bool, PolicyValue::Int(0)) => Ok(Value::Boolean(false)),
        (ValueType::Bool, PolicyValue::Int(1)) => Ok(Value::Boolean(true)),
        (ValueType::Int, PolicyValue::Int(i)) => Ok(Value::Integer((*i).into())),
        (ValueType::Int, PolicyValue::Bool(b)) => Ok(Value::Integer(i64::from(*b).into())),
        (ValueType::String, PolicyValue::String(s)) => Ok(Value::String(s.clone())),
        (ValueType::Binary, PolicyValue::Binary(bytes)) => Ok(Value::Data(bytes.clone())),
        (declared, other) => Err(ProviderError::Malformed(format!(
            "cannot store {} as a plist {}",
            other, declared
        ))),
    }
}

impl Provider for PreferencesProvider {
    fn read(&self, native_key: &str, _scope: Scope) -> Result<Option<PolicyValue>, ProviderError> {
        let (domain, key) = split_native_key(native_key)?;
        let path = self.plist_path(domain);

        if !path.exists() {
            return Ok(None);
        }

        let dict = self.load_domain(&path)?;
        match dict.get(key) {
            Some(value) => from_plist(value, native_key).map(Some),
            None => Ok(None),
        }
    }

    fn write(
        &self,
        native_key: &str,
        value: &PolicyValue,
        value_type: ValueType,
        _scope: Scope,
    ) -> Result<(), ProviderError> {
        let (domain, key) = split_native_key(native_key)?;
        let path = self.plist_path(domain);

        // Read-modify-write so unrelated keys in the domain survive
        let mut dict = match self.load_domain(&path) {
            Ok(dict) => dict,
            Err(ProviderError::Malformed(msg)) => {
                tracing::warn!("Replacing unparseable preference domain: {}", msg);
                Dictionary::new()
            }
            Err(e) => return Err(e),
        };

        dict.insert(key.to_string(), to_plist(value, value_type)?);

        std::fs::create_dir_all(&self.prefs_dir).map_err(|e| {
            fs_error(
                &format!("failed to create '{}'", self.prefs_dir.display()),
                e,
            )
        })?;

        let file = std::fs::File::create(&path)
            .map_err(|e| fs_error(&format!("failed to create '{}'", path.display()), e))?;

        plist::to_writer_xml(file, &Value::Dictionary(dict)).map_err(|e| {
            ProviderError::Malformed(format!("failed to write '{}': {}", path.display(), e))
        })?;

        super::common::set_permissions_readable_all(&path)
            .map_err(|e| ProviderError::Malformed(format!("{:#}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn split_native_key_separates_domain_and_key() {
        let (domain, key) = split_native_key("com.apple.screensaver:askForPassword").unwrap();
        assert_eq!(domain, "com.apple.screensaver");
        assert_eq!(key, "askForPassword");
    }

    #[test]
    fn split_native_key_rejects_bare_names() {
        assert!(split_native_key("askForPassword").is_err());
    }

    #[test]
    fn to_plist_coerces_by_declared_type() {
        assert_eq!(
            to_plist(&PolicyValue::Int(1), ValueType::Bool).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            to_plist(&PolicyValue::Bool(true), ValueType::Int).unwrap(),
            Value::Integer(1.into())
        );
        assert!(to_plist(&PolicyValue::String("1".to_string()), ValueType::Bool).is_err());
    }

    #[test]
    fn from_plist_maps_native_types() {
        assert_eq!(
            from_plist(&Value::Boolean(true), "d:k").unwrap(),
            PolicyValue::Bool(true)
        );
        assert_eq!(
            from_plist(&Value::Integer(900.into()), "d:k").unwrap(),
            PolicyValue::Int(900)
        );
        assert_eq!(
            from_plist(&Value::Real(3.0), "d:k").unwrap(),
            PolicyValue::Int(3)
        );
        assert!(from_plist(&Value::Real(3.5), "d:k").is_err());
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let provider = PreferencesProvider::with_prefs_dir(dir.path());

        provider
            .write(
                "com.test.domain:AskForPassword",
                &PolicyValue::Bool(true),
                ValueType::Bool,
                Scope::Machine,
            )
            .unwrap();

        let value = provider
            .read("com.test.domain:AskForPassword", Scope::Machine)
            .unwrap();
        assert_eq!(value, Some(PolicyValue::Bool(true)));
    }

    #[test]
    fn read_unset_key_is_absent() {
        let dir = tempdir().unwrap();
        let provider = PreferencesProvider::with_prefs_dir(dir.path());

        let value = provider
            .read("com.test.domain:NotThere", Scope::Machine)
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn write_preserves_unrelated_keys() {
        let dir = tempdir().unwrap();
        let provider = PreferencesProvider::with_prefs_dir(dir.path());

        provider
            .write(
                "com.test.domain:KeyA",
                &PolicyValue::Int(900),
                ValueType::Int,
                Scope::Machine,
            )
            .unwrap();
        provider
            .write(
                "com.test.domain:KeyB",
                &PolicyValue::String("none".to_string()),
                ValueType::String,
                Scope::Machine,
            )
            .unwrap();

        assert_eq!(
            provider.read("com.test.domain:KeyA", Scope::Machine).unwrap(),
            Some(PolicyValue::Int(900))
        );
        assert_eq!(
            provider.read("com.test.domain:KeyB", Scope::Machine).unwrap(),
            Some(PolicyValue::String("none".to_string()))
        );
    }

    #[test]
    fn scope_does_not_change_where_preferences_land() {
        let dir = tempdir().unwrap();
        let provider = PreferencesProvider::with_prefs_dir(dir.path());

        provider
            .write(
                "com.test.domain:Key",
                &PolicyValue::Int(1),
                ValueType::Int,
                Scope::User,
            )
            .unwrap();

        assert_eq!(
            provider.read("com.test.domain:Key", Scope::Machine).unwrap(),
            Some(PolicyValue::Int(1))
        );
    }
}
