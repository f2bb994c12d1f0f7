use winreg::enums::*;
use winreg::types::FromRegValue;
use winreg::{RegKey, RegValue};

use super::{Provider, ProviderError, Scope};
use crate::value::{PolicyValue, ValueType};

/// Registry-backed settings adapter
///
/// Native keys use the form `SUBKEY\ValueName`: everything up to the last
/// backslash is the subkey path, the last segment is the value name. The
/// scope selects the root: `Machine` reads HKLM, `User` reads HKCU.
pub struct RegistryProvider;

impl RegistryProvider {
    pub fn new() -> Self {
        RegistryProvider
    }
}

impl Default for RegistryProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a native key into (subkey path, value name)
fn split_native_key(native_key: &str) -> Result<(&str, &str), ProviderError> {
    native_key.rsplit_once('\\').ok_or_else(|| {
        ProviderError::Malformed(format!(
            "registry key '{}' has no value name component",
            native_key
        ))
    })
}

fn root_for_scope(scope: Scope) -> RegKey {
    match scope {
        Scope::Machine => RegKey::predef(HKEY_LOCAL_MACHINE),
        Scope::User => RegKey::predef(HKEY_CURRENT_USER),
    }
}

fn registry_error(context: &str, err: std::io::Error) -> ProviderError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => {
            ProviderError::AccessDenied(format!("{}: {}", context, err))
        }
        std::io::ErrorKind::NotFound => {
            ProviderError::NotFound(format!("{}: {}", context, err))
        }
        _ => ProviderError::Malformed(format!("{}: {}", context, err)),
    }
}

/// Coerce a policy value to a registry DWORD
///
/// Bools become 0/1; ints must fit an unsigned 32-bit value.
fn to_dword(value: &PolicyValue) -> Result<u32, ProviderError> {
    match value {
        PolicyValue::Bool(b) => Ok(u32::from(*b)),
        PolicyValue::Int(i) => u32::try_from(*i).map_err(|_| {
            ProviderError::Malformed(format!("integer {} does not fit a registry DWORD", i))
        }),
        other => Err(ProviderError::Malformed(format!(
            "cannot store {} as a registry DWORD",
            other
        ))),
    }
}

fn decode_raw_value(raw: &RegValue, native_key: &str) -> Result<PolicyValue, ProviderError> {
    match raw.vtype {
        REG_DWORD => {
            let bytes: [u8; 4] = raw.bytes.as_slice().try_into().map_err(|_| {
                ProviderError::Malformed(format!("DWORD at '{}' has wrong length", native_key))
            })?;
            Ok(PolicyValue::Int(i64::from(u32::from_le_bytes(bytes))))
        }
        REG_QWORD => {
            let bytes: [u8; 8] = raw.bytes.as_slice().try_into().map_err(|_| {
                ProviderError::Malformed(format!("QWORD at '{}' has wrong length", native_key))
            })?;
            let qword = u64::from_le_bytes(bytes);
            i64::try_from(qword).map(PolicyValue::Int).map_err(|_| {
                ProviderError::Malformed(format!("QWORD at '{}' out of range", native_key))
            })
        }
        REG_SZ | REG_EXPAND_SZ => String::from_reg_value(raw)
            .map(PolicyValue::String)
            .map_err(|e| {
                ProviderError::Malformed(format!("string at '{}' is not valid: {}", native_key, e))
            }),
        REG_BINARY => Ok(PolicyValue::Binary(raw.bytes.clone())),
        other => Err(ProviderError::Malformed(format!(
            "unsupported registry type {:?} at '{}'",
            other, native_key
        ))),
    }
}

impl Provider for RegistryProvider {
    fn read(&self, native_key: &str, scope: Scope) -> Result<Option<PolicyValue>, ProviderError> {
        let (subkey, value_name) = split_native_key(native_key)?;

        let key = match root_for_scope(scope).open_subkey_with_flags(subkey, KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(registry_error(&format!("failed to open '{}'", subkey), e)),
        };

        let raw = match key.get_raw_value(value_name) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(registry_error(
                    &format!("failed to read '{}\\{}'", subkey, value_name),
                    e,
                ))
            }
        };

        decode_raw_value(&raw, native_key).map(Some)
    }

    fn write(
        &self,
        native_key: &str,
        value: &PolicyValue,
        value_type: ValueType,
        scope: Scope,
    ) -> Result<(), ProviderError> {
        let (subkey, value_name) = split_native_key(native_key)?;

        let (key, _) = root_for_scope(scope).create_subkey(subkey).map_err(|e| {
            registry_error(&format!("failed to create '{}'", subkey), e)
        })?;

        match value_type {
            ValueType::Bool | ValueType::Int => {
                let dword = to_dword(value)?;
                key.set_value(value_name, &dword).map_err(|e| {
                    registry_error(
                        &format!("failed to set DWORD '{}\\{}'", subkey, value_name),
                        e,
                    )
                })
            }
            ValueType::String => match value {
                PolicyValue::String(s) => key.set_value(value_name, s).map_err(|e| {
                    registry_error(
                        &format!("failed to set string '{}\\{}'", subkey, value_name),
                        e,
                    )
                }),
                other => Err(ProviderError::Malformed(format!(
                    "cannot store {} as a registry string",
                    other
                ))),
            },
            ValueType::Binary => match value {
                PolicyValue::Binary(bytes) => {
                    let raw = RegValue {
                        bytes: bytes.clone(),
                        vtype: REG_BINARY,
                    };
                    key.set_raw_value(value_name, &raw).map_err(|e| {
                        registry_error(
                            &format!("failed to set binary '{}\\{}'", subkey, value_name),
                            e,
                        )
                    })
                }
                other => Err(ProviderError::Malformed(format!(
                    "cannot store {} as registry binary data",
                    other
                ))),
            },
        }
    }
}
