use std::collections::BTreeMap;

use crate::provider::Platform;
use crate::router::PolicyError;
use crate::value::{PolicyValue, ValueType};

/// A policy the catalog knows how to locate in a native settings store
///
/// Immutable, defined at catalog build time; one entry exists per
/// (platform, friendly name) pair. The native key format is adapter-specific:
/// `SUBKEY\ValueName` on Windows, `domain:Key` on macOS.
#[derive(Debug, Clone)]
pub struct PolicyDefinition {
    pub platform: Platform,
    pub friendly_name: &'static str,
    pub native_key: &'static str,
    pub value_type: ValueType,
    pub default_value: PolicyValue,
    pub description: &'static str,
}

/// Static mapping from (platform, friendly name) to provider parameters
///
/// Built once at startup and passed by reference; tests substitute their own
/// catalog via [`Catalog::new`].
pub struct Catalog {
    entries: BTreeMap<(Platform, String), PolicyDefinition>,
}

impl Catalog {
    pub fn new(definitions: Vec<PolicyDefinition>) -> Self {
        let entries = definitions
            .into_iter()
            .map(|def| ((def.platform, def.friendly_name.to_string()), def))
            .collect();

        Self { entries }
    }

    /// The compiled-in security baseline catalog
    pub fn builtin() -> Self {
        Self::new(builtin_definitions())
    }

    /// Look up a policy definition; unknown pairs are an error, never a default
    pub fn lookup(&self, platform: Platform, name: &str) -> Result<&PolicyDefinition, PolicyError> {
        self.entries
            .get(&(platform, name.to_string()))
            .ok_or_else(|| PolicyError::UnknownPolicy {
                platform,
                name: name.to_string(),
            })
    }

    /// All definitions for one platform, or every platform, sorted by name
    pub fn list(&self, platform: Option<Platform>) -> Vec<&PolicyDefinition> {
        let mut definitions: Vec<&PolicyDefinition> = self
            .entries
            .values()
            .filter(|def| platform.is_none_or(|p| def.platform == p))
            .collect();

        definitions.sort_by_key(|def| (def.friendly_name, def.platform));
        definitions
    }
}

fn def(
    platform: Platform,
    friendly_name: &'static str,
    native_key: &'static str,
    value_type: ValueType,
    default_value: PolicyValue,
    description: &'static str,
) -> PolicyDefinition {
    PolicyDefinition {
        platform,
        friendly_name,
        native_key,
        value_type,
        default_value,
        description,
    }
}

fn builtin_definitions() -> Vec<PolicyDefinition> {
    use Platform::{MacOs, Windows};
    use ValueType::{Bool, Int, String as Str};

    vec![
        // Windows
        def(
            Windows,
            "AutoRunRestrictions",
            r"SOFTWARE\Microsoft\Windows\CurrentVersion\Policies\Explorer\NoDriveTypeAutoRun",
            Int,
            PolicyValue::Int(255),
            "Restricts AutoRun on all drive types",
        ),
        def(
            Windows,
            "AutomaticUpdates",
            r"SOFTWARE\Policies\Microsoft\Windows\WindowsUpdate\AU\NoAutoUpdate",
            Bool,
            PolicyValue::Bool(false),
            "Keeps automatic Windows Update downloads enabled (NoAutoUpdate=0)",
        ),
        def(
            Windows,
            "FirewallEnabled",
            r"SOFTWARE\Policies\Microsoft\WindowsFirewall\StandardProfile\EnableFirewall",
            Bool,
            PolicyValue::Bool(true),
            "Enables the Windows Firewall standard profile",
        ),
        def(
            Windows,
            "RemoteDesktopDenied",
            r"SYSTEM\CurrentControlSet\Control\Terminal Server\fDenyTSConnections",
            Bool,
            PolicyValue::Bool(true),
            "Denies inbound Remote Desktop connections",
        ),
        def(
            Windows,
            "ScreenSaverSecure",
            r"Control Panel\Desktop\ScreenSaverIsSecure",
            Str,
            PolicyValue::String("1".to_string()),
            "Requires a password to dismiss the screen saver",
        ),
        def(
            Windows,
            "ScreenSaverTimeout",
            r"Control Panel\Desktop\ScreenSaveTimeOut",
            Str,
            PolicyValue::String("900".to_string()),
            "Screen saver idle timeout in seconds",
        ),
        def(
            Windows,
            "SmbV1Enabled",
            r"SYSTEM\CurrentControlSet\Services\LanmanServer\Parameters\SMB1",
            Bool,
            PolicyValue::Bool(false),
            "Controls the legacy SMBv1 server protocol",
        ),
        def(
            Windows,
            "UacEnabled",
            r"SOFTWARE\Microsoft\Windows\CurrentVersion\Policies\System\EnableLUA",
            Bool,
            PolicyValue::Bool(true),
            "Enables User Account Control elevation prompts",
        ),
        // macOS
        def(
            MacOs,
            "AutomaticUpdates",
            "com.apple.SoftwareUpdate:AutomaticCheckEnabled",
            Bool,
            PolicyValue::Bool(true),
            "Enables automatic checks for macOS software updates",
        ),
        def(
            MacOs,
            "CrashReporterDialog",
            "com.apple.CrashReporter:DialogType",
            Str,
            PolicyValue::String("none".to_string()),
            "Suppresses the interactive crash reporter dialog",
        ),
        def(
            MacOs,
            "FirewallEnabled",
            "com.apple.alf:globalstate",
            Int,
            PolicyValue::Int(1),
            "Enables the application firewall (0=off, 1=on, 2=block all)",
        ),
        def(
            MacOs,
            "GatekeeperEnabled",
            "com.apple.systempolicy.control:EnableAssessment",
            Bool,
            PolicyValue::Bool(true),
            "Enables Gatekeeper code-signing assessment",
        ),
        def(
            MacOs,
            "GuestLoginEnabled",
            "com.apple.loginwindow:GuestEnabled",
            Bool,
            PolicyValue::Bool(false),
            "Controls the guest account at the login window",
        ),
        def(
            MacOs,
            "ScreenSaverIdleTime",
            "com.apple.screensaver:idleTime",
            Int,
            PolicyValue::Int(900),
            "Screen saver idle timeout in seconds",
        ),
        def(
            MacOs,
            "ScreenSaverPassword",
            "com.apple.screensaver:askForPassword",
            Bool,
            PolicyValue::Bool(true),
            "Requires a password to wake from the screen saver",
        ),
        def(
            MacOs,
            "ScreenSaverPasswordDelay",
            "com.apple.screensaver:askForPasswordDelay",
            Int,
            PolicyValue::Int(0),
            "Grace period in seconds before the wake password is required",
        ),
    ]
}
