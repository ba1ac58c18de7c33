use crate::platform::{Hive, Registry};
use winreg::RegKey;
use winreg::enums::{HKEY_CLASSES_ROOT, HKEY_LOCAL_MACHINE, KEY_READ};

/// The live registry, opened read-only.
pub struct WinRegistry;

impl WinRegistry {
    fn open(hive: Hive, key: &str) -> Option<RegKey> {
        let root = match hive {
            Hive::ClassesRoot => RegKey::predef(HKEY_CLASSES_ROOT),
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        };
        root.open_subkey_with_flags(key, KEY_READ)
            .map_err(|err| tracing::trace!(?hive, key, %err, "registry key not readable"))
            .ok()
    }
}

impl Registry for WinRegistry {
    fn value(&self, hive: Hive, key: &str, name: &str) -> Option<String> {
        Self::open(hive, key)?.get_value::<String, _>(name).ok()
    }

    fn subkeys(&self, hive: Hive, key: &str) -> Vec<String> {
        Self::open(hive, key)
            .map(|k| k.enum_keys().filter_map(Result::ok).collect())
            .unwrap_or_default()
    }

    fn values(&self, hive: Hive, key: &str) -> Vec<(String, String)> {
        let Some(key) = Self::open(hive, key) else {
            return Vec::new();
        };
        key.enum_values()
            .filter_map(Result::ok)
            .filter_map(|(name, _)| key.get_value::<String, _>(&name).ok().map(|data| (name, data)))
            .collect()
    }
}
