//! Packaged app logo lookup through the AppModel repository in the registry.
//!
//! Matching is by case-insensitive substring on family and package names,
//! so it can pick a different asset than the shell would.

use crate::platform::{Hive, Registry};
use std::path::{Path, PathBuf};

pub const FAMILIES_KEY: &str = r"SOFTWARE\Classes\Local Settings\Software\Microsoft\Windows\CurrentVersion\AppModel\Repository\Families";
pub const PACKAGES_KEY: &str = r"SOFTWARE\Classes\Local Settings\Software\Microsoft\Windows\CurrentVersion\AppModel\Repository\Packages";

/// Scale qualifiers tried for a logo, largest first. The unqualified name is
/// tried after these.
pub const LOGO_SCALES: [u32; 5] = [400, 200, 150, 125, 100];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMatch {
    pub family: String,
    pub package: String,
    pub logos: Vec<String>,
}

/// First package whose family and full name both contain `app_id`.
pub fn find_package(registry: &dyn Registry, app_id: &str) -> Option<PackageMatch> {
    let needle = app_id.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    for family in registry.subkeys(Hive::LocalMachine, FAMILIES_KEY) {
        if !family.to_lowercase().contains(&needle) {
            continue;
        }
        let family_key = format!(r"{FAMILIES_KEY}\{family}");
        let with_packages = format!(r"{family_key}\Packages");

        // Older layouts nest packages under `Packages`, newer ones list them
        // directly below the family.
        for container in [with_packages, family_key] {
            for package in registry.subkeys(Hive::LocalMachine, &container) {
                if package.eq_ignore_ascii_case("Packages")
                    || !package.to_lowercase().contains(&needle)
                {
                    continue;
                }
                let resources = format!(r"{container}\{package}\Resources");
                let logos = registry
                    .values(Hive::LocalMachine, &resources)
                    .into_iter()
                    .filter(|(name, data)| name.to_lowercase().contains("logo") && !data.is_empty())
                    .map(|(_, data)| data)
                    .collect();
                tracing::debug!(%family, %package, "matched packaged app");
                return Some(PackageMatch {
                    family,
                    package,
                    logos,
                });
            }
        }
    }
    None
}

/// Install directory of a package, from the repository if it records one.
pub fn install_dir(
    registry: &dyn Registry,
    package: &str,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    let key = format!(r"{PACKAGES_KEY}\{package}");
    if let Some(root) = registry.value(Hive::LocalMachine, &key, "PackageRootFolder") {
        if !root.trim().is_empty() {
            return PathBuf::from(root);
        }
    }
    let program_files = env("ProgramFiles").unwrap_or_else(|| r"C:\Program Files".to_string());
    Path::new(&program_files).join("WindowsApps").join(package)
}

/// `Assets\Logo.png` → `Assets\Logo.scale-400.png`, ..., `Assets\Logo.png`.
pub fn logo_candidates(base: &Path, logo: &str) -> Vec<PathBuf> {
    let relative = logo.trim().trim_start_matches(['\\', '/']);
    let plain = base.join(relative);
    let (Some(stem), Some(ext)) = (plain.file_stem(), plain.extension()) else {
        return vec![plain];
    };
    let (stem, ext) = (stem.to_string_lossy(), ext.to_string_lossy());

    let mut out: Vec<PathBuf> = LOGO_SCALES
        .iter()
        .map(|scale| plain.with_file_name(format!("{stem}.scale-{scale}.{ext}")))
        .collect();
    out.push(plain);
    out
}

/// Walks the repository for `app_id` and returns the first logo file that
/// `exists` accepts.
pub fn find_logo(
    registry: &dyn Registry,
    app_id: &str,
    env: impl Fn(&str) -> Option<String>,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    let found = find_package(registry, app_id)?;
    let base = install_dir(registry, &found.package, env);
    found
        .logos
        .iter()
        .flat_map(|logo| logo_candidates(&base, logo))
        .find(|candidate| exists(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Tree {
        keys: HashMap<String, Vec<String>>,
        values: HashMap<String, Vec<(String, String)>>,
    }

    impl Registry for Tree {
        fn value(&self, _: Hive, key: &str, name: &str) -> Option<String> {
            self.values
                .get(key)?
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        }

        fn subkeys(&self, _: Hive, key: &str) -> Vec<String> {
            self.keys.get(key).cloned().unwrap_or_default()
        }

        fn values(&self, _: Hive, key: &str) -> Vec<(String, String)> {
            self.values.get(key).cloned().unwrap_or_default()
        }
    }

    const FAMILY: &str = "Microsoft.WindowsCalculator_8wekyb3d8bbwe";
    const PACKAGE: &str = "Microsoft.WindowsCalculator_11.2210.0.0_x64__8wekyb3d8bbwe";

    fn calculator() -> Tree {
        let mut tree = Tree::default();
        tree.keys.insert(
            FAMILIES_KEY.to_string(),
            vec!["Contoso.Notes_abc".into(), FAMILY.into()],
        );
        tree.keys.insert(
            format!(r"{FAMILIES_KEY}\{FAMILY}\Packages"),
            vec![PACKAGE.into()],
        );
        tree.values.insert(
            format!(r"{FAMILIES_KEY}\{FAMILY}\Packages\{PACKAGE}\Resources"),
            vec![
                ("DisplayName".into(), "Calculator".into()),
                ("Square44x44Logo".into(), r"Assets\CalculatorAppList.png".into()),
            ],
        );
        tree
    }

    #[test]
    fn matches_family_and_package_by_substring() {
        let found = find_package(&calculator(), "windowscalculator").unwrap();
        assert_eq!(found.package, PACKAGE);
        assert_eq!(found.logos, vec![r"Assets\CalculatorAppList.png".to_string()]);
    }

    #[test]
    fn unknown_app_has_no_match() {
        assert!(find_package(&calculator(), "Paint").is_none());
        assert!(find_package(&calculator(), "  ").is_none());
    }

    #[test]
    fn scale_variants_come_first() {
        let names: Vec<String> = logo_candidates(Path::new("base"), "Assets/Logo.png")
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("Logo.scale-400.png"));
        assert_eq!(names.last().map(String::as_str), Some("Logo.png"));
        assert_eq!(names.len(), LOGO_SCALES.len() + 1);
    }

    #[test]
    fn install_dir_prefers_recorded_root() {
        let mut tree = calculator();
        tree.values.insert(
            format!(r"{PACKAGES_KEY}\{PACKAGE}"),
            vec![("PackageRootFolder".into(), "D:/Apps/Calc".into())],
        );
        assert_eq!(install_dir(&tree, PACKAGE, |_| None), PathBuf::from("D:/Apps/Calc"));
    }

    #[test]
    fn install_dir_falls_back_to_windows_apps() {
        let dir = install_dir(&calculator(), PACKAGE, |_| Some("P:".to_string()));
        assert!(dir.ends_with(Path::new("WindowsApps").join(PACKAGE)));
    }

    #[test]
    fn find_logo_returns_first_existing_variant() {
        let logo = find_logo(
            &calculator(),
            "Calculator",
            |_| Some("PF".to_string()),
            |p| p.to_string_lossy().contains("scale-200"),
        )
        .unwrap();
        assert!(logo.to_string_lossy().ends_with("CalculatorAppList.scale-200.png"));
    }
}
