use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub enable_cache: bool,
    pub cache_size: usize,
    pub default_size: u32,
    pub tray_size: u32,
    /// Background for composed app icons, `<exe dir>/assets/app_model.png`
    /// when unset.
    pub template_path: Option<PathBuf>,
    /// `<local data dir>/AppIcon` when unset.
    pub icon_store_dir: Option<PathBuf>,
    pub store_icon_size: u32,
    pub template_inner_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_size: 100,
            default_size: 48,
            tray_size: 32,
            template_path: None,
            icon_store_dir: None,
            store_icon_size: 64,
            template_inner_size: 128,
        }
    }
}

impl EngineConfig {
    pub fn template_path(&self) -> PathBuf {
        self.template_path
            .clone()
            .unwrap_or_else(|| exe_dir().join("assets").join("app_model.png"))
    }

    pub fn icon_store_dir(&self) -> PathBuf {
        self.icon_store_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("AppIcon")
        })
    }
}

/// Missing file means defaults; a file that exists must parse.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(EngineConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `config.json` next to the executable, then in the working directory.
pub fn find_config() -> Option<PathBuf> {
    [exe_dir().join(CONFIG_FILE), PathBuf::from(CONFIG_FILE)]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "cache_size": 2, "enable_cache": false }"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cache_size, 2);
        assert!(!config.enable_cache);
        assert_eq!(config.default_size, 48);
        assert_eq!(config.tray_size, 32);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn derived_paths() {
        let config = EngineConfig::default();
        assert!(config.template_path().ends_with("assets/app_model.png"));
        assert!(config.icon_store_dir().ends_with("AppIcon"));

        let explicit = EngineConfig {
            icon_store_dir: Some(PathBuf::from("store")),
            ..EngineConfig::default()
        };
        assert_eq!(explicit.icon_store_dir(), PathBuf::from("store"));
    }
}
