//! Boundary to the operating system.
//!
//! Everything above this module works with `RgbaImage`, paths and strings.
//! Native handles live and die inside `platform::windows`.

use crate::error::IconError;
use crate::tray::TrayStrategy;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(windows)]
pub mod windows;

/// Pixels produced by one native rasterisation, plus what the handle
/// reported about itself.
#[derive(Debug, Clone)]
pub struct RasterIcon {
    pub image: RgbaImage,
    pub bits_per_pixel: u16,
    pub format: &'static str,
}

impl RasterIcon {
    pub fn new(image: RgbaImage, bits_per_pixel: u16, format: &'static str) -> Self {
        Self {
            image,
            bits_per_pixel,
            format,
        }
    }
}

/// What a `.lnk` file points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutLink {
    pub target: Option<PathBuf>,
    pub icon_location: Option<(PathBuf, i32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    ClassesRoot,
    LocalMachine,
}

/// Native icon retrieval. Each method rasterises at `size` and releases every
/// handle it acquired before returning.
pub trait IconBackend: Send + Sync {
    /// Icon `index` of an exe/dll/ico, large set preferred over small.
    fn file_icon(&self, path: &Path, index: i32, size: u32) -> Result<RasterIcon, IconError>;

    /// Lookup in the process-independent system icon table.
    fn stock_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError>;

    /// Legacy lookup by resource index in the shared shell library.
    fn shell_resource_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError>;

    /// Shell namespace location such as `::{CLSID}`.
    fn location_icon(&self, location: &str, size: u32) -> Result<RasterIcon, IconError>;

    /// The icon the shell shows for an existing item (file or directory).
    fn item_icon(&self, path: &Path, size: u32) -> Result<RasterIcon, IconError>;

    fn resolve_shortcut(&self, path: &Path) -> Result<ShortcutLink, IconError>;

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Read-only registry access.
pub trait Registry: Send + Sync {
    /// Named value of `key`, `""` is the default value. Non-string values
    /// read as `None`.
    fn value(&self, hive: Hive, key: &str, name: &str) -> Option<String>;

    fn subkeys(&self, hive: Hive, key: &str) -> Vec<String>;

    /// `(name, data)` of every string value under `key`.
    fn values(&self, hive: Hive, key: &str) -> Vec<(String, String)>;

    fn default_value(&self, hive: Hive, key: &str) -> Option<String> {
        self.value(hive, key, "").filter(|v| !v.trim().is_empty())
    }
}

#[cfg(windows)]
pub fn native_backend() -> Arc<dyn IconBackend> {
    Arc::new(self::windows::WindowsBackend)
}

#[cfg(windows)]
pub fn native_registry() -> Arc<dyn Registry> {
    Arc::new(self::windows::registry::WinRegistry)
}

#[cfg(windows)]
pub fn native_tray_strategies() -> Vec<Box<dyn TrayStrategy>> {
    self::windows::tray::strategies()
}

#[cfg(windows)]
pub fn dependency_error() -> Option<IconError> {
    None
}

#[cfg(not(windows))]
pub fn native_backend() -> Arc<dyn IconBackend> {
    Arc::new(Unsupported)
}

#[cfg(not(windows))]
pub fn native_registry() -> Arc<dyn Registry> {
    Arc::new(Unsupported)
}

#[cfg(not(windows))]
pub fn native_tray_strategies() -> Vec<Box<dyn TrayStrategy>> {
    Vec::new()
}

#[cfg(not(windows))]
pub fn dependency_error() -> Option<IconError> {
    Some(unsupported())
}

#[cfg(not(windows))]
fn unsupported() -> IconError {
    IconError::MissingDependency(format!(
        "native shell icon APIs are not available on {}",
        std::env::consts::OS
    ))
}

/// Stand-in used on targets without the Windows shell.
#[cfg(not(windows))]
pub struct Unsupported;

#[cfg(not(windows))]
impl IconBackend for Unsupported {
    fn file_icon(&self, _: &Path, _: i32, _: u32) -> Result<RasterIcon, IconError> {
        Err(unsupported())
    }

    fn stock_icon(&self, _: u32, _: u32) -> Result<RasterIcon, IconError> {
        Err(unsupported())
    }

    fn shell_resource_icon(&self, _: u32, _: u32) -> Result<RasterIcon, IconError> {
        Err(unsupported())
    }

    fn location_icon(&self, _: &str, _: u32) -> Result<RasterIcon, IconError> {
        Err(unsupported())
    }

    fn item_icon(&self, _: &Path, _: u32) -> Result<RasterIcon, IconError> {
        Err(unsupported())
    }

    fn resolve_shortcut(&self, _: &Path) -> Result<ShortcutLink, IconError> {
        Err(unsupported())
    }
}

#[cfg(not(windows))]
impl Registry for Unsupported {
    fn value(&self, _: Hive, _: &str, _: &str) -> Option<String> {
        None
    }

    fn subkeys(&self, _: Hive, _: &str) -> Vec<String> {
        Vec::new()
    }

    fn values(&self, _: Hive, _: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}
