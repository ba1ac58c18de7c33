//! Win32 implementation of the platform traits. Every handle acquired here is
//! wrapped in a guard whose `Drop` releases it.

pub mod convert;
pub mod process;
pub mod raw;
pub mod registry;
pub mod shell;
pub mod tray;
pub mod window;

use crate::error::IconError;
use crate::platform::{IconBackend, RasterIcon, ShortcutLink};
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use windows::Win32::UI::WindowsAndMessaging::{DestroyIcon, HICON};

pub fn to_wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

pub fn from_wide(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}

/// An icon handle together with whether we must destroy it.
///
/// Handles from `ExtractIconEx`, `ExtractIcon` and `SHGetFileInfo` belong to
/// us. Handles from `LoadIcon`, `WM_GETICON`, class icons and another
/// process's tray data are shared and must not be destroyed.
#[derive(Debug)]
pub struct NativeIcon {
    handle: HICON,
    owned: bool,
}

impl NativeIcon {
    pub fn owned(handle: HICON) -> Option<Self> {
        (!handle.is_invalid()).then_some(Self {
            handle,
            owned: true,
        })
    }

    pub fn borrowed(handle: HICON) -> Option<Self> {
        (!handle.is_invalid()).then_some(Self {
            handle,
            owned: false,
        })
    }

    pub fn handle(&self) -> HICON {
        self.handle
    }

    pub fn to_raster(&self, size: u32) -> Result<RasterIcon, IconError> {
        convert::to_raster(self.handle, size)
    }
}

impl Drop for NativeIcon {
    fn drop(&mut self) {
        if self.owned && !self.handle.is_invalid() {
            unsafe {
                let _ = DestroyIcon(self.handle);
            }
        }
    }
}

pub struct WindowsBackend;

impl IconBackend for WindowsBackend {
    fn file_icon(&self, path: &Path, index: i32, size: u32) -> Result<RasterIcon, IconError> {
        let icon = shell::extract_icon_pair(path, index).ok_or_else(|| {
            IconError::SourceNotFound(format!("{} has no icon at index {index}", path.display()))
        })?;
        icon.to_raster(size)
    }

    fn stock_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError> {
        shell::load_stock_icon(id)
            .ok_or_else(|| IconError::SourceNotFound(format!("no stock icon {id}")))?
            .to_raster(size)
    }

    fn shell_resource_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError> {
        shell::shell32_icon(id)
            .ok_or_else(|| IconError::SourceNotFound(format!("shell32.dll has no icon {id}")))?
            .to_raster(size)
    }

    fn location_icon(&self, location: &str, size: u32) -> Result<RasterIcon, IconError> {
        shell::location_icon(location)?.to_raster(size)
    }

    fn item_icon(&self, path: &Path, size: u32) -> Result<RasterIcon, IconError> {
        shell::item_icon(path, size)
    }

    fn resolve_shortcut(&self, path: &Path) -> Result<ShortcutLink, IconError> {
        shell::resolve_shortcut(path)
    }
}
