use crate::bitmap;
use crate::cache::IconCache;
use crate::config::EngineConfig;
use crate::error::IconError;
use crate::loader::NativeIconLoader;
use crate::platform;
use crate::source::{IconSource, IconSourceKind, cache_key, clamp_size};
use crate::tray::TrayIconDiscoverer;
use crate::types::{ExtractedIcon, IconFormat, IconInfo, IconSize, TrayIconRecord};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sizes produced by [`IconEngine::extract_all_sizes`].
pub const ALL_SIZES: [u32; 6] = [16, 32, 48, 64, 128, 256];

/// Sizes produced per icon by [`IconEngine::extract_icon_family`].
pub const FAMILY_SIZES: [u32; 4] = [
    IconSize::SMALL,
    IconSize::MEDIUM,
    IconSize::LARGE,
    IconSize::JUMBO,
];

/// Upper bound on the indices probed by [`IconEngine::list_icons_in_file`].
pub const MAX_LISTED_ICONS: i32 = 1024;

/// Entry point for the dock. Safe to share between threads: one lock covers
/// the cache lookup, the native extraction and the insert, and tray
/// discovery runs under the same lock.
pub struct IconEngine {
    loader: NativeIconLoader,
    tray: TrayIconDiscoverer,
    cache: Mutex<IconCache>,
    config: EngineConfig,
}

impl IconEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(config, NativeIconLoader::native(), TrayIconDiscoverer::native())
    }

    pub fn with_parts(
        config: EngineConfig,
        loader: NativeIconLoader,
        tray: TrayIconDiscoverer,
    ) -> Self {
        let cache = Mutex::new(IconCache::new(config.cache_size));
        Self {
            loader,
            tray,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `Some` when this build cannot reach the native icon APIs at all.
    pub fn dependency_error(&self) -> Option<IconError> {
        platform::dependency_error()
    }

    fn lock(&self) -> MutexGuard<'_, IconCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn extract_icon(&self, source: impl Into<IconSource>, size: u32, index: i32) -> ExtractedIcon {
        let source = source.into();
        let kind = self.loader.classify(&source, index);
        self.extract_kind(&source.identity(), kind, size, index)
    }

    pub fn extract_file_icon(&self, path: impl AsRef<Path>, size: u32, index: i32) -> ExtractedIcon {
        let path = path.as_ref();
        let identity = IconSource::from(path).identity();
        let kind = IconSourceKind::FileIcon {
            path: path.to_path_buf(),
            index,
        };
        self.extract_kind(&identity, kind, size, index)
    }

    pub fn extract_system_icon(&self, id: u32, size: u32) -> ExtractedIcon {
        self.extract_kind(&id.to_string(), IconSourceKind::SystemId(id), size, 0)
    }

    /// Accepts `"txt"` as well as `".txt"`.
    pub fn extract_extension_icon(&self, ext: &str, size: u32) -> ExtractedIcon {
        let ext = ext.trim();
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        let identity = ext.clone();
        self.extract_kind(&identity, IconSourceKind::Extension(ext), size, 0)
    }

    pub fn extract_shortcut_icon(&self, path: impl AsRef<Path>, size: u32) -> ExtractedIcon {
        let path = path.as_ref();
        let identity = IconSource::from(path).identity();
        self.extract_kind(&identity, IconSourceKind::Shortcut(path.to_path_buf()), size, 0)
    }

    pub fn extract_uwp_icon(&self, app_id: &str, size: u32) -> ExtractedIcon {
        self.extract_kind(app_id, IconSourceKind::UwpApp(app_id.to_string()), size, 0)
    }

    fn extract_kind(
        &self,
        identity: &str,
        kind: IconSourceKind,
        size: u32,
        index: i32,
    ) -> ExtractedIcon {
        let size = clamp_size(size);
        let compute = || {
            let info = IconInfo::new(identity, index, size);
            match self.loader.load(&kind, size) {
                Ok(raster) => ExtractedIcon::from_raster(raster, info),
                Err(err) => {
                    tracing::warn!(
                        source = identity,
                        kind = kind.name(),
                        size,
                        index,
                        %err,
                        "icon extraction failed"
                    );
                    ExtractedIcon::failed(info, err)
                }
            }
        };

        if !self.config.enable_cache {
            return compute();
        }
        let key = cache_key(identity, size, index);
        self.lock().get_or_compute(&key, compute)
    }

    /// Writes the icon in `format`, creating parent directories. Failed
    /// icons are never written.
    pub fn save_icon(
        &self,
        icon: &ExtractedIcon,
        path: impl AsRef<Path>,
        format: IconFormat,
        quality: u8,
    ) -> bool {
        let path = path.as_ref();
        if !icon.success() {
            return false;
        }
        let written = icon
            .encode(format, quality)
            .map_err(|e| e.to_string())
            .and_then(|bytes| write_with_parents(path, &bytes).map_err(|e| e.to_string()));
        match written {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to save icon");
                false
            }
        }
    }

    pub fn get_icon_bytes(&self, icon: &ExtractedIcon, format: IconFormat) -> Option<Vec<u8>> {
        if !icon.success() {
            return None;
        }
        icon.encode(format, 95)
            .map_err(|err| tracing::warn!(%err, "failed to encode icon"))
            .ok()
    }

    /// Probes index 0, 1, 2, ... at 32 px until one fails.
    pub fn list_icons_in_file(&self, path: impl AsRef<Path>) -> Vec<IconInfo> {
        let path = path.as_ref();
        if !self.loader.exists(path) {
            return Vec::new();
        }
        let mut found = Vec::new();
        for index in 0..MAX_LISTED_ICONS {
            let icon = self.extract_file_icon(path, IconSize::MEDIUM, index);
            if !icon.success() {
                break;
            }
            found.push(icon.info().clone());
        }
        found
    }

    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    pub fn get_tray_icons(&self, size: u32) -> Vec<TrayIconRecord> {
        let size = clamp_size(size);
        let _guard = self.lock();
        self.tray.discover(size)
    }

    /// Successful extractions keyed by size.
    pub fn extract_all_sizes(
        &self,
        source: impl Into<IconSource>,
        index: i32,
    ) -> BTreeMap<u32, ExtractedIcon> {
        let source = source.into();
        ALL_SIZES
            .iter()
            .map(|&size| (size, self.extract_icon(source.clone(), size, index)))
            .filter(|(_, icon)| icon.success())
            .collect()
    }

    /// Every icon in `path`, each at 16, 32, 48 and 256 px.
    pub fn extract_icon_family(
        &self,
        path: impl AsRef<Path>,
    ) -> BTreeMap<i32, Vec<ExtractedIcon>> {
        let path = path.as_ref();
        self.list_icons_in_file(path)
            .into_iter()
            .map(|info| {
                let icons = FAMILY_SIZES
                    .iter()
                    .map(|&size| self.extract_file_icon(path, size, info.index))
                    .filter(ExtractedIcon::success)
                    .collect();
                (info.index, icons)
            })
            .collect()
    }

    /// Multi-resolution `.ico` from the successful icons in `icons`.
    pub fn create_icon_file(&self, icons: &[ExtractedIcon], path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let frames = icons.iter().filter_map(ExtractedIcon::image);
        let written = bitmap::encode_ico_frames(frames)
            .map_err(|e| e.to_string())
            .and_then(|bytes| write_with_parents(path, &bytes).map_err(|e| e.to_string()));
        match written {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to write icon file");
                false
            }
        }
    }
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}
