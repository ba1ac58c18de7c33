use crate::bitmap;
use crate::error::IconError;
use crate::platform::{self, Hive, IconBackend, RasterIcon, Registry};
use crate::source::{IconSource, IconSourceKind, classify};
use crate::types::SystemIcons;
use crate::uwp;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension → file → shortcut chains stop after this many hops.
pub const MAX_RESOLVE_DEPTH: u8 = 4;

/// Turns an [`IconSourceKind`] into pixels by picking the native call for
/// that kind and running its fallbacks.
#[derive(Clone)]
pub struct NativeIconLoader {
    backend: Arc<dyn IconBackend>,
    registry: Arc<dyn Registry>,
}

impl NativeIconLoader {
    pub fn new(backend: Arc<dyn IconBackend>, registry: Arc<dyn Registry>) -> Self {
        Self { backend, registry }
    }

    pub fn native() -> Self {
        Self::new(platform::native_backend(), platform::native_registry())
    }

    pub fn classify(&self, source: &IconSource, index: i32) -> IconSourceKind {
        classify(source, index, |p| self.backend.path_exists(p))
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.backend.path_exists(path)
    }

    pub fn load(&self, kind: &IconSourceKind, size: u32) -> Result<RasterIcon, IconError> {
        self.load_at(kind, size, 0)
    }

    fn load_at(&self, kind: &IconSourceKind, size: u32, depth: u8) -> Result<RasterIcon, IconError> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(IconError::SourceNotFound(format!(
                "gave up resolving {} after {MAX_RESOLVE_DEPTH} hops",
                kind.name()
            )));
        }
        tracing::trace!(kind = kind.name(), size, depth, "loading icon");

        match kind {
            IconSourceKind::SystemId(id) => self.system_icon(*id, size),
            IconSourceKind::SpecialLocation(location) => self.backend.location_icon(location, size),
            IconSourceKind::FileIcon { path, index } => self.file_icon(path, *index, size),
            IconSourceKind::Shortcut(path) => self.shortcut_icon(path, size, depth),
            IconSourceKind::Extension(ext) => self.extension_icon(ext, size, depth),
            IconSourceKind::UwpApp(app_id) => self.uwp_icon(app_id, size, depth),
            IconSourceKind::Unrecognized(text) => {
                Err(IconError::UnrecognizedSource(text.clone()))
            }
        }
    }

    fn file_icon(&self, path: &Path, index: i32, size: u32) -> Result<RasterIcon, IconError> {
        if let Some(format) = raster_format(path) {
            // A raster image holds exactly one icon.
            if index != 0 {
                return Err(IconError::SourceNotFound(format!(
                    "{} has no icon #{index}",
                    path.display()
                )));
            }
            return self.raster_icon(path, size, format);
        }
        if index == 0 && self.backend.is_dir(path) {
            return self.backend.item_icon(path, size);
        }
        self.backend.file_icon(path, index, size)
    }

    fn raster_icon(
        &self,
        path: &Path,
        size: u32,
        format: &'static str,
    ) -> Result<RasterIcon, IconError> {
        if !self.backend.path_exists(path) {
            return Err(IconError::SourceNotFound(path.display().to_string()));
        }
        let decoded = image::open(path)?;
        let bits = decoded.color().bits_per_pixel();
        Ok(RasterIcon::new(bitmap::fit_square(&decoded, size), bits, format))
    }

    fn system_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError> {
        self.backend.stock_icon(id, size).or_else(|err| {
            tracing::debug!(id, %err, "system icon table had nothing, trying shell resources");
            self.backend.shell_resource_icon(id, size)
        })
    }

    fn extension_icon(&self, ext: &str, size: u32, depth: u8) -> Result<RasterIcon, IconError> {
        let resolved = extension_key(ext)
            .and_then(|key| self.default_icon(&key))
            .and_then(|value| self.icon_location(&value));

        if let Some((file, index)) = resolved {
            tracing::debug!(ext, file = %file.display(), index, "resolved DefaultIcon");
            let target = IconSourceKind::FileIcon { path: file, index };
            match self.load_at(&target, size, depth + 1) {
                Ok(icon) => return Ok(icon),
                Err(err) => tracing::debug!(ext, %err, "DefaultIcon target failed"),
            }
        }
        self.system_icon(SystemIcons::UNKNOWN_FILE, size)
    }

    /// `DefaultIcon` of the registered type, else of the extension key.
    fn default_icon(&self, key: &str) -> Option<String> {
        let by_type = self
            .registry
            .default_value(Hive::ClassesRoot, key)
            .and_then(|prog_id| {
                self.registry
                    .default_value(Hive::ClassesRoot, &format!(r"{}\DefaultIcon", prog_id.trim()))
            });
        by_type.or_else(|| {
            self.registry
                .default_value(Hive::ClassesRoot, &format!(r"{key}\DefaultIcon"))
        })
    }

    fn icon_location(&self, value: &str) -> Option<(PathBuf, i32)> {
        let (file, index) = parse_icon_location(value)?;
        let expanded = expand_env_vars(&file, |name| self.backend.env_var(name));
        let path = PathBuf::from(&expanded);

        if path.is_relative() && !self.backend.path_exists(&path) {
            if let Some(root) = self.backend.env_var("SystemRoot") {
                let system = Path::new(&root).join("System32").join(&path);
                if self.backend.path_exists(&system) {
                    return Some((system, index));
                }
            }
        }
        Some((path, index))
    }

    fn shortcut_icon(&self, link: &Path, size: u32, depth: u8) -> Result<RasterIcon, IconError> {
        if !self.backend.path_exists(link) {
            return Err(IconError::SourceNotFound(link.display().to_string()));
        }

        let resolved = self.backend.resolve_shortcut(link).unwrap_or_else(|err| {
            tracing::debug!(link = %link.display(), %err, "shortcut did not resolve");
            Default::default()
        });

        if let Some(target) = resolved.target.filter(|t| self.backend.path_exists(t)) {
            let kind = if self.backend.is_dir(&target) {
                IconSourceKind::FileIcon {
                    path: target,
                    index: 0,
                }
            } else {
                self.classify(&IconSource::from(target), 0)
            };
            return self.load_at(&kind, size, depth + 1);
        }

        if let Some((file, index)) = resolved.icon_location {
            let expanded = PathBuf::from(expand_env_vars(&file.to_string_lossy(), |name| {
                self.backend.env_var(name)
            }));
            if self.backend.path_exists(&expanded) {
                let kind = IconSourceKind::FileIcon {
                    path: expanded,
                    index,
                };
                if let Ok(icon) = self.load_at(&kind, size, depth + 1) {
                    return Ok(icon);
                }
            }
        }

        self.backend
            .file_icon(link, 0, size)
            .or_else(|_| self.backend.item_icon(link, size))
    }

    fn uwp_icon(&self, app_id: &str, size: u32, depth: u8) -> Result<RasterIcon, IconError> {
        let logo = uwp::find_logo(
            self.registry.as_ref(),
            app_id,
            |name| self.backend.env_var(name),
            |p| self.backend.path_exists(p),
        );
        if let Some(logo) = logo {
            let kind = IconSourceKind::FileIcon {
                path: logo,
                index: 0,
            };
            return self.load_at(&kind, size, depth + 1);
        }

        let as_path = Path::new(app_id);
        if self.backend.path_exists(as_path) {
            if let Ok(icon) = self.backend.item_icon(as_path, size) {
                return Ok(icon);
            }
        }
        Err(IconError::UwpResolutionFailure(app_id.to_string()))
    }
}

/// Plain image files are decoded directly instead of going through the shell.
fn raster_format(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("PNG"),
        "jpg" | "jpeg" => Some("JPEG"),
        "bmp" => Some("BMP"),
        "gif" => Some("GIF"),
        _ => None,
    }
}

/// `"x.TXT"`, `"txt.TXT"` and `".txt"` all become `".txt"`.
pub fn extension_key(text: &str) -> Option<String> {
    let (_, suffix) = text.trim().rsplit_once('.').unwrap_or(("", text.trim()));
    let suffix = suffix.trim();
    if suffix.is_empty() || suffix.contains(['\\', '/', ' ']) {
        return None;
    }
    Some(format!(".{}", suffix.to_lowercase()))
}

/// Splits a `"<file>,<index>"` registry value. Quotes and a leading `@` are
/// stripped, a missing or non-numeric index reads as 0, and `%1` (icon
/// computed per file) yields `None`.
pub fn parse_icon_location(value: &str) -> Option<(String, i32)> {
    let value = value.trim().trim_start_matches('@');
    let (file, index) = match value.rsplit_once(',') {
        Some((file, index)) => match index.trim().parse::<i32>() {
            Ok(index) => (file, index),
            Err(_) => (value, 0),
        },
        None => (value, 0),
    };
    let file = file.trim().trim_matches('"').trim();
    if file.is_empty() || file == "%1" {
        return None;
    }
    Some((file.to_string(), index))
}

/// Replaces each `%NAME%` for which `lookup` has a value; unknown names are
/// kept verbatim.
pub fn expand_env_vars(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name).filter(|_| !name.is_empty()) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
