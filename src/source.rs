use std::fmt;
use std::path::{Path, PathBuf};

/// Marks a shell namespace location such as `::{20D04FE0-3AEA-1069-A2D8-08002B30309D}`.
pub const SPECIAL_LOCATION_PREFIX: &str = "::";

pub const MIN_ICON_SIZE: u32 = 8;
pub const MAX_ICON_SIZE: u32 = 256;

/// Out-of-range sizes snap to the nearest bound instead of failing.
pub fn clamp_size(size: u32) -> u32 {
    size.clamp(MIN_ICON_SIZE, MAX_ICON_SIZE)
}

/// What a caller hands to `extract_icon`: a numeric system icon id or text
/// naming a path, extension or shell location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IconSource {
    Id(u32),
    Text(String),
}

impl IconSource {
    /// Stable identity used in cache keys and [`crate::IconInfo::path`].
    pub fn identity(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IconSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconSource::Id(id) => write!(f, "{id}"),
            IconSource::Text(text) => f.write_str(text),
        }
    }
}

impl From<u32> for IconSource {
    fn from(id: u32) -> Self {
        IconSource::Id(id)
    }
}

impl From<&str> for IconSource {
    fn from(text: &str) -> Self {
        IconSource::Text(text.to_string())
    }
}

impl From<String> for IconSource {
    fn from(text: String) -> Self {
        IconSource::Text(text)
    }
}

impl From<&Path> for IconSource {
    fn from(path: &Path) -> Self {
        IconSource::Text(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for IconSource {
    fn from(path: PathBuf) -> Self {
        IconSource::from(path.as_path())
    }
}

impl From<&PathBuf> for IconSource {
    fn from(path: &PathBuf) -> Self {
        IconSource::from(path.as_path())
    }
}

/// Every way the engine knows to produce an icon. Built once by [`classify`]
/// (or fixed directly by the typed wrappers) and matched exhaustively below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSourceKind {
    SystemId(u32),
    SpecialLocation(String),
    FileIcon { path: PathBuf, index: i32 },
    Shortcut(PathBuf),
    Extension(String),
    UwpApp(String),
    Unrecognized(String),
}

impl IconSourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            IconSourceKind::SystemId(_) => "system",
            IconSourceKind::SpecialLocation(_) => "special-location",
            IconSourceKind::FileIcon { .. } => "file",
            IconSourceKind::Shortcut(_) => "shortcut",
            IconSourceKind::Extension(_) => "extension",
            IconSourceKind::UwpApp(_) => "uwp",
            IconSourceKind::Unrecognized(_) => "unrecognized",
        }
    }
}

const FILE_ICON_SUFFIXES: [&str; 3] = [".exe", ".dll", ".ico"];

/// Classifies `source`; the first matching rule wins:
/// digits, special-location prefix, `.exe/.dll/.ico`, `.lnk`, any other dot,
/// then an existing path. `exists` is only consulted for the last rule.
pub fn classify(source: &IconSource, index: i32, exists: impl Fn(&Path) -> bool) -> IconSourceKind {
    let text = match source {
        IconSource::Id(id) => return IconSourceKind::SystemId(*id),
        IconSource::Text(text) => text.trim(),
    };

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return match text.parse() {
            Ok(id) => IconSourceKind::SystemId(id),
            Err(_) => IconSourceKind::Unrecognized(text.to_string()),
        };
    }
    if text.starts_with(SPECIAL_LOCATION_PREFIX) {
        return IconSourceKind::SpecialLocation(text.to_string());
    }

    let lower = text.to_lowercase();
    if FILE_ICON_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return IconSourceKind::FileIcon {
            path: PathBuf::from(text),
            index,
        };
    }
    if lower.ends_with(".lnk") {
        return IconSourceKind::Shortcut(PathBuf::from(text));
    }
    if text.contains('.') {
        return IconSourceKind::Extension(text.to_string());
    }

    let path = Path::new(text);
    if !text.is_empty() && exists(path) {
        IconSourceKind::FileIcon {
            path: path.to_path_buf(),
            index,
        }
    } else {
        IconSourceKind::Unrecognized(text.to_string())
    }
}

/// Cache key for one `(source, size, index)` request.
pub fn cache_key(identity: &str, size: u32, index: i32) -> String {
    format!("{identity}|{size}|{index}")
}
