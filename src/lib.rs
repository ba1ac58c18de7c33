//! Icon extraction and notification-area discovery for the dock.
//!
//! [`IconEngine`] turns any icon reference (executable, shortcut, file
//! extension, shell location, packaged app id or system icon id) into a
//! cached, normalised bitmap. Tray icons come from [`IconEngine::get_tray_icons`].

pub mod bitmap;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod platform;
pub mod source;
pub mod template;
pub mod tray;
pub mod types;
pub mod uwp;

pub use cache::IconCache;
pub use config::{ConfigError, EngineConfig, find_config, load_config};
pub use engine::IconEngine;
pub use error::{IconError, IconErrorKind};
pub use loader::NativeIconLoader;
pub use platform::{Hive, IconBackend, RasterIcon, Registry, ShortcutLink};
pub use source::{IconSource, IconSourceKind};
pub use template::{AppIconStore, StoreError, TemplateComposer};
pub use tray::{ScreenRect, TrayIconDiscoverer, TrayStrategy};
pub use types::{ExtractedIcon, IconFormat, IconInfo, IconSize, SystemIcons, TrayIconRecord};
