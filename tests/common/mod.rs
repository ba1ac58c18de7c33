#![allow(dead_code)]

use dock_icons::{
    EngineConfig, Hive, IconBackend, IconEngine, IconError, NativeIconLoader, RasterIcon,
    Registry, ShortcutLink, TrayIconDiscoverer, TrayStrategy,
};
use image::{Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const FILE_COLOR: Rgba<u8> = Rgba([200, 30, 40, 255]);
pub const STOCK_COLOR: Rgba<u8> = Rgba([20, 120, 220, 255]);
pub const ITEM_COLOR: Rgba<u8> = Rgba([30, 160, 60, 255]);

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn solid(size: u32, color: Rgba<u8>) -> RasterIcon {
    RasterIcon::new(RgbaImage::from_pixel(size, size, color), 32, "ICO")
}

/// Scriptable shell: only what was registered exists, and every native
/// call is recorded.
#[derive(Default)]
pub struct FakeBackend {
    pub files: HashSet<(String, i32)>,
    pub stock: HashSet<u32>,
    pub shell_resources: HashSet<u32>,
    pub existing: HashSet<String>,
    pub dirs: HashSet<String>,
    pub shortcuts: HashMap<String, ShortcutLink>,
    pub env: HashMap<String, String>,
    pub file_calls: Mutex<Vec<(String, i32)>>,
    pub stock_calls: Mutex<Vec<u32>>,
    pub item_calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_file(mut self, path: &str, index: i32) -> Self {
        self.files.insert((path.to_string(), index));
        self.existing.insert(path.to_string());
        self
    }

    pub fn with_existing(mut self, path: &str) -> Self {
        self.existing.insert(path.to_string());
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.dirs.insert(path.to_string());
        self.existing.insert(path.to_string());
        self
    }

    pub fn with_stock(mut self, id: u32) -> Self {
        self.stock.insert(id);
        self
    }

    pub fn with_shell_resource(mut self, id: u32) -> Self {
        self.shell_resources.insert(id);
        self
    }

    pub fn with_shortcut(mut self, link: &str, resolved: ShortcutLink) -> Self {
        self.existing.insert(link.to_string());
        self.shortcuts.insert(link.to_string(), resolved);
        self
    }

    pub fn file_calls(&self) -> Vec<(String, i32)> {
        self.file_calls.lock().unwrap().clone()
    }

    pub fn file_calls_for(&self, path: &str) -> usize {
        self.file_calls().iter().filter(|(p, _)| p == path).count()
    }

    pub fn stock_calls(&self) -> Vec<u32> {
        self.stock_calls.lock().unwrap().clone()
    }

    pub fn item_calls(&self) -> Vec<String> {
        self.item_calls.lock().unwrap().clone()
    }
}

impl IconBackend for FakeBackend {
    fn file_icon(&self, path: &Path, index: i32, size: u32) -> Result<RasterIcon, IconError> {
        let entry = (key(path), index);
        self.file_calls.lock().unwrap().push(entry.clone());
        if self.files.contains(&entry) {
            Ok(solid(size, FILE_COLOR))
        } else {
            Err(IconError::SourceNotFound(format!("{} #{index}", entry.0)))
        }
    }

    fn stock_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError> {
        self.stock_calls.lock().unwrap().push(id);
        if self.stock.contains(&id) {
            Ok(solid(size, STOCK_COLOR))
        } else {
            Err(IconError::SourceNotFound(format!("stock {id}")))
        }
    }

    fn shell_resource_icon(&self, id: u32, size: u32) -> Result<RasterIcon, IconError> {
        if self.shell_resources.contains(&id) {
            Ok(solid(size, STOCK_COLOR))
        } else {
            Err(IconError::SourceNotFound(format!("shell resource {id}")))
        }
    }

    fn location_icon(&self, location: &str, size: u32) -> Result<RasterIcon, IconError> {
        if location.starts_with("::{") {
            Ok(solid(size, ITEM_COLOR))
        } else {
            Err(IconError::NativeApiFailure(location.to_string()))
        }
    }

    fn item_icon(&self, path: &Path, size: u32) -> Result<RasterIcon, IconError> {
        self.item_calls.lock().unwrap().push(key(path));
        if self.existing.contains(&key(path)) {
            Ok(solid(size, ITEM_COLOR))
        } else {
            Err(IconError::NativeApiFailure(key(path)))
        }
    }

    fn resolve_shortcut(&self, path: &Path) -> Result<ShortcutLink, IconError> {
        self.shortcuts
            .get(&key(path))
            .cloned()
            .ok_or_else(|| IconError::NativeApiFailure(format!("not a link: {}", key(path))))
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.existing.contains(&key(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(&key(path))
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }
}

/// Registry backed by `(hive, key, value name) -> data`.
#[derive(Default)]
pub struct MapRegistry {
    values: HashMap<(Hive, String, String), String>,
}

impl MapRegistry {
    pub fn with_default(mut self, key: &str, data: &str) -> Self {
        self.values
            .insert((Hive::ClassesRoot, key.to_lowercase(), String::new()), data.to_string());
        self
    }
}

impl Registry for MapRegistry {
    fn value(&self, hive: Hive, key: &str, name: &str) -> Option<String> {
        self.values
            .get(&(hive, key.to_lowercase(), name.to_string()))
            .cloned()
    }

    fn subkeys(&self, _: Hive, _: &str) -> Vec<String> {
        Vec::new()
    }

    fn values(&self, _: Hive, _: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}

pub fn engine_with(
    config: EngineConfig,
    backend: Arc<FakeBackend>,
    registry: MapRegistry,
    strategies: Vec<Box<dyn TrayStrategy>>,
) -> IconEngine {
    let loader = NativeIconLoader::new(backend, Arc::new(registry));
    IconEngine::with_parts(config, loader, TrayIconDiscoverer::new(strategies))
}

pub fn engine(backend: Arc<FakeBackend>) -> IconEngine {
    engine_with(EngineConfig::default(), backend, MapRegistry::default(), Vec::new())
}
