use crate::bitmap;
use crate::engine::IconEngine;
use crate::error::IconError;
use crate::types::IconFormat;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Edge the source icon is scaled to before it is pasted.
pub const TEMPLATE_INNER_SIZE: u32 = 128;

/// Pastes icons onto a shared background so every dock tile looks alike.
#[derive(Debug, Clone)]
pub struct TemplateComposer {
    template_path: PathBuf,
    inner_size: u32,
}

impl TemplateComposer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            inner_size: TEMPLATE_INNER_SIZE,
        }
    }

    pub fn with_inner_size(mut self, inner_size: u32) -> Self {
        self.inner_size = inner_size.max(1);
        self
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn compose(&self, source: &RgbaImage) -> Result<Vec<u8>, IconError> {
        self.compose_as(source, IconFormat::Png)
    }

    pub fn compose_as(&self, source: &RgbaImage, format: IconFormat) -> Result<Vec<u8>, IconError> {
        let composed = self.compose_image(source)?;
        bitmap::encode(&composed, format, 95)
    }

    /// The template at its own size with `source` centered on it.
    pub fn compose_image(&self, source: &RgbaImage) -> Result<RgbaImage, IconError> {
        if !self.template_path.is_file() {
            return Err(IconError::ConversionFailure(format!(
                "template not found: {}",
                self.template_path.display()
            )));
        }
        let template = image::open(&self.template_path)?.to_rgba8();
        Ok(compose_onto(template, source, self.inner_size))
    }
}

/// Resizes `source` to `inner × inner` and alpha-blends it over the middle
/// of `template`. An inner image larger than the template overhangs evenly
/// and is clipped.
pub fn compose_onto(mut template: RgbaImage, source: &RgbaImage, inner: u32) -> RgbaImage {
    let scaled = imageops::resize(source, inner, inner, FilterType::Lanczos3);
    let left = (i64::from(template.width()) - i64::from(inner)).div_euclid(2);
    let top = (i64::from(template.height()) - i64::from(inner)).div_euclid(2);
    imageops::overlay(&mut template, &scaled, left, top);
    template
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("icon store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Icon(#[from] IconError),
}

/// Composed application icons on disk, one PNG per executable.
///
/// File names are `<stem>_<md5(abs path)[..8]>.png`, so two `setup.exe`
/// in different folders get different files. An existing file is returned
/// as-is without touching the executable.
#[derive(Debug, Clone)]
pub struct AppIconStore {
    dir: PathBuf,
    composer: TemplateComposer,
    icon_size: u32,
}

impl AppIconStore {
    pub fn new(dir: impl Into<PathBuf>, composer: TemplateComposer, icon_size: u32) -> Self {
        Self {
            dir: dir.into(),
            composer,
            icon_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, exe_path: &Path) -> PathBuf {
        self.dir.join(cache_file_name(exe_path))
    }

    pub fn icon_for(&self, engine: &IconEngine, exe_path: &Path) -> Result<PathBuf, StoreError> {
        let target = self.path_for(exe_path);
        if target.is_file() {
            tracing::trace!(path = %target.display(), "app icon already stored");
            return Ok(target);
        }
        fs::create_dir_all(&self.dir)?;

        let icon = engine.extract_file_icon(exe_path, self.icon_size, 0);
        let Some(image) = icon.image() else {
            return Err(icon
                .error()
                .cloned()
                .unwrap_or_else(|| IconError::SourceNotFound(exe_path.display().to_string()))
                .into());
        };

        let bytes = match self.composer.compose(image) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(exe = %exe_path.display(), %err, "template composition failed, storing bare icon");
                icon.raw_encoded().to_vec()
            }
        };
        fs::write(&target, bytes)?;
        Ok(target)
    }
}

/// `<stem>_<first 8 hex of md5(absolute path)>.png`.
pub fn cache_file_name(exe_path: &Path) -> String {
    let absolute = std::path::absolute(exe_path).unwrap_or_else(|_| exe_path.to_path_buf());
    let digest = format!("{:x}", md5::compute(absolute.to_string_lossy().as_bytes()));
    let stem = exe_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    format!("{stem}_{}.png", &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const SOURCE: Rgba<u8> = Rgba([200, 30, 40, 255]);

    fn write_template(dir: &Path, w: u32, h: u32) -> PathBuf {
        let path = dir.join("app_model.png");
        RgbaImage::from_pixel(w, h, Rgba([240, 240, 240, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn solid_source_lands_in_the_center() {
        let dir = tempfile::tempdir().unwrap();
        let composer = TemplateComposer::new(write_template(dir.path(), 200, 180));

        let bytes = composer.compose(&RgbaImage::from_pixel(64, 64, SOURCE)).unwrap();
        let out = image::load_from_memory(&bytes).unwrap().to_rgba8();

        assert_eq!(out.dimensions(), (200, 180));
        assert_eq!(*out.get_pixel(100, 90), SOURCE);
        assert_eq!(*out.get_pixel(2, 2), Rgba([240, 240, 240, 255]));
    }

    #[test]
    fn same_input_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let composer = TemplateComposer::new(write_template(dir.path(), 160, 160));
        let source = RgbaImage::from_pixel(64, 64, SOURCE);
        assert_eq!(composer.compose(&source).unwrap(), composer.compose(&source).unwrap());
    }

    #[test]
    fn missing_template_is_a_conversion_failure() {
        let composer = TemplateComposer::new("/definitely/not/here/app_model.png");
        let err = composer.compose(&RgbaImage::new(64, 64)).unwrap_err();
        assert_eq!(err.kind(), crate::error::IconErrorKind::ConversionFailure);
    }

    #[test]
    fn oversized_inner_image_is_clipped_evenly() {
        let template = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let out = compose_onto(template, &RgbaImage::from_pixel(8, 8, SOURCE), 128);
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(*out.get_pixel(0, 0), SOURCE);
    }

    #[test]
    fn cache_names_differ_by_directory() {
        let a = cache_file_name(Path::new("one/setup.exe"));
        let b = cache_file_name(Path::new("two/setup.exe"));
        assert!(a.starts_with("setup_") && a.ends_with(".png"));
        assert_eq!(a.len(), "setup_".len() + 8 + ".png".len());
        assert_ne!(a, b);
        assert_eq!(a, cache_file_name(Path::new("one/setup.exe")));
    }
}
