use crate::bitmap;
use crate::error::{IconError, IconErrorKind};
use crate::platform::RasterIcon;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Common icon edge lengths.
pub struct IconSize;

impl IconSize {
    pub const SMALL: u32 = 16;
    pub const MEDIUM: u32 = 32;
    pub const LARGE: u32 = 48;
    pub const THUMBNAIL: u32 = 96;
    pub const EXTRALARGE: u32 = 128;
    pub const JUMBO: u32 = 256;
}

/// Well-known ids for [`crate::IconSourceKind::SystemId`]. Ids below 100
/// resolve through the shared shell resource library.
pub struct SystemIcons;

impl SystemIcons {
    pub const UNKNOWN_FILE: u32 = 0;
    pub const DOCUMENT: u32 = 1;
    pub const FOLDER: u32 = 3;
    pub const FOLDER_OPEN: u32 = 4;
    pub const DRIVE_525: u32 = 6;
    pub const DRIVE_35: u32 = 7;
    pub const DRIVE_FIXED: u32 = 8;
    pub const DRIVE_NETWORK: u32 = 9;
    pub const DRIVE_NETWORK_DISABLED: u32 = 10;
    pub const DRIVE_CD: u32 = 11;
    pub const DRIVE_RAM: u32 = 12;
    pub const WORLD: u32 = 13;
    pub const COMPUTER: u32 = 15;
    pub const SERVER: u32 = 16;
    pub const PRINTER: u32 = 17;
    pub const MY_NETWORK: u32 = 18;
    pub const CONTROL_PANEL: u32 = 21;
    pub const FIND: u32 = 22;
    pub const HELP: u32 = 23;
    pub const SHORTCUT: u32 = 29;
    pub const RECYCLE_BIN: u32 = 31;
    pub const RECYCLE_BIN_FULL: u32 = 32;
    pub const APPLICATION: u32 = 100;
    pub const WARNING: u32 = 101;
    pub const QUESTION: u32 = 102;
    pub const ERROR: u32 = 103;
    pub const INFO: u32 = 104;
    pub const SHIELD: u32 = 106;
    pub const USERS: u32 = 109;
    pub const UI_GADGET: u32 = 123;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconFormat {
    #[default]
    Png,
    Ico,
    Bmp,
    Jpeg,
}

impl IconFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Some(IconFormat::Png),
            "ico" => Some(IconFormat::Ico),
            "bmp" => Some(IconFormat::Bmp),
            "jpg" | "jpeg" => Some(IconFormat::Jpeg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            IconFormat::Png => "png",
            IconFormat::Ico => "ico",
            IconFormat::Bmp => "bmp",
            IconFormat::Jpeg => "jpg",
        }
    }
}

/// Describes one extraction. `width`/`height` are the requested edge, the
/// tray fields are only set for notification-area icons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconInfo {
    pub path: String,
    pub index: i32,
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
    pub format: String,
    pub size_bytes: usize,
    pub process_id: Option<u32>,
    pub window_title: Option<String>,
    pub tooltip: Option<String>,
}

impl IconInfo {
    pub fn new(path: impl Into<String>, index: i32, size: u32) -> Self {
        Self {
            path: path.into(),
            index,
            width: size,
            height: size,
            bits_per_pixel: 32,
            format: "Unknown".to_string(),
            size_bytes: 0,
            process_id: None,
            window_title: None,
            tooltip: None,
        }
    }
}

/// Result of an extraction.
///
/// A successful icon always carries a non-empty image and a PNG encoding of
/// that same image; a failed one carries neither, plus the error that ended
/// the fallback chain.
#[derive(Debug, Clone)]
pub struct ExtractedIcon {
    image: Option<RgbaImage>,
    raw_encoded: Vec<u8>,
    info: IconInfo,
    error: Option<IconError>,
}

impl ExtractedIcon {
    pub fn from_image(image: RgbaImage, mut info: IconInfo) -> Self {
        if image.width() == 0 || image.height() == 0 {
            return Self::failed(info, IconError::ConversionFailure("empty image".into()));
        }
        match bitmap::encode(&image, IconFormat::Png, 95) {
            Ok(raw) => {
                info.size_bytes = raw.len();
                Self {
                    image: Some(image),
                    raw_encoded: raw,
                    info,
                    error: None,
                }
            }
            Err(err) => Self::failed(info, err),
        }
    }

    pub(crate) fn from_raster(raster: RasterIcon, mut info: IconInfo) -> Self {
        info.bits_per_pixel = raster.bits_per_pixel;
        info.format = raster.format.to_string();
        Self::from_image(raster.image, info)
    }

    pub fn failed(info: IconInfo, error: IconError) -> Self {
        Self {
            image: None,
            raw_encoded: Vec::new(),
            info,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// PNG bytes of [`Self::image`], empty on failure.
    pub fn raw_encoded(&self) -> &[u8] {
        &self.raw_encoded
    }

    pub fn info(&self) -> &IconInfo {
        &self.info
    }

    pub fn error(&self) -> Option<&IconError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<IconErrorKind> {
        self.error.as_ref().map(IconError::kind)
    }

    pub fn encode(&self, format: IconFormat, quality: u8) -> Result<Vec<u8>, IconError> {
        match (&self.image, format) {
            (Some(_), IconFormat::Png) => Ok(self.raw_encoded.clone()),
            (Some(image), _) => bitmap::encode(image, format, quality),
            (None, _) => Err(self
                .error
                .clone()
                .unwrap_or_else(|| IconError::ConversionFailure("no image".into()))),
        }
    }

    pub fn to_data_url(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|_| format!("data:image/png;base64,{}", BASE64.encode(&self.raw_encoded)))
    }
}

/// One notification-area icon together with the window that owns it.
#[derive(Debug, Clone)]
pub struct TrayIconRecord {
    pub icon: ExtractedIcon,
    pub process_id: u32,
    pub window_title: String,
    pub tooltip: String,
}

impl TrayIconRecord {
    pub fn new(
        image: RgbaImage,
        source: impl Into<String>,
        index: i32,
        size: u32,
        process_id: u32,
        window_title: String,
        tooltip: String,
    ) -> Self {
        let mut info = IconInfo::new(source, index, size);
        info.format = "ICO".to_string();
        info.process_id = Some(process_id);
        info.window_title = Some(window_title.clone());
        info.tooltip = Some(tooltip.clone());
        Self {
            icon: ExtractedIcon::from_image(image, info),
            process_id,
            window_title,
            tooltip,
        }
    }

    pub fn dedup_key(&self) -> (u32, &str, &str) {
        (self.process_id, &self.window_title, &self.tooltip)
    }
}
