use serde::{Deserialize, Serialize};

/// Classification of an [`IconError`], without the detail text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconErrorKind {
    MissingDependency,
    SourceNotFound,
    UnrecognizedSource,
    NativeApiFailure,
    ConversionFailure,
    UwpResolutionFailure,
}

/// Every failure the engine reports. Fallback chains absorb these internally
/// and only the last one of a chain reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IconError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),
    #[error("icon source not found: {0}")]
    SourceNotFound(String),
    #[error("unrecognized icon source: {0}")]
    UnrecognizedSource(String),
    #[error("native call failed: {0}")]
    NativeApiFailure(String),
    #[error("icon conversion failed: {0}")]
    ConversionFailure(String),
    #[error("packaged app icon not resolved: {0}")]
    UwpResolutionFailure(String),
}

impl IconError {
    pub fn kind(&self) -> IconErrorKind {
        match self {
            IconError::MissingDependency(_) => IconErrorKind::MissingDependency,
            IconError::SourceNotFound(_) => IconErrorKind::SourceNotFound,
            IconError::UnrecognizedSource(_) => IconErrorKind::UnrecognizedSource,
            IconError::NativeApiFailure(_) => IconErrorKind::NativeApiFailure,
            IconError::ConversionFailure(_) => IconErrorKind::ConversionFailure,
            IconError::UwpResolutionFailure(_) => IconErrorKind::UwpResolutionFailure,
        }
    }
}

impl From<image::ImageError> for IconError {
    fn from(err: image::ImageError) -> Self {
        IconError::ConversionFailure(err.to_string())
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for IconError {
    fn from(err: windows::core::Error) -> Self {
        IconError::NativeApiFailure(err.to_string())
    }
}
