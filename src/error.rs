use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Crop error: {0}")]
    CropError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`ChopError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl ChopError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a fetch error (unreachable or undecodable source image).
    fetch => FetchError,
    /// Create a crop error.
    crop => CropError,
    /// Create an encode error.
    encode => EncodeError,
    /// Create a storage error.
    storage => StorageError,
}

impl From<serde_json::Error> for ChopError {
    fn from(e: serde_json::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

impl From<image::ImageError> for ChopError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChopError>;
