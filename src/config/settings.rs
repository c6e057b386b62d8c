use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::chop::compositor::CropConfig;

/// 出力画像フォーマット。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// 標準化された小文字の拡張子（ドットなし）。
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// 切り抜き範囲内の背景ピクセルの扱い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    /// 切り抜きのみ。背景はそのまま残す。
    Keep,
    /// 背景ピクセルを `matte_color` で塗りつぶす。
    Matte,
    /// 背景ピクセルを透明にする（PNGのみ）。
    Transparent,
}

/// 境界検出の方式。現在は色閾値ヒューリスティックのみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Heuristic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    pub background: BackgroundMode,
    pub matte_color: [u8; 3],
    pub detector: DetectorKind,
    pub parallel_workers: usize,
    pub storage_dir: PathBuf,
    pub public_base_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fetch_timeout_secs: 10,
            connect_timeout_secs: 5,
            output_format: OutputFormat::Jpeg,
            jpeg_quality: 90,
            background: BackgroundMode::Keep,
            matte_color: [255, 255, 255],
            detector: DetectorKind::Heuristic,
            parallel_workers: 0,
            storage_dir: PathBuf::from(".storage"),
            public_base_url: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::ChopError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 値の範囲を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(crate::error::ChopError::config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(crate::error::ChopError::config(
                "fetch_timeout_secs must be greater than 0",
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(crate::error::ChopError::config(
                "connect_timeout_secs must be greater than 0",
            ));
        }
        // 透過背景はPNG出力のみ
        self.crop_config().validate()
    }

    /// 設定値から既定の切り抜き設定を作る。
    pub fn crop_config(&self) -> CropConfig {
        CropConfig {
            output_format: self.output_format,
            jpeg_quality: self.jpeg_quality,
            background: self.background,
            matte_color: self.matte_color,
        }
    }
}
