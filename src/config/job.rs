use serde::Deserialize;

use super::settings::{BackgroundMode, OutputFormat};
use crate::record::StoredCrop;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    /// ジョブ内の全画像に適用される既定のstudy識別子。
    pub study: Option<String>,
    pub images: Vec<ImageJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageJob {
    #[serde(deserialize_with = "deserialize_url")]
    pub url: String,
    pub filename: Option<String>,
    pub study: Option<String>,
    /// 保存済みの切り抜き座標。指定時は検出をスキップする。
    pub crop: Option<StoredCrop>,
    pub output_format: Option<OutputFormat>,
    pub jpeg_quality: Option<u8>,
    pub background: Option<BackgroundMode>,
}

impl ImageJob {
    /// URLのみを持つジョブを作成する（上書き設定なし）。
    pub fn from_url(url: impl Into<String>) -> Self {
        ImageJob {
            url: url.into(),
            filename: None,
            study: None,
            crop: None,
            output_format: None,
            jpeg_quality: None,
            background: None,
        }
    }
}

impl JobFile {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::ChopError::config(format!("Failed to parse job YAML: {e}"))
        })
    }

    /// URLのリストからジョブを組み立てる。各URLは [`parse_image_url`] で検証する。
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> crate::error::Result<Self> {
        let images = urls
            .iter()
            .map(|u| parse_image_url(u.as_ref()).map(ImageJob::from_url))
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(JobFile {
            study: None,
            images,
        })
    }
}

/// 画像URL文字列を検証し、前後の空白を除いた値を返す。
///
/// 受け付けるのは `http` / `https` スキームかつホストを持つ絶対URLのみ。
pub fn parse_image_url(s: &str) -> crate::error::Result<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ChopError::config("Image URL cannot be empty"));
    }

    let url = reqwest::Url::parse(trimmed).map_err(|e| {
        crate::error::ChopError::config(format!("Invalid image URL '{trimmed}': {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(crate::error::ChopError::config(format!(
            "Unsupported URL scheme '{}' in '{trimmed}' (expected http or https)",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(crate::error::ChopError::config(format!(
            "Image URL has no host: '{trimmed}'"
        )));
    }

    Ok(trimmed.to_string())
}

/// serdeのdeserialize_withで使用するURLデシリアライザ
fn deserialize_url<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_image_url(&s).map_err(serde::de::Error::custom)
}
