use super::job::{ImageJob, JobFile};
use super::settings::{BackgroundMode, OutputFormat, Settings};
use crate::chop::compositor::CropConfig;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub study: Option<String>,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    pub background: BackgroundMode,
    pub matte_color: [u8; 3],
}

impl MergedConfig {
    /// 画像ジョブのOption値がSomeならその値を、Noneならジョブファイル、
    /// 最後にSettingsの値を使用する。
    pub fn new(settings: &Settings, job_file: &JobFile, image: &ImageJob) -> Self {
        MergedConfig {
            study: image.study.clone().or_else(|| job_file.study.clone()),
            output_format: image.output_format.unwrap_or(settings.output_format),
            jpeg_quality: image.jpeg_quality.unwrap_or(settings.jpeg_quality),
            background: image.background.unwrap_or(settings.background),
            matte_color: settings.matte_color,
        }
    }

    pub fn crop_config(&self) -> CropConfig {
        CropConfig {
            output_format: self.output_format,
            jpeg_quality: self.jpeg_quality,
            background: self.background,
            matte_color: self.matte_color,
        }
    }
}
