// Phase 6: per-image records exchanged with the persistence layer

use serde::{Deserialize, Serialize};

use crate::chop::BoundingBox;
use crate::error::ChopError;

/// Crop coordinates previously stored for an image, as read back from the
/// persistence layer.
///
/// Values are untrusted until [`StoredCrop::validate`] checks them against
/// the decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredCrop {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    #[serde(default = "default_stored_confidence")]
    pub confidence: f64,
}

fn default_stored_confidence() -> f64 {
    1.0
}

impl StoredCrop {
    /// Check the coordinates against a `width x height` image and convert
    /// them to a [`BoundingBox`].
    pub fn validate(&self, width: u32, height: u32) -> crate::error::Result<BoundingBox> {
        let in_range = |v: i64, limit: u32| (0..=limit as i64).contains(&v);
        if !(in_range(self.x1, width)
            && in_range(self.x2, width)
            && in_range(self.y1, height)
            && in_range(self.y2, height))
        {
            return Err(ChopError::crop(format!(
                "stored crop [{}, {}]x[{}, {}] lies outside {}x{} image",
                self.x1, self.x2, self.y1, self.y2, width, height
            )));
        }
        if self.x1 >= self.x2 || self.y1 >= self.y2 {
            return Err(ChopError::crop(format!(
                "stored crop [{}, {}]x[{}, {}] is empty",
                self.x1, self.x2, self.y1, self.y2
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence == 0.0 {
            return Err(ChopError::crop(format!(
                "stored crop confidence must be in (0, 1], got {}",
                self.confidence
            )));
        }

        Ok(BoundingBox {
            x1: self.x1 as u32,
            y1: self.y1 as u32,
            x2: self.x2 as u32,
            y2: self.y2 as u32,
            confidence: self.confidence,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Processed,
    NoChopDetected,
    Failed,
}

/// Outcome of one image, in the shape the persistence layer stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub image_url: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageRecord {
    fn empty(image_url: &str, status: RecordStatus) -> Self {
        ImageRecord {
            image_url: image_url.to_string(),
            status,
            width: None,
            height: None,
            x1: None,
            y1: None,
            x2: None,
            y2: None,
            confidence: None,
            area_ratio: None,
            processed_url: None,
            object_key: None,
            sha256: None,
            error: None,
        }
    }

    /// Record for an image whose crop was stored at `processed_url`.
    pub fn processed(
        image_url: &str,
        bbox: &BoundingBox,
        source_size: (u32, u32),
        area_ratio: Option<f64>,
        stored: StoredObject,
    ) -> Self {
        ImageRecord {
            width: Some(source_size.0),
            height: Some(source_size.1),
            x1: Some(bbox.x1),
            y1: Some(bbox.y1),
            x2: Some(bbox.x2),
            y2: Some(bbox.y2),
            confidence: Some(bbox.confidence),
            area_ratio,
            processed_url: Some(stored.url),
            object_key: Some(stored.key),
            sha256: Some(stored.sha256),
            ..Self::empty(image_url, RecordStatus::Processed)
        }
    }

    /// Record for an image that ran cleanly but contained no chop.
    pub fn no_chop_detected(image_url: &str, source_size: (u32, u32), area_ratio: f64) -> Self {
        ImageRecord {
            width: Some(source_size.0),
            height: Some(source_size.1),
            confidence: Some(0.0),
            area_ratio: Some(area_ratio),
            error: Some("no chop detected".to_string()),
            ..Self::empty(image_url, RecordStatus::NoChopDetected)
        }
    }

    /// Record for an image whose processing failed with `reason`.
    pub fn failed(image_url: &str, reason: impl Into<String>) -> Self {
        ImageRecord {
            error: Some(reason.into()),
            ..Self::empty(image_url, RecordStatus::Failed)
        }
    }
}

/// Where processed bytes ended up in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
}
