use std::{fs, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    /// Taken before going out
    Before,
    /// Taken after coming back
    After,
}

/// A validated photo ready to attach to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub media_type: String,
    /// Base64 payload without the data url prefix
    pub data: String,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Validates raw file bytes by sniffing their format
    pub fn from_bytes(bytes: &[u8], captured_at: DateTime<Utc>) -> Result<Self> {
        let format = image::guess_format(bytes)
            .map_err(|err| Error::InvalidImage(format!("unrecognized image data: {err}")))?;

        Ok(Self {
            media_type: media_type(format),
            data: STANDARD.encode(bytes),
            captured_at,
        })
    }

    /// Accepts `data:image/<kind>;base64,<payload>` urls whose payload decodes to an image
    pub fn from_data_url(url: &str, captured_at: DateTime<Utc>) -> Result<Self> {
        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| Error::InvalidImage("not a data url".to_string()))?;

        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidImage("data url is not base64 encoded".to_string()))?;
        if !media_type.starts_with("image/") {
            return Err(Error::InvalidImage(format!(
                "media type {media_type} is not an image"
            )));
        }

        let bytes = STANDARD
            .decode(payload)
            .map_err(|err| Error::InvalidImage(format!("bad base64 payload: {err}")))?;
        image::guess_format(&bytes)
            .map_err(|err| Error::InvalidImage(format!("unrecognized image data: {err}")))?;

        Ok(Self {
            media_type: media_type.to_string(),
            data: payload.to_string(),
            captured_at,
        })
    }

    pub fn from_path(path: &Path, captured_at: DateTime<Utc>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, captured_at)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

fn media_type(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "image/png".to_string(),
        ImageFormat::Jpeg => "image/jpeg".to_string(),
        ImageFormat::Gif => "image/gif".to_string(),
        ImageFormat::WebP => "image/webp".to_string(),
        ImageFormat::Bmp => "image/bmp".to_string(),
        ImageFormat::Tiff => "image/tiff".to_string(),
        other => format!(
            "image/{}",
            other.extensions_str().first().copied().unwrap_or("octet-stream")
        ),
    }
}

/// The before/after photo slots. At most one image per slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSelection {
    before: Option<CapturedImage>,
    after: Option<CapturedImage>,
}

impl ImageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: ImageSlot, image: CapturedImage) {
        match slot {
            ImageSlot::Before => self.before = Some(image),
            ImageSlot::After => self.after = Some(image),
        }
    }

    /// Validates `bytes` and stores them in `slot`. A rejected file leaves the slot untouched.
    pub fn select(&mut self, slot: ImageSlot, bytes: &[u8], captured_at: DateTime<Utc>) -> Result<()> {
        let image = CapturedImage::from_bytes(bytes, captured_at)?;
        self.set(slot, image);
        Ok(())
    }

    pub fn remove(&mut self, slot: ImageSlot) -> Option<CapturedImage> {
        match slot {
            ImageSlot::Before => self.before.take(),
            ImageSlot::After => self.after.take(),
        }
    }

    pub fn get(&self, slot: ImageSlot) -> Option<&CapturedImage> {
        match slot {
            ImageSlot::Before => self.before.as_ref(),
            ImageSlot::After => self.after.as_ref(),
        }
    }

    pub fn count(&self) -> usize {
        self.before.iter().count() + self.after.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Both slots filled
    pub fn comparison(&self) -> Option<(&CapturedImage, &CapturedImage)> {
        self.before.as_ref().zip(self.after.as_ref())
    }

    /// The only image when exactly one slot is filled
    pub fn single(&self) -> Option<&CapturedImage> {
        match (&self.before, &self.after) {
            (Some(image), None) | (None, Some(image)) => Some(image),
            _ => None,
        }
    }

    /// Minutes between the before and after captures
    pub fn time_difference_minutes(&self) -> Option<i64> {
        self.comparison()
            .map(|(before, after)| (after.captured_at - before.captured_at).num_minutes())
    }
}
