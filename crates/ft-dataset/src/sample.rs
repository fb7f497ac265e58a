//! Dataset sample types.

use serde::{Deserialize, Serialize};

/// A single labeled image sample ready for training.
///
/// # Image Format
///
/// The image is stored as a flat `Vec<f32>` in CHW (Channel-Height-Width)
/// layout. Values are either in `[0, 1]` or normalized per channel,
/// depending on the transform pipeline that produced the sample.
///
/// # Example
///
/// ```
/// use ft_dataset::ImageSample;
///
/// let sample = ImageSample::new(vec![0.5; 3 * 8 * 8], 8, 8, 1);
/// assert_eq!(sample.label, 1);
/// assert!(sample.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Image data in CHW layout.
    pub image_chw: Vec<f32>,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Class label (index into the folder's sorted class list).
    pub label: usize,
}

impl ImageSample {
    /// Creates a new image sample.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(image_chw: Vec<f32>, width: u32, height: u32, label: usize) -> Self {
        Self {
            image_chw,
            width,
            height,
            label,
        }
    }

    /// Creates an empty sample with just a label.
    ///
    /// Useful for testing or as a placeholder.
    #[must_use]
    pub const fn empty(label: usize) -> Self {
        Self {
            image_chw: Vec::new(),
            width: 0,
            height: 0,
            label,
        }
    }

    /// Returns the expected image data length (C * H * W).
    #[must_use]
    pub const fn expected_len(&self, channels: u32) -> usize {
        (channels as usize) * (self.height as usize) * (self.width as usize)
    }

    /// Returns the number of pixels per channel.
    #[must_use]
    pub const fn num_pixels(&self) -> usize {
        (self.height as usize) * (self.width as usize)
    }

    /// Validates the sample data.
    ///
    /// Returns `true` if the image data length matches the RGB dimensions,
    /// or if the sample is an empty placeholder.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return self.image_chw.is_empty();
        }
        self.image_chw.len() == self.expected_len(3)
    }
}

impl Default for ImageSample {
    fn default() -> Self {
        Self::empty(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_new() {
        let sample = ImageSample::new(vec![0.5; 12], 2, 2, 1);
        assert_eq!(sample.width, 2);
        assert_eq!(sample.height, 2);
        assert_eq!(sample.label, 1);
        assert!(sample.is_valid());
    }

    #[test]
    fn sample_empty() {
        let sample = ImageSample::empty(3);
        assert_eq!(sample.label, 3);
        assert!(sample.image_chw.is_empty());
        assert!(sample.is_valid());
    }

    #[test]
    fn sample_expected_len() {
        let sample = ImageSample {
            width: 64,
            height: 48,
            ..ImageSample::empty(0)
        };

        assert_eq!(sample.expected_len(3), 3 * 64 * 48);
        assert_eq!(sample.expected_len(1), 64 * 48);
        assert_eq!(sample.num_pixels(), 64 * 48);
    }

    #[test]
    fn sample_is_valid() {
        let valid = ImageSample::new(vec![0.5; 3 * 4 * 4], 4, 4, 0);
        assert!(valid.is_valid());

        // Wrong image length
        let bad_len = ImageSample::new(vec![0.5; 10], 4, 4, 0);
        assert!(!bad_len.is_valid());

        // Dimensions set but no data
        let no_data = ImageSample::new(Vec::new(), 4, 4, 0);
        assert!(!no_data.is_valid());
    }

    #[test]
    fn sample_default() {
        let sample = ImageSample::default();
        assert_eq!(sample.label, 0);
        assert!(sample.is_valid());
    }

    #[test]
    fn sample_serialization() {
        let sample = ImageSample::new(vec![0.5; 12], 2, 2, 1);
        let json = serde_json::to_string(&sample);
        assert!(json.is_ok());

        let parsed: std::result::Result<ImageSample, _> =
            serde_json::from_str(&json.unwrap_or_default());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap_or_default(), sample);
    }
}
