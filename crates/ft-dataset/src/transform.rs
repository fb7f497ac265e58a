//! Image transform pipelines.
//!
//! Transforms operate in two phases. Geometric steps (resize, crop, flip)
//! run on a [`image::DynamicImage`]. The image is then converted to a flat
//! CHW float buffer scaled to `[0, 1]`, and any [`Transform::Normalize`]
//! step runs on those floats.
//!
//! The presets mirror standard fine-tuning practice: random resized crop
//! plus horizontal flip for training, shorter-side resize plus center crop
//! for evaluation, both followed by per-channel normalization with the
//! ImageNet statistics.

use image::{imageops, DynamicImage, GenericImageView};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-channel mean used for ImageNet-style normalization.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation used for ImageNet-style normalization.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A single image transform step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    /// Resizes the shorter image side to `size`, preserving aspect ratio.
    Resize {
        /// Target shorter-side length in pixels.
        size: u32,
    },

    /// Crops a `size` by `size` square from the image center.
    CenterCrop {
        /// Crop side length in pixels.
        size: u32,
    },

    /// Crops a random region and resizes it to `size` by `size`.
    ///
    /// The region area is sampled uniformly from `scale` (as a fraction of
    /// the image area) and its aspect ratio log-uniformly from `ratio`.
    /// After ten failed attempts the crop falls back to a center crop.
    RandomResizedCrop {
        /// Output side length in pixels.
        size: u32,
        /// Area fraction range, e.g. `(0.08, 1.0)`.
        scale: (f32, f32),
        /// Aspect ratio range, e.g. `(0.75, 1.333)`.
        ratio: (f32, f32),
    },

    /// Flips the image horizontally with probability `p`.
    RandomHorizontalFlip {
        /// Flip probability in `[0, 1]`.
        p: f32,
    },

    /// Normalizes each channel: `(x - mean) / std`.
    Normalize {
        /// Per-channel mean.
        mean: [f32; 3],
        /// Per-channel standard deviation.
        std: [f32; 3],
    },
}

impl Transform {
    /// Returns `true` if the step involves no randomness.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        !matches!(
            self,
            Self::RandomResizedCrop { .. } | Self::RandomHorizontalFlip { .. }
        )
    }
}

/// An ordered sequence of transform steps.
///
/// # Example
///
/// ```
/// use ft_dataset::TransformPipeline;
///
/// let train = TransformPipeline::train_preset(224);
/// let eval = TransformPipeline::eval_preset(224);
///
/// assert!(!train.is_deterministic());
/// assert!(eval.is_deterministic());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPipeline {
    /// Transform steps applied in order.
    pub steps: Vec<Transform>,
}

impl TransformPipeline {
    /// Creates a pipeline from explicit steps.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(steps: Vec<Transform>) -> Self {
        Self { steps }
    }

    /// Standard training augmentation for `size` by `size` output.
    ///
    /// Random resized crop, horizontal flip with probability 0.5, then
    /// ImageNet normalization.
    #[must_use]
    pub fn train_preset(size: u32) -> Self {
        Self::new(vec![
            Transform::RandomResizedCrop {
                size,
                scale: (0.08, 1.0),
                ratio: (0.75, 4.0 / 3.0),
            },
            Transform::RandomHorizontalFlip { p: 0.5 },
            Transform::Normalize {
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
            },
        ])
    }

    /// Standard evaluation pipeline for `size` by `size` output.
    ///
    /// Resizes the shorter side to `size * 256 / 224`, center-crops to
    /// `size`, then applies ImageNet normalization. For the common
    /// `size = 224` this is the resize-256 crop-224 convention.
    #[must_use]
    pub fn eval_preset(size: u32) -> Self {
        Self::new(vec![
            Transform::Resize {
                size: size * 256 / 224,
            },
            Transform::CenterCrop { size },
            Transform::Normalize {
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
            },
        ])
    }

    /// Returns `true` if every step is deterministic.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.steps.iter().all(Transform::is_deterministic)
    }

    /// Applies the pipeline to an image.
    ///
    /// Returns the transformed image as a flat CHW `f32` buffer together
    /// with its final width and height. Pixel values are scaled to
    /// `[0, 1]` before any normalization step runs.
    #[must_use]
    pub fn apply<R: Rng>(&self, image: &DynamicImage, rng: &mut R) -> (Vec<f32>, u32, u32) {
        let mut img = image.clone();
        let mut normalize = None;

        for step in &self.steps {
            match step {
                Transform::Resize { size } => {
                    img = resize_shorter_side(&img, *size);
                }
                Transform::CenterCrop { size } => {
                    img = center_crop(&img, *size);
                }
                Transform::RandomResizedCrop { size, scale, ratio } => {
                    img = random_resized_crop(&img, *size, *scale, *ratio, rng);
                }
                Transform::RandomHorizontalFlip { p } => {
                    if rng.gen::<f32>() < *p {
                        img = img.fliph();
                    }
                }
                Transform::Normalize { mean, std } => {
                    normalize = Some((*mean, *std));
                }
            }
        }

        let (width, height) = img.dimensions();
        let mut data = to_chw(&img);

        if let Some((mean, std)) = normalize {
            let pixels = (width as usize) * (height as usize);
            for (c, channel) in data.chunks_mut(pixels).enumerate() {
                let (m, s) = (mean[c], std[c]);
                for v in channel.iter_mut() {
                    *v = (*v - m) / s;
                }
            }
        }

        (data, width, height)
    }
}

/// Resizes so the shorter side equals `size`, preserving aspect ratio.
fn resize_shorter_side(img: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let (new_w, new_h) = if w < h {
        (size, (u64::from(h) * u64::from(size) / u64::from(w)).max(1) as u32)
    } else {
        ((u64::from(w) * u64::from(size) / u64::from(h)).max(1) as u32, size)
    };
    img.resize_exact(new_w, new_h, imageops::FilterType::Triangle)
}

/// Crops a `size` by `size` square from the center, clamped to the image.
fn center_crop(img: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let cw = size.min(w);
    let ch = size.min(h);
    let x = (w - cw) / 2;
    let y = (h - ch) / 2;
    img.crop_imm(x, y, cw, ch)
}

/// Samples a random crop region and resizes it to `size` by `size`.
fn random_resized_crop<R: Rng>(
    img: &DynamicImage,
    size: u32,
    scale: (f32, f32),
    ratio: (f32, f32),
    rng: &mut R,
) -> DynamicImage {
    let (w, h) = img.dimensions();
    #[allow(clippy::cast_precision_loss)]
    let area = (w as f32) * (h as f32);

    for _ in 0..10 {
        let target_area = area * rng.gen_range(scale.0..=scale.1);
        let log_ratio = rng.gen_range(ratio.0.ln()..=ratio.1.ln());
        let aspect = log_ratio.exp();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cw = (target_area * aspect).sqrt().round() as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ch = (target_area / aspect).sqrt().round() as u32;

        if cw > 0 && ch > 0 && cw <= w && ch <= h {
            let x = rng.gen_range(0..=(w - cw));
            let y = rng.gen_range(0..=(h - ch));
            let cropped = img.crop_imm(x, y, cw, ch);
            return cropped.resize_exact(size, size, imageops::FilterType::Triangle);
        }
    }

    // Fallback: center crop the largest fitting square, then resize.
    let side = w.min(h);
    center_crop(img, side).resize_exact(size, size, imageops::FilterType::Triangle)
}

/// Converts an image to a flat CHW `f32` buffer scaled to `[0, 1]`.
fn to_chw(img: &DynamicImage) -> Vec<f32> {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let pixels = (w as usize) * (h as usize);
    let raw = rgb.into_raw();

    let mut data = vec![0.0_f32; 3 * pixels];
    for (i, chunk) in raw.chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * pixels + i] = f32::from(chunk[c]) / 255.0;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn transform_determinism_flags() {
        assert!(Transform::Resize { size: 256 }.is_deterministic());
        assert!(Transform::CenterCrop { size: 224 }.is_deterministic());
        assert!(Transform::Normalize {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
        .is_deterministic());
        assert!(!Transform::RandomHorizontalFlip { p: 0.5 }.is_deterministic());
        assert!(!Transform::RandomResizedCrop {
            size: 224,
            scale: (0.08, 1.0),
            ratio: (0.75, 4.0 / 3.0),
        }
        .is_deterministic());
    }

    #[test]
    fn eval_preset_is_deterministic() {
        let pipeline = TransformPipeline::eval_preset(224);
        assert!(pipeline.is_deterministic());
        assert_eq!(pipeline.steps.len(), 3);
        assert_eq!(pipeline.steps[0], Transform::Resize { size: 256 });
        assert_eq!(pipeline.steps[1], Transform::CenterCrop { size: 224 });
    }

    #[test]
    fn train_preset_is_random() {
        let pipeline = TransformPipeline::train_preset(224);
        assert!(!pipeline.is_deterministic());
    }

    #[test]
    fn eval_preset_output_shape() {
        let pipeline = TransformPipeline::eval_preset(32);
        let img = gradient_image(60, 40);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let (data, w, h) = pipeline.apply(&img, &mut rng);
        assert_eq!(w, 32);
        assert_eq!(h, 32);
        assert_eq!(data.len(), 3 * 32 * 32);
    }

    #[test]
    fn eval_preset_same_output_for_same_input() {
        let pipeline = TransformPipeline::eval_preset(32);
        let img = gradient_image(60, 40);

        let mut rng_a = ChaCha8Rng::seed_from_u64(1);
        let mut rng_b = ChaCha8Rng::seed_from_u64(99);
        let (a, _, _) = pipeline.apply(&img, &mut rng_a);
        let (b, _, _) = pipeline.apply(&img, &mut rng_b);
        assert_eq!(a, b);
    }

    #[test]
    fn train_preset_output_shape() {
        let pipeline = TransformPipeline::train_preset(32);
        let img = gradient_image(60, 40);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let (data, w, h) = pipeline.apply(&img, &mut rng);
        assert_eq!(w, 32);
        assert_eq!(h, 32);
        assert_eq!(data.len(), 3 * 32 * 32);
    }

    #[test]
    fn train_preset_seeded_reproducibility() {
        let pipeline = TransformPipeline::train_preset(32);
        let img = gradient_image(60, 40);

        let mut rng_a = ChaCha8Rng::seed_from_u64(7);
        let mut rng_b = ChaCha8Rng::seed_from_u64(7);
        let (a, _, _) = pipeline.apply(&img, &mut rng_a);
        let (b, _, _) = pipeline.apply(&img, &mut rng_b);
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_math() {
        let pipeline = TransformPipeline::new(vec![Transform::Normalize {
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
        }]);
        // A solid white image: every channel value is 1.0 before normalize.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255])));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let (data, _, _) = pipeline.apply(&img, &mut rng);
        for v in data {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn flip_probability_zero_is_identity() {
        let deterministic = TransformPipeline::new(vec![Transform::Resize { size: 16 }]);
        let with_flip = TransformPipeline::new(vec![
            Transform::Resize { size: 16 },
            Transform::RandomHorizontalFlip { p: 0.0 },
        ]);
        let img = gradient_image(32, 24);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let (a, _, _) = deterministic.apply(&img, &mut rng);
        let (b, _, _) = with_flip.apply(&img, &mut rng);
        assert_eq!(a, b);
    }

    #[test]
    fn center_crop_clamps_to_image() {
        let pipeline = TransformPipeline::new(vec![Transform::CenterCrop { size: 100 }]);
        let img = gradient_image(20, 30);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let (data, w, h) = pipeline.apply(&img, &mut rng);
        assert_eq!(w, 20);
        assert_eq!(h, 30);
        assert_eq!(data.len(), 3 * 20 * 30);
    }

    #[test]
    fn pipeline_serialization() {
        let pipeline = TransformPipeline::train_preset(224);
        let json = serde_json::to_string(&pipeline);
        assert!(json.is_ok());

        let parsed: std::result::Result<TransformPipeline, _> =
            serde_json::from_str(&json.unwrap_or_default());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap_or_default(), pipeline);
    }
}
