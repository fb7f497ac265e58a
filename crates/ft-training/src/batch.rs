//! Mini-batch assembly.

use burn::prelude::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use ft_dataset::ImageSample;

use crate::error::{Result, TrainingError};

/// Stacks [`ImageSample`]s into device tensors.
///
/// Produces an image tensor of shape `[batch, 3, height, width]` and an
/// integer label tensor of shape `[batch]`. Every sample in a batch must
/// share the same dimensions, which the transform pipeline guarantees for
/// fixed-size presets.
#[derive(Debug, Clone)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    /// Creates a batcher placing tensors on `device`.
    #[must_use]
    pub const fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Assembles a batch.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Batch`] if the batch is empty, a sample
    /// is malformed, or sample dimensions are mixed.
    #[allow(clippy::cast_possible_wrap)]
    pub fn batch(&self, samples: &[&ImageSample]) -> Result<(Tensor<B, 4>, Tensor<B, 1, Int>)> {
        let Some(first) = samples.first() else {
            return Err(TrainingError::batch("empty batch"));
        };
        let (width, height) = (first.width, first.height);

        let pixels = (3 * width * height) as usize;
        let mut flat = Vec::with_capacity(samples.len() * pixels);
        let mut labels = Vec::with_capacity(samples.len());

        for sample in samples {
            if !sample.is_valid() {
                return Err(TrainingError::batch(format!(
                    "invalid sample: {} values for {}x{}",
                    sample.image_chw.len(),
                    sample.width,
                    sample.height
                )));
            }
            if sample.width != width || sample.height != height {
                return Err(TrainingError::batch(format!(
                    "mixed sample sizes: {}x{} and {}x{}",
                    width, height, sample.width, sample.height
                )));
            }
            flat.extend_from_slice(&sample.image_chw);
            labels.push(sample.label as i64);
        }

        let images = Tensor::from_data(
            TensorData::new(flat, [samples.len(), 3, height as usize, width as usize]),
            &self.device,
        );
        let targets = Tensor::from_data(TensorData::new(labels, [samples.len()]), &self.device);

        Ok((images, targets))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample(width: u32, height: u32, label: usize, fill: f32) -> ImageSample {
        ImageSample::new(
            vec![fill; (3 * width * height) as usize],
            width,
            height,
            label,
        )
    }

    #[test]
    fn batch_shapes() {
        let device = <TestBackend as Backend>::Device::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);

        let a = sample(8, 8, 0, 0.1);
        let b = sample(8, 8, 1, 0.9);
        let (images, targets) = batcher.batch(&[&a, &b]).unwrap();

        assert_eq!(images.dims(), [2, 3, 8, 8]);
        assert_eq!(targets.dims(), [2]);

        let labels: Vec<i64> = targets.into_data().to_vec().unwrap();
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn batch_preserves_values() {
        let device = <TestBackend as Backend>::Device::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);

        let a = sample(2, 2, 0, 0.25);
        let (images, _) = batcher.batch(&[&a]).unwrap();
        let values: Vec<f32> = images.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn batch_empty_fails() {
        let device = <TestBackend as Backend>::Device::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);
        let result = batcher.batch(&[]);
        assert!(matches!(result, Err(TrainingError::Batch(_))));
    }

    #[test]
    fn batch_mixed_sizes_fail() {
        let device = <TestBackend as Backend>::Device::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);

        let a = sample(8, 8, 0, 0.1);
        let b = sample(4, 4, 1, 0.9);
        let result = batcher.batch(&[&a, &b]);
        assert!(matches!(result, Err(TrainingError::Batch(_))));
    }

    #[test]
    fn batch_invalid_sample_fails() {
        let device = <TestBackend as Backend>::Device::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);

        let bad = ImageSample::new(vec![0.5; 7], 8, 8, 0);
        let result = batcher.batch(&[&bad]);
        assert!(matches!(result, Err(TrainingError::Batch(_))));
    }
}
