//! Directory-backed image dataset.
//!
//! An [`ImageFolder`] indexes a directory laid out as one subdirectory per
//! class, with image files inside each. Class indices follow the sorted
//! order of the subdirectory names, so labels are stable across runs and
//! machines.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use rand::Rng;
use tracing::debug;

use crate::error::{DatasetError, Result};
use crate::sample::ImageSample;
use crate::transform::TransformPipeline;

/// File extensions recognized as images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// An image classification dataset backed by a class-per-directory layout.
///
/// ```text
/// root/
///   ants/
///     0001.jpg
///     0002.jpg
///   bees/
///     0001.jpg
/// ```
///
/// Images are decoded lazily: the index holds only paths and labels, and
/// [`ImageFolder::load`] decodes and transforms on demand.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    classes: Vec<String>,
    items: Vec<(PathBuf, usize)>,
}

impl ImageFolder {
    /// Indexes the directory at `root`.
    ///
    /// Each immediate subdirectory becomes a class, sorted by name. Files
    /// without a recognized image extension are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingSplit`] if `root` is not a
    /// directory, [`DatasetError::EmptyDataset`] if no images are found,
    /// or [`DatasetError::Io`] if the directory cannot be read.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(DatasetError::missing_split(root.display().to_string()));
        }

        let mut class_dirs: Vec<PathBuf> = fs::read_dir(&root)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        class_dirs.sort();

        let mut classes = Vec::with_capacity(class_dirs.len());
        let mut items = Vec::new();

        for dir in class_dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let label = classes.len();
            classes.push(name.to_string());

            let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.path())
                .filter(|path| is_image_file(path))
                .collect();
            files.sort();

            for file in files {
                items.push((file, label));
            }
        }

        if items.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }

        debug!(
            root = %root.display(),
            classes = classes.len(),
            images = items.len(),
            "indexed image folder"
        );

        Ok(Self {
            root,
            classes,
            items,
        })
    }

    /// Returns the dataset root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the sorted class names.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Returns the number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Returns the number of indexed images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no images are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the path and label at `index` without decoding the image.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<(&Path, usize)> {
        self.items
            .get(index)
            .map(|(path, label)| (path.as_path(), *label))
    }

    /// Decodes and transforms the image at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::IndexOutOfRange`] for an invalid index or
    /// [`DatasetError::DecodeImage`] if the file cannot be decoded.
    pub fn load<R: Rng>(
        &self,
        index: usize,
        pipeline: &TransformPipeline,
        rng: &mut R,
    ) -> Result<ImageSample> {
        let (path, label) = self
            .items
            .get(index)
            .ok_or_else(|| DatasetError::index_out_of_range(index, self.items.len()))?;

        let image = ImageReader::open(path)
            .map_err(|e| DatasetError::decode_image(path.display().to_string(), e.to_string()))?
            .decode()
            .map_err(|e| DatasetError::decode_image(path.display().to_string(), e.to_string()))?;

        let (data, width, height) = pipeline.apply(&image, rng);
        Ok(ImageSample::new(data, width, height, *label))
    }

    /// Decodes and transforms every image in index order.
    ///
    /// # Errors
    ///
    /// Returns the first decode error encountered.
    pub fn load_all<R: Rng>(
        &self,
        pipeline: &TransformPipeline,
        rng: &mut R,
    ) -> Result<Vec<ImageSample>> {
        (0..self.items.len())
            .map(|i| self.load(i, pipeline, rng))
            .collect()
    }
}

/// Returns `true` if the path has a recognized image extension.
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let lower = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
}
