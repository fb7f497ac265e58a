//! Dataset download and extraction.
//!
//! A [`DatasetPreparer`] fetches a zip archive over HTTP and unpacks it
//! into a destination directory. Preparation is idempotent: if the
//! extracted directory already exists, both the download and the
//! extraction are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{DatasetError, Result};

/// Default HTTP timeout for downloads, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Downloads and extracts a zipped dataset.
///
/// # Example
///
/// ```
/// use ft_dataset::DatasetPreparer;
///
/// let preparer = DatasetPreparer::new(
///     "https://download.pytorch.org/tutorial/hymenoptera_data.zip",
///     "hymenoptera_data.zip",
///     "hymenoptera_data",
/// );
/// assert_eq!(preparer.extracted_dir(), "hymenoptera_data");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPreparer {
    /// Source URL of the zip archive.
    pub url: String,

    /// File name for the downloaded archive inside the destination root.
    pub archive_name: String,

    /// Directory name the archive extracts to, relative to the root.
    pub extracted_dir: String,

    /// Download timeout in seconds.
    pub timeout_secs: u64,
}

impl DatasetPreparer {
    /// Creates a preparer with the default timeout.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        archive_name: impl Into<String>,
        extracted_dir: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            archive_name: archive_name.into(),
            extracted_dir: extracted_dir.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the download timeout in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Returns the extracted directory name.
    #[must_use]
    pub fn extracted_dir(&self) -> &str {
        &self.extracted_dir
    }

    /// Ensures the dataset is present under `root`.
    ///
    /// Returns the path to the extracted directory. If it already exists
    /// nothing is downloaded or extracted. Otherwise the archive is
    /// fetched (unless already on disk) and unpacked into `root`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Download`] or [`DatasetError::HttpStatus`]
    /// on network failures and [`DatasetError::Archive`] on extraction
    /// failures.
    pub fn prepare(&self, root: impl AsRef<Path>) -> Result<PathBuf> {
        let root = root.as_ref();
        let extracted = root.join(&self.extracted_dir);

        if extracted.is_dir() {
            debug!(path = %extracted.display(), "dataset already extracted, skipping");
            return Ok(extracted);
        }

        fs::create_dir_all(root)?;
        let archive_path = root.join(&self.archive_name);

        if !archive_path.is_file() {
            self.download(&archive_path)?;
        } else {
            debug!(path = %archive_path.display(), "archive already downloaded, skipping");
        }

        extract_zip(&archive_path, root)?;

        if !extracted.is_dir() {
            return Err(DatasetError::archive(
                archive_path.display().to_string(),
                format!("archive did not contain directory '{}'", self.extracted_dir),
            ));
        }

        info!(path = %extracted.display(), "dataset prepared");
        Ok(extracted)
    }

    /// Downloads the archive to `dest`.
    fn download(&self, dest: &Path) -> Result<()> {
        info!(url = %self.url, "downloading dataset archive");

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| DatasetError::download(&self.url, e.to_string()))?;

        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| DatasetError::download(&self.url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(DatasetError::http_status(
                &self.url,
                response.status().as_u16(),
            ));
        }

        let bytes = response
            .bytes()
            .map_err(|e| DatasetError::download(&self.url, e.to_string()))?;

        // Write to a temp name first so a partial download never looks
        // like a complete archive on a retry.
        let partial = dest.with_extension("part");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, dest)?;

        info!(path = %dest.display(), bytes = bytes.len(), "download complete");
        Ok(())
    }
}

/// Extracts a zip archive into `dest_root`.
///
/// Entry paths are validated with [`zip::read::ZipFile::enclosed_name`]
/// so an archive cannot write outside the destination.
fn extract_zip(archive_path: &Path, dest_root: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| DatasetError::archive(archive_path.display().to_string(), e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| DatasetError::archive(archive_path.display().to_string(), e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(DatasetError::unsafe_entry(entry.name().to_string()));
        };
        let out_path = dest_root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = fs::File::create(&out_path)?;
            io::copy(&mut entry, &mut out_file)?;
        }
    }

    debug!(
        archive = %archive_path.display(),
        entries = archive.len(),
        "archive extracted"
    );
    Ok(())
}
