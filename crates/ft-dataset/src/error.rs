//! Error types for ft-dataset crate.

use thiserror::Error;

/// Errors that can occur in ft-dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Failed to download the dataset archive.
    #[error("failed to download {url}: {reason}")]
    Download {
        /// URL that was fetched.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Server responded with a non-success status.
    #[error("download of {url} failed with HTTP status {status}")]
    HttpStatus {
        /// URL that was fetched.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Failed to read or extract the archive.
    #[error("invalid archive {path}: {reason}")]
    Archive {
        /// Path to the archive file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Archive entry would extract outside the target directory.
    #[error("archive entry escapes target directory: {0}")]
    UnsafeArchiveEntry(String),

    /// Failed to decode an image file.
    #[error("failed to decode image {path}: {reason}")]
    DecodeImage {
        /// Path to the image file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Split directory does not exist.
    #[error("split directory not found: {0}")]
    MissingSplit(String),

    /// Dataset contains no classes or no images.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Sample index out of range.
    #[error("sample index {index} out of range (dataset has {len} samples)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Dataset length.
        len: usize,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl DatasetError {
    /// Creates a download error.
    #[must_use]
    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an archive error.
    #[must_use]
    pub fn archive(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsafe archive entry error.
    #[must_use]
    pub fn unsafe_entry(name: impl Into<String>) -> Self {
        Self::UnsafeArchiveEntry(name.into())
    }

    /// Creates an image decode error.
    #[must_use]
    pub fn decode_image(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodeImage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing split error.
    #[must_use]
    pub fn missing_split(path: impl Into<String>) -> Self {
        Self::MissingSplit(path.into())
    }

    /// Creates an index out of range error.
    #[must_use]
    pub const fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Creates an IO error.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io(reason.into())
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for ft-dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_download() {
        let err = DatasetError::download("http://example.com/data.zip", "timed out");
        assert!(err.to_string().contains("http://example.com/data.zip"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn error_http_status() {
        let err = DatasetError::http_status("http://example.com/data.zip", 404);
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn error_archive() {
        let err = DatasetError::archive("data.zip", "not a zip file");
        assert!(err.to_string().contains("data.zip"));
        assert!(err.to_string().contains("not a zip file"));
    }

    #[test]
    fn error_unsafe_entry() {
        let err = DatasetError::unsafe_entry("../evil.txt");
        assert!(err.to_string().contains("../evil.txt"));
    }

    #[test]
    fn error_decode_image() {
        let err = DatasetError::decode_image("ants/a.jpg", "truncated");
        assert!(err.to_string().contains("ants/a.jpg"));
    }

    #[test]
    fn error_missing_split() {
        let err = DatasetError::missing_split("data/train");
        assert!(err.to_string().contains("data/train"));
    }

    #[test]
    fn error_empty_dataset() {
        let err = DatasetError::EmptyDataset;
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn error_index_out_of_range() {
        let err = DatasetError::index_out_of_range(10, 4);
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: DatasetError = io_err.into();
        assert!(matches!(err, DatasetError::Io(_)));
    }
}
