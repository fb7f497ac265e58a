//! Checkpoint persistence for model weights.
//!
//! Checkpoints hold module weights only, recorded with Burn's file
//! recorders at full precision. Loading requires a model built from the
//! same configuration so the record structure matches.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder, Recorder};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use ft_models::CheckpointFormat;
///
/// let format = CheckpointFormat::from_extension("bin");
/// assert_eq!(format, Some(CheckpointFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckpointFormat {
    /// Binary format, compact and fast.
    ///
    /// Uses Burn's `BinFileRecorder` with full precision.
    #[default]
    Binary,

    /// JSON format, human-readable.
    ///
    /// Uses Burn's `PrettyJsonFileRecorder`. Larger files, handy for
    /// inspecting weights.
    Json,
}

impl CheckpointFormat {
    /// Determines format from a file extension.
    ///
    /// Recognizes `bin` and `burn` as binary and `json` as JSON.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" | "burn" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the default file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Saves a model's weights to `stem` with the format's extension appended.
///
/// Parent directories are created if missing, so a stem like
/// `checkpoints/best` works on a fresh run directory.
///
/// # Returns
///
/// The full path of the written checkpoint.
///
/// # Errors
///
/// Returns [`ModelError::SaveCheckpoint`] if recording fails.
pub fn save_checkpoint<B, M>(
    model: &M,
    stem: impl AsRef<Path>,
    format: CheckpointFormat,
) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
{
    let full_path = stem.as_ref().with_extension(format.extension());
    if let Some(parent) = full_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let record = model.clone().into_record();
    let result = match format {
        CheckpointFormat::Binary => {
            BinFileRecorder::<FullPrecisionSettings>::new().record(record, full_path.clone())
        }
        CheckpointFormat::Json => {
            PrettyJsonFileRecorder::<FullPrecisionSettings>::new().record(record, full_path.clone())
        }
    };

    result
        .map_err(|e| ModelError::save_checkpoint(full_path.display().to_string(), e.to_string()))?;
    Ok(full_path)
}

/// Loads weights from `path` into `model`.
///
/// The format is inferred from the file extension.
///
/// # Errors
///
/// Returns [`ModelError::CheckpointNotFound`] if the file does not exist,
/// [`ModelError::UnsupportedFormat`] if the extension is not recognized,
/// or [`ModelError::LoadCheckpoint`] if the record does not match the
/// model's structure.
pub fn load_checkpoint<B, M>(model: M, path: impl AsRef<Path>, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(ModelError::checkpoint_not_found(path.display().to_string()));
    }

    let format = CheckpointFormat::from_path(path)
        .ok_or_else(|| ModelError::unsupported_format(path.display().to_string()))?;

    let loaded = match format {
        CheckpointFormat::Binary => {
            let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
            model
                .load_file(path, &recorder, device)
                .map_err(|e| ModelError::load_checkpoint(path.display().to_string(), e.to_string()))?
        }
        CheckpointFormat::Json => {
            let recorder = PrettyJsonFileRecorder::<FullPrecisionSettings>::new();
            model
                .load_file(path, &recorder, device)
                .map_err(|e| ModelError::load_checkpoint(path.display().to_string(), e.to_string()))?
        }
    };

    Ok(loaded)
}
