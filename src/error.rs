// THEORY:
// Error types for every fallible edge of the crate. The analysis stages themselves
// (segmentation, density, scoring) are total and have no error type. Failures only
// come from decoding input bytes, reading files, loading configuration and writing
// exports.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Input bytes could not be turned into a usable `Slide`.
///
/// The batch runners treat every variant as "skip this item and keep going".
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("input is empty")]
    EmptyPayload,
    #[error("could not decode image: {0}")]
    Undecodable(#[from] image::ImageError),
    #[error("decoded image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// A single batch input that produced no record.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("analysis task was cancelled or panicked: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to format report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode preview: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
