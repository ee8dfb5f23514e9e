//! Error types for eigerpix-core.

use thiserror::Error;

/// Result type alias for eigerpix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for eigerpix operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Firmware version string could not be parsed.
    #[error("invalid firmware version: {value:?}")]
    InvalidFirmwareVersion { value: String },

    /// Required metadata was not present in the file.
    #[error("missing metadata: {path}")]
    MissingMetadata { path: String },

    /// Flat image index beyond the frames addressable across all data blocks.
    #[error("image index {index} out of range (dataset holds {len} images)")]
    IndexOutOfRange { index: usize, len: usize },

    /// No `data_######` blocks were found in the data group.
    #[error("no data blocks matching data_###### found")]
    NoDataBlocks,

    /// Module pixel region does not fit inside the frame.
    #[error("module region rows {rows:?} cols {cols:?} exceeds frame shape {shape:?}")]
    ModuleOutOfBounds {
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
        shape: [usize; 2],
    },

    /// Bit depth that cannot be represented by the sentinel policy.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u32),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
