//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HDF5 library error.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Required node absent from the file.
    #[error("missing node: {path}")]
    MissingNode { path: String },

    /// Data block holds fewer frames than the resolved offset.
    #[error("frame {frame} out of range for {block} ({frames} frames)")]
    FrameOutOfRange {
        block: String,
        frame: usize,
        frames: usize,
    },

    /// A profile with the same plugin name is already registered.
    #[error("duplicate plugin name: {0}")]
    DuplicatePlugin(String),

    /// Node present but not of the expected shape or type.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] eigerpix_core::Error),
}
