//! eigerpix-io: NXmx/HDF5 access for eigerpix.
//!
//! This crate reads EIGER filewriter files through `hdf5`, cuts frames into
//! per-module arrays, and exposes them through [`EigerImageFormat`]
//! composed with a detector profile. [`FormatRegistry`] selects the profile
//! that recognises a given file.
//!

mod error;
pub mod format;
pub mod materialize;
pub mod nexus;
pub mod registry;

pub use error::{Error, Result};
pub use format::EigerImageFormat;
pub use materialize::{materialize, materialize_modules, ModuleArray};
pub use nexus::NxmxFile;
pub use registry::FormatRegistry;
