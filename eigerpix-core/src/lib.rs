//! eigerpix-core: Detector profile logic for EIGER NXmx data.
//!
//! This crate holds the pieces that do not touch HDF5: the detector
//! descriptor and module slicer, firmware version handling and metadata
//! repair, flat image index resolution across multi-file datasets, and
//! overflow/underflow sentinel remapping.
//!

pub mod detector;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod profile;
pub mod sentinel;
pub mod version;

pub use detector::{DetectorDescriptor, DetectorModule, ModuleSlice};
pub use error::{Error, Result};
pub use geometry::Goniometer;
pub use layout::{is_data_block_key, DatasetLayout, FrameLocation, FrameOrder};
pub use profile::{DetectorProfile, EigerProfile, ProfileConfig, CHESS_PLUGIN_NAME};
pub use sentinel::{SentinelPolicy, INACTIVE_PIXEL, SATURATED_PIXEL};
pub use version::{FirmwareVersion, PreRelease};
