//! Image format adapter for profiled EIGER NXmx files.

use crate::materialize::{materialize_modules, ModuleArray};
use crate::nexus::NxmxFile;
use crate::{Error, Result};
use eigerpix_core::{DatasetLayout, DetectorDescriptor, DetectorProfile, Goniometer};
use std::path::Path;
use std::sync::Arc;

/// Reads images from one file using a detector profile.
///
/// The open file handle is kept for the lifetime of the format; the
/// detector schema is re-read and repaired on every access, so repeated
/// calls always see the same corrected metadata. Not for concurrent use on
/// one handle.
pub struct EigerImageFormat {
    file: NxmxFile,
    profile: Arc<dyn DetectorProfile>,
}

impl EigerImageFormat {
    /// Returns true if `profile` recognises the file at `path`.
    ///
    /// The file is opened read-only and closed before returning. Unreadable
    /// files are not recognised.
    pub fn understand<P: AsRef<Path>>(path: P, profile: &dyn DetectorProfile) -> bool {
        match NxmxFile::open(&path) {
            Ok(file) => file.identifies(profile),
            Err(e) => {
                log::debug!("{}: not readable as HDF5: {e}", path.as_ref().display());
                false
            }
        }
    }

    /// Opens a file with the given profile.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened as HDF5.
    pub fn open<P: AsRef<Path>>(path: P, profile: Arc<dyn DetectorProfile>) -> Result<Self> {
        let file = NxmxFile::open(path)?;
        Ok(Self { file, profile })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Plugin name of the profile in use.
    #[must_use]
    pub fn profile_name(&self) -> &str {
        self.profile.name()
    }

    /// Detector descriptor with the profile's repairs applied.
    ///
    /// # Errors
    /// Fails if the detector schema is malformed or the firmware version is
    /// missing or unparsable.
    pub fn detector(&self) -> Result<DetectorDescriptor> {
        let mut detector = self.file.read_detector(self.profile.firmware_path())?;
        self.profile
            .repair(&mut detector)
            .map_err(|e| match e {
                eigerpix_core::Error::MissingMetadata { path } => Error::MissingNode { path },
                other => Error::CoreError(other),
            })?;
        Ok(detector)
    }

    /// Current data block layout, derived fresh from the file.
    ///
    /// # Errors
    /// Fails if no `data_######` block exists or the first block is
    /// malformed.
    pub fn layout(&self) -> Result<DatasetLayout> {
        DatasetLayout::from_keys(
            self.file.data_member_names()?,
            self.profile.frame_order(),
            |first| self.file.block_frame_count(first),
        )
    }

    /// Number of addressable images.
    ///
    /// # Errors
    /// See [`EigerImageFormat::layout`].
    pub fn image_count(&self) -> Result<usize> {
        Ok(self.layout()?.image_count())
    }

    /// Per-module raw pixel arrays of one image.
    ///
    /// Arrays are returned in module enumeration order with sentinel codes
    /// rewritten to `-1` (inactive) and `-2` (saturated). Remapping is skipped
    /// when neither bit depth is recorded.
    ///
    /// # Errors
    /// Fails on metadata integrity problems, an out-of-range index, or HDF5
    /// read errors.
    pub fn get_raw_data(&self, index: usize) -> Result<Vec<ModuleArray>> {
        let detector = self.detector()?;
        let layout = self.layout()?;
        let location = self.profile.resolve(&layout, index)?;

        let bit_depth = detector.effective_bit_depth();
        let frame = self
            .file
            .read_frame(layout.block_key(location), location.frame)?;
        let mut modules = materialize_modules(frame.view(), &detector.module_slices(), bit_depth)?;

        match self.profile.sentinel_policy(&detector)? {
            Some(policy) => policy.remap_all(&mut modules),
            None => log::warn!(
                "{}: no bit depth recorded, sentinel values left as stored",
                self.path().display()
            ),
        }
        Ok(modules)
    }

    /// Goniometer geometry hint.
    #[must_use]
    pub fn goniometer(&self) -> Goniometer {
        self.profile.goniometer()
    }
}
