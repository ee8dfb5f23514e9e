//! NXmx schema access over HDF5.
//!
//! Reads the first entry/instrument/detector and entry/data of a
//! filewriter file into [`DetectorDescriptor`] and raw frames.

use crate::{Error, Result};
use eigerpix_core::detector::{DetectorDescriptor, DetectorModule};
use eigerpix_core::DetectorProfile;
use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Container, Dataset, File, Group};
use ndarray::{s, Array2};
use std::path::{Path, PathBuf};

/// Detector group of the first entry.
pub const DETECTOR_PATH: &str = "/entry/instrument/detector";

/// Data group of the first entry.
pub const DATA_PATH: &str = "/entry/data";

const MODULE_CLASS: &str = "NXdetector_module";

// Upper bound for fixed-length string fields; shorter strings are padded
// by HDF5 on conversion and trimmed on access.
const FIXED_STRING_LEN: usize = 1024;

/// An open NXmx file.
pub struct NxmxFile {
    file: File,
    path: PathBuf,
}

impl NxmxFile {
    /// Opens a file read-only.
    ///
    /// # Errors
    /// Returns an error if the file is not a readable HDF5 file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self {
            file,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a string field as bytes, `None` if the node is absent.
    ///
    /// # Errors
    /// Returns an error if the node exists but is not a string.
    pub fn read_bytes_opt(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.file.dataset(path) {
            Ok(dataset) => Ok(Some(read_string_bytes(&dataset, path)?)),
            Err(_) => Ok(None),
        }
    }

    /// Returns true if the identity field at the profile's path matches.
    ///
    /// Never fails: absent or malformed fields count as a mismatch.
    #[must_use]
    pub fn identifies(&self, profile: &dyn DetectorProfile) -> bool {
        match self.read_bytes_opt(profile.identity_path()) {
            Ok(Some(value)) => profile.matches(&value),
            Ok(None) => {
                log::debug!(
                    "{}: no {} node",
                    self.path.display(),
                    profile.identity_path()
                );
                false
            }
            Err(e) => {
                log::debug!("{}: unreadable identity: {e}", self.path.display());
                false
            }
        }
    }

    /// Reads the detector descriptor as stored, without any repair.
    ///
    /// `firmware_path` locates the firmware release string; it is recorded
    /// when present and left `None` otherwise.
    ///
    /// # Errors
    /// Returns an error if the detector group, its module records, or the
    /// `detectorSpecific` image counts are missing or malformed.
    pub fn read_detector(&self, firmware_path: &str) -> Result<DetectorDescriptor> {
        let detector = self.group(DETECTOR_PATH)?;

        let detector_number = match detector.dataset("detector_number") {
            Ok(ds) => read_string_bytes(&ds, &format!("{DETECTOR_PATH}/detector_number"))?,
            Err(_) => Vec::new(),
        };

        let firmware_version = self
            .read_bytes_opt(firmware_path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

        Ok(DetectorDescriptor {
            detector_number,
            modules: read_modules(&detector)?,
            bit_depth_image: read_u32_opt(&detector, "detectorSpecific/bit_depth_image")?,
            bit_depth_readout: read_u32_opt(&detector, "bit_depth_readout")?,
            underload_value: read_i64_opt(&detector, "underload_value")?,
            saturation_value: read_i64_opt(&detector, "saturation_value")?,
            firmware_version,
            nimages: read_u64(&detector, "detectorSpecific/nimages")?,
            ntrigger: read_u64(&detector, "detectorSpecific/ntrigger")?,
        })
    }

    /// Member names of the data group, in storage order.
    ///
    /// # Errors
    /// Returns an error if the data group is missing.
    pub fn data_member_names(&self) -> Result<Vec<String>> {
        Ok(self.group(DATA_PATH)?.member_names()?)
    }

    /// Number of frames in a data block (its leading-axis extent).
    ///
    /// # Errors
    /// Returns an error if the block is missing or not three-dimensional.
    pub fn block_frame_count(&self, key: &str) -> Result<usize> {
        let shape = block_shape(&self.block(key)?, key)?;
        Ok(shape[0])
    }

    /// Reads one full detector frame from a data block.
    ///
    /// # Errors
    /// Returns an error if the block is missing, malformed, or shorter than
    /// `frame + 1` frames.
    pub fn read_frame(&self, key: &str, frame: usize) -> Result<Array2<i64>> {
        let dataset = self.block(key)?;
        let shape = block_shape(&dataset, key)?;
        if frame >= shape[0] {
            return Err(Error::FrameOutOfRange {
                block: key.to_string(),
                frame,
                frames: shape[0],
            });
        }
        Ok(dataset.read_slice_2d::<i64, _>(s![frame, .., ..])?)
    }

    fn group(&self, path: &str) -> Result<Group> {
        self.file.group(path).map_err(|_| Error::MissingNode {
            path: path.to_string(),
        })
    }

    fn block(&self, key: &str) -> Result<Dataset> {
        self.group(DATA_PATH)?
            .dataset(key)
            .map_err(|_| Error::MissingNode {
                path: format!("{DATA_PATH}/{key}"),
            })
    }
}

fn block_shape(dataset: &Dataset, key: &str) -> Result<[usize; 3]> {
    let shape = dataset.shape();
    match shape.as_slice() {
        &[frames, rows, cols] => Ok([frames, rows, cols]),
        other => Err(Error::InvalidFormat(format!(
            "{DATA_PATH}/{key} must be 3-D (frame, row, column), got shape {other:?}"
        ))),
    }
}

fn read_modules(detector: &Group) -> Result<Vec<DetectorModule>> {
    let mut modules = Vec::new();
    for group in detector.groups()? {
        let full_name = group.name();
        let name = full_name.rsplit('/').next().unwrap_or(&full_name).to_string();

        let is_module = match group.attr("NX_class") {
            Ok(attr) => read_string_bytes(&attr, &format!("{full_name}@NX_class"))?
                == MODULE_CLASS.as_bytes(),
            Err(_) => name.starts_with("module"),
        };
        if !is_module {
            continue;
        }

        let data_origin = read_pair(&group, "data_origin", &full_name)?;
        let data_size = read_pair(&group, "data_size", &full_name)?;
        modules.push(DetectorModule::new(name, data_origin, data_size));
    }

    if modules.is_empty() {
        return Err(Error::MissingNode {
            path: format!("{DETECTOR_PATH}/<{MODULE_CLASS}>"),
        });
    }
    modules.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(modules)
}

fn read_pair(group: &Group, name: &str, parent: &str) -> Result<[usize; 2]> {
    let path = format!("{parent}/{name}");
    let dataset = group
        .dataset(name)
        .map_err(|_| Error::MissingNode { path: path.clone() })?;
    let values = dataset.read_raw::<i64>()?;
    match values.as_slice() {
        &[a, b] => {
            let a = usize::try_from(a)
                .map_err(|_| Error::InvalidFormat(format!("{path} has negative entry {a}")))?;
            let b = usize::try_from(b)
                .map_err(|_| Error::InvalidFormat(format!("{path} has negative entry {b}")))?;
            Ok([a, b])
        }
        _ => Err(Error::InvalidFormat(format!(
            "{path} must hold two values, got {}",
            values.len()
        ))),
    }
}

fn read_i64_opt(group: &Group, name: &str) -> Result<Option<i64>> {
    match group.dataset(name) {
        Ok(dataset) => Ok(dataset.read_raw::<i64>()?.first().copied()),
        Err(_) => Ok(None),
    }
}

fn read_u64(group: &Group, name: &str) -> Result<u64> {
    let value = read_i64_opt(group, name)?.ok_or_else(|| Error::MissingNode {
        path: format!("{DETECTOR_PATH}/{name}"),
    })?;
    u64::try_from(value).map_err(|_| Error::InvalidFormat(format!("{name} is negative: {value}")))
}

fn read_u32_opt(group: &Group, name: &str) -> Result<Option<u32>> {
    read_i64_opt(group, name)?
        .map(|value| {
            u32::try_from(value)
                .map_err(|_| Error::InvalidFormat(format!("{name} out of range: {value}")))
        })
        .transpose()
}

fn read_string_bytes(container: &Container, path: &str) -> Result<Vec<u8>> {
    let descriptor = container.dtype()?.to_descriptor()?;
    let bytes = match descriptor {
        TypeDescriptor::VarLenUnicode => first(container.read_raw::<VarLenUnicode>()?, path)?
            .as_bytes()
            .to_vec(),
        TypeDescriptor::VarLenAscii => first(container.read_raw::<VarLenAscii>()?, path)?
            .as_bytes()
            .to_vec(),
        TypeDescriptor::FixedAscii(_) => {
            first(container.read_raw::<FixedAscii<FIXED_STRING_LEN>>()?, path)?
                .as_bytes()
                .to_vec()
        }
        TypeDescriptor::FixedUnicode(_) => {
            first(container.read_raw::<FixedUnicode<FIXED_STRING_LEN>>()?, path)?
                .as_bytes()
                .to_vec()
        }
        other => {
            return Err(Error::InvalidFormat(format!(
                "{path} is not a string (type {other:?})"
            )))
        }
    };
    Ok(trim_nul(bytes))
}

fn first<T>(values: Vec<T>, path: &str) -> Result<T> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidFormat(format!("{path} is empty")))
}

fn trim_nul(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_nul() {
        assert_eq!(trim_nul(b"E-32-0123\0\0".to_vec()), b"E-32-0123");
        assert_eq!(trim_nul(b"\0".to_vec()), b"");
        assert_eq!(trim_nul(b"a\0b".to_vec()), b"a\0b");
    }
}
