//! Detector profiles.
//!
//! A profile bundles everything that is specific to one detector
//! installation: how to recognise its files, how to repair firmware
//! metadata quirks, how flat indices walk the dataset, and how pixel
//! sentinels are coded. Format adapters are composed with a profile instead
//! of overriding or patching a generic reader.

use crate::detector::DetectorDescriptor;
use crate::error::{Error, Result};
use crate::geometry::Goniometer;
use crate::layout::{DatasetLayout, FrameLocation, FrameOrder};
use crate::sentinel::SentinelPolicy;
use crate::version::FirmwareVersion;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Plugin name of the built-in ID7B2 profile.
pub const CHESS_PLUGIN_NAME: &str = "NXmxEigerFilewriterCHESS";

/// Capability interface implemented by each supported detector.
pub trait DetectorProfile: Send + Sync {
    /// Plugin name used for registration and discovery.
    fn name(&self) -> &str;

    /// HDF5 path of the identity field.
    fn identity_path(&self) -> &str;

    /// HDF5 path of the firmware release string.
    fn firmware_path(&self) -> &str;

    /// Returns true if `detector_number` belongs to this detector.
    fn matches(&self, detector_number: &[u8]) -> bool;

    /// Normalizes firmware-dependent metadata in place.
    ///
    /// # Errors
    /// Fails if the firmware version is missing or unparsable.
    fn repair(&self, detector: &mut DetectorDescriptor) -> Result<()>;

    /// Order in which flat indices traverse data blocks.
    fn frame_order(&self) -> FrameOrder;

    /// Maps a flat image index onto the dataset layout.
    ///
    /// # Errors
    /// Fails if the index is out of range.
    fn resolve(&self, layout: &DatasetLayout, index: usize) -> Result<FrameLocation> {
        layout.locate(index)
    }

    /// Sentinel policy for a repaired detector, or `None` when remapping
    /// should be skipped.
    ///
    /// # Errors
    /// Fails if the bit depth cannot be represented.
    fn sentinel_policy(&self, detector: &DetectorDescriptor) -> Result<Option<SentinelPolicy>> {
        SentinelPolicy::for_optional_bit_depth(detector.effective_bit_depth())
    }

    /// Goniometer geometry hint.
    fn goniometer(&self) -> Goniometer;
}

/// Configuration of an [`EigerProfile`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Plugin name.
    pub plugin_name: String,
    /// Expected `detector_number` value.
    pub detector_number: String,
    /// Path of the identity field.
    pub detector_number_path: String,
    /// Path of the firmware release string.
    pub firmware_path: String,
    /// Prefix stripped from the firmware string before parsing.
    pub firmware_prefix: String,
    /// Firmware older than this stored module sizes in (fast, slow) order.
    pub swap_axes_before: String,
    /// Flat index traversal order.
    pub frame_order: FrameOrder,
    /// Goniometer rotation axis.
    pub rotation_axis: [f64; 3],
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self::chess_id7b2_defaults()
    }
}

impl ProfileConfig {
    /// Configuration of the EIGER at CHESS beamline ID7B2.
    #[must_use]
    pub fn chess_id7b2_defaults() -> Self {
        Self {
            plugin_name: CHESS_PLUGIN_NAME.to_string(),
            detector_number: "E-32-0123".to_string(),
            detector_number_path: "/entry/instrument/detector/detector_number".to_string(),
            firmware_path: "/entry/instrument/detector/detectorSpecific/eiger_fw_version"
                .to_string(),
            firmware_prefix: "release-".to_string(),
            swap_axes_before: "2022.1.2".to_string(),
            frame_order: FrameOrder::Sequential,
            rotation_axis: [-1.0, 0.0, 0.0],
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing fields take their ID7B2 defaults.
    ///
    /// # Errors
    /// Fails if the file cannot be read, is not valid JSON, or does not
    /// validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Fails if the string is not valid JSON or does not validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field consistency.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.plugin_name.is_empty() {
            return Err(Error::ConfigError("plugin_name is empty".to_string()));
        }
        if self.detector_number.is_empty() {
            return Err(Error::ConfigError("detector_number is empty".to_string()));
        }
        self.threshold()?;
        if self.rotation_axis.iter().all(|&c| c == 0.0)
            || self.rotation_axis.iter().any(|c| !c.is_finite())
        {
            return Err(Error::ConfigError(format!(
                "rotation_axis {:?} is not a usable direction",
                self.rotation_axis
            )));
        }
        Ok(())
    }

    fn threshold(&self) -> Result<FirmwareVersion> {
        self.swap_axes_before.parse().map_err(|_| {
            Error::ConfigError(format!(
                "swap_axes_before {:?} is not a version",
                self.swap_axes_before
            ))
        })
    }
}

/// Profile for EIGER filewriter data from one identified detector.
#[derive(Clone, Debug)]
pub struct EigerProfile {
    config: ProfileConfig,
    threshold: FirmwareVersion,
}

impl Default for EigerProfile {
    fn default() -> Self {
        Self::chess_id7b2()
    }
}

impl EigerProfile {
    /// The built-in ID7B2 profile.
    #[must_use]
    pub fn chess_id7b2() -> Self {
        Self {
            config: ProfileConfig::chess_id7b2_defaults(),
            threshold: FirmwareVersion::new(&[2022, 1, 2]),
        }
    }

    /// Builds a profile from configuration.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the configuration does not validate.
    pub fn with_config(config: ProfileConfig) -> Result<Self> {
        config.validate()?;
        let threshold = config.threshold()?;
        Ok(Self { config, threshold })
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Parses the firmware release string of `detector`.
    ///
    /// # Errors
    /// Returns [`Error::MissingMetadata`] if the string was not read, or
    /// [`Error::InvalidFirmwareVersion`] if it does not parse.
    pub fn firmware_version(&self, detector: &DetectorDescriptor) -> Result<FirmwareVersion> {
        let raw = detector
            .firmware_version
            .as_deref()
            .ok_or_else(|| Error::MissingMetadata {
                path: self.config.firmware_path.clone(),
            })?;
        FirmwareVersion::parse_with_prefix(raw, &self.config.firmware_prefix)
    }

    /// Returns true if files from `version` store module sizes in reversed
    /// axis order.
    #[must_use]
    pub fn needs_axis_swap(&self, version: &FirmwareVersion) -> bool {
        *version < self.threshold
    }
}

impl DetectorProfile for EigerProfile {
    fn name(&self) -> &str {
        &self.config.plugin_name
    }

    fn identity_path(&self) -> &str {
        &self.config.detector_number_path
    }

    fn firmware_path(&self) -> &str {
        &self.config.firmware_path
    }

    fn matches(&self, detector_number: &[u8]) -> bool {
        detector_number == self.config.detector_number.as_bytes()
    }

    fn repair(&self, detector: &mut DetectorDescriptor) -> Result<()> {
        if detector.underload_value.is_none() {
            detector.underload_value = Some(0);
        }

        let version = self.firmware_version(detector)?;
        if self.needs_axis_swap(&version) {
            log::debug!(
                "firmware {version} older than {}, swapping module size axes",
                self.threshold
            );
            for module in &mut detector.modules {
                module.swap_size_axes();
            }
        }
        Ok(())
    }

    fn frame_order(&self) -> FrameOrder {
        self.config.frame_order
    }

    fn goniometer(&self) -> Goniometer {
        Goniometer::known_axis(self.config.rotation_axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorModule;
    use std::io::Write;

    fn detector(firmware: Option<&str>) -> DetectorDescriptor {
        DetectorDescriptor {
            detector_number: b"E-32-0123".to_vec(),
            modules: vec![
                DetectorModule::new("module0", [0, 0], [1028, 512]),
                DetectorModule::new("module1", [0, 550], [1028, 512]),
            ],
            bit_depth_image: Some(32),
            firmware_version: firmware.map(str::to_string),
            ..DetectorDescriptor::default()
        }
    }

    #[test]
    fn test_matches_identity_only() {
        let profile = EigerProfile::chess_id7b2();
        assert!(profile.matches(b"E-32-0123"));
        assert!(!profile.matches(b"E-32-0124"));
        assert!(!profile.matches(b"E-32-0123 "));
        assert!(!profile.matches(b""));
    }

    #[test]
    fn test_repair_old_firmware_swaps_every_module() {
        let profile = EigerProfile::chess_id7b2();
        let mut det = detector(Some("release-2020.2.5"));
        profile.repair(&mut det).unwrap();
        assert!(det.modules.iter().all(|m| m.data_size == [512, 1028]));
        // Origins are untouched.
        assert_eq!(det.modules[1].data_origin, [0, 550]);
    }

    #[test]
    fn test_repair_current_firmware_keeps_axes() {
        let profile = EigerProfile::chess_id7b2();
        for fw in ["release-2022.1.2", "2022.1.3", "release-2023.1.0"] {
            let mut det = detector(Some(fw));
            profile.repair(&mut det).unwrap();
            assert!(det.modules.iter().all(|m| m.data_size == [1028, 512]), "{fw}");
        }
    }

    #[test]
    fn test_repair_suffixed_firmware() {
        let profile = EigerProfile::chess_id7b2();

        // A release candidate precedes its release.
        let mut det = detector(Some("release-2022.1.2rc1"));
        profile.repair(&mut det).unwrap();
        assert!(det.modules.iter().all(|m| m.data_size == [512, 1028]));

        let mut det = detector(Some("release-2022.1.2.post1"));
        profile.repair(&mut det).unwrap();
        assert!(det.modules.iter().all(|m| m.data_size == [1028, 512]));

        let mut det = detector(Some("release-2021.1.0-dev"));
        profile.repair(&mut det).unwrap();
        assert!(det.modules.iter().all(|m| m.data_size == [512, 1028]));
    }

    #[test]
    fn test_repair_defaults_underload() {
        let profile = EigerProfile::chess_id7b2();
        let mut det = detector(Some("release-2022.1.2"));
        assert_eq!(det.underload_value, None);
        profile.repair(&mut det).unwrap();
        assert_eq!(det.underload_value, Some(0));

        let mut det = detector(Some("release-2022.1.2"));
        det.underload_value = Some(-3);
        profile.repair(&mut det).unwrap();
        assert_eq!(det.underload_value, Some(-3));
    }

    #[test]
    fn test_repair_missing_firmware_is_fatal() {
        let profile = EigerProfile::chess_id7b2();
        let mut det = detector(None);
        let err = profile.repair(&mut det).unwrap_err();
        match err {
            Error::MissingMetadata { path } => assert!(path.ends_with("eiger_fw_version")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_repair_unparsable_firmware_is_fatal() {
        let profile = EigerProfile::chess_id7b2();
        let mut det = detector(Some("release-unknown"));
        let err = profile.repair(&mut det).unwrap_err();
        assert!(matches!(err, Error::InvalidFirmwareVersion { .. }));
        // Nothing was swapped on failure.
        assert_eq!(det.modules[0].data_size, [1028, 512]);
    }

    #[test]
    fn test_sentinel_policy_follows_bit_depth() {
        let profile = EigerProfile::chess_id7b2();
        let mut det = detector(Some("2023.1.0"));
        let policy = profile.sentinel_policy(&det).unwrap().unwrap();
        assert_eq!(policy.top(), 1 << 31);

        det.bit_depth_image = None;
        assert!(profile.sentinel_policy(&det).unwrap().is_none());
    }

    #[test]
    fn test_goniometer_axis() {
        let gonio = EigerProfile::chess_id7b2().goniometer();
        assert_eq!(gonio.rotation_axis, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(ProfileConfig::default(), ProfileConfig::chess_id7b2_defaults());
        let profile = EigerProfile::with_config(ProfileConfig::default()).unwrap();
        assert_eq!(profile.name(), CHESS_PLUGIN_NAME);
        assert!(profile.needs_axis_swap(&"2022.1.1".parse().unwrap()));
        assert!(!profile.needs_axis_swap(&"2022.1.2".parse().unwrap()));
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = ProfileConfig::from_json(
            r#"{"detector_number": "E-08-0042", "frame_order": "interleaved"}"#,
        )
        .unwrap();
        assert_eq!(config.detector_number, "E-08-0042");
        assert_eq!(config.frame_order, FrameOrder::Interleaved);
        assert_eq!(config.firmware_prefix, "release-");

        let profile = EigerProfile::with_config(config).unwrap();
        assert!(profile.matches(b"E-08-0042"));
        assert!(!profile.matches(b"E-32-0123"));
        assert_eq!(profile.frame_order(), FrameOrder::Interleaved);
    }

    #[test]
    fn test_config_rejects_bad_threshold() {
        let err = ProfileConfig::from_json(r#"{"swap_axes_before": "soon"}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_config_rejects_zero_axis() {
        let err = ProfileConfig::from_json(r#"{"rotation_axis": [0.0, 0.0, 0.0]}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"plugin_name": "NXmxEigerTest"}}"#).unwrap();
        let config = ProfileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.plugin_name, "NXmxEigerTest");
        assert_eq!(config.detector_number, "E-32-0123");
    }
}
