//! Detector descriptor and module layout.

use serde::Serialize;
use std::ops::Range;

/// One physical sensor tile (`NXdetector_module`).
///
/// Origins and sizes are in (slow, fast) pixel order, i.e. (row, column).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectorModule {
    /// Group name of the module record.
    pub name: String,
    /// First pixel of the module within the full frame.
    pub data_origin: [usize; 2],
    /// Module extent in pixels.
    pub data_size: [usize; 2],
}

impl DetectorModule {
    /// Creates a module record.
    #[must_use]
    pub fn new(name: impl Into<String>, data_origin: [usize; 2], data_size: [usize; 2]) -> Self {
        Self {
            name: name.into(),
            data_origin,
            data_size,
        }
    }

    /// Reverses the axis order of the reported module size.
    pub fn swap_size_axes(&mut self) {
        self.data_size.reverse();
    }

    /// Pixel region covered by this module.
    #[must_use]
    pub fn slice(&self) -> ModuleSlice {
        let [row, col] = self.data_origin;
        let [height, width] = self.data_size;
        ModuleSlice {
            rows: row..row + height,
            cols: col..col + width,
        }
    }
}

/// Pixel-region boundaries of one module within a full frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleSlice {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl ModuleSlice {
    /// Module shape as (rows, columns).
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows.len(), self.cols.len()]
    }

    /// Returns true if the region fits inside a frame of `shape`.
    #[must_use]
    pub fn fits(&self, shape: [usize; 2]) -> bool {
        self.rows.end <= shape[0] && self.cols.end <= shape[1]
    }
}

/// Detector metadata read from `/entry/instrument/detector`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetectorDescriptor {
    /// Serial/identity string (`detector_number`).
    pub detector_number: Vec<u8>,
    /// Module records in enumeration order.
    pub modules: Vec<DetectorModule>,
    /// Bit depth of images as stored on disk.
    pub bit_depth_image: Option<u32>,
    /// Bit depth of the detector readout.
    pub bit_depth_readout: Option<u32>,
    /// Value reported for pixels below the trusted range.
    pub underload_value: Option<i64>,
    /// Value reported for saturated pixels.
    pub saturation_value: Option<i64>,
    /// Raw firmware release string.
    pub firmware_version: Option<String>,
    /// Images per trigger.
    pub nimages: u64,
    /// Number of triggers.
    pub ntrigger: u64,
}

impl DetectorDescriptor {
    /// Detector identity as lossy UTF-8.
    #[must_use]
    pub fn detector_number_lossy(&self) -> String {
        String::from_utf8_lossy(&self.detector_number).into_owned()
    }

    /// Bit depth used to interpret pixel values.
    ///
    /// Prefers the stored image bit depth over the readout bit depth. A zero
    /// bit depth counts as absent.
    #[must_use]
    pub fn effective_bit_depth(&self) -> Option<u32> {
        self.bit_depth_image
            .filter(|&depth| depth > 0)
            .or(self.bit_depth_readout.filter(|&depth| depth > 0))
    }

    /// Enumerates module regions in module order.
    ///
    /// Consumers zip these positionally with the arrays returned for a frame.
    #[must_use]
    pub fn module_slices(&self) -> Vec<ModuleSlice> {
        self.modules.iter().map(DetectorModule::slice).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_module_detector() -> DetectorDescriptor {
        DetectorDescriptor {
            detector_number: b"E-32-0123".to_vec(),
            modules: vec![
                DetectorModule::new("module0", [0, 0], [4, 6]),
                DetectorModule::new("module1", [5, 0], [4, 6]),
            ],
            bit_depth_image: Some(16),
            ..DetectorDescriptor::default()
        }
    }

    #[test]
    fn test_module_slices_in_order() {
        let slices = two_module_detector().module_slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].rows, 0..4);
        assert_eq!(slices[0].cols, 0..6);
        assert_eq!(slices[1].rows, 5..9);
        assert_eq!(slices[1].shape(), [4, 6]);
        assert!(slices[1].fits([9, 6]));
        assert!(!slices[1].fits([8, 6]));
    }

    #[test]
    fn test_swap_is_involution() {
        let mut module = DetectorModule::new("module", [0, 0], [512, 1028]);
        module.swap_size_axes();
        assert_eq!(module.data_size, [1028, 512]);
        module.swap_size_axes();
        assert_eq!(module.data_size, [512, 1028]);
    }

    #[test]
    fn test_effective_bit_depth() {
        let mut detector = two_module_detector();
        detector.bit_depth_readout = Some(32);
        assert_eq!(detector.effective_bit_depth(), Some(16));

        detector.bit_depth_image = None;
        assert_eq!(detector.effective_bit_depth(), Some(32));

        detector.bit_depth_image = Some(0);
        assert_eq!(detector.effective_bit_depth(), Some(32));

        detector.bit_depth_readout = None;
        assert_eq!(detector.effective_bit_depth(), None);
    }

    #[test]
    fn test_detector_number_lossy() {
        assert_eq!(two_module_detector().detector_number_lossy(), "E-32-0123");
    }
}
