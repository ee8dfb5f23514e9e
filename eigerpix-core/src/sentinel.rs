//! Overflow/underflow sentinel remapping.
//!
//! The detector marks gap/inactive and saturated pixels with the two
//! highest codes of its pixel range. These are rewritten to `-1` and `-2`.

use crate::error::{Error, Result};
use ndarray::{ArrayBase, DataMut, Dimension};

/// Replacement for pixels reported as inactive or in a module gap.
pub const INACTIVE_PIXEL: i64 = -1;

/// Replacement for pixels reported as saturated.
pub const SATURATED_PIXEL: i64 = -2;

/// Sentinel codes for one pixel bit depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SentinelPolicy {
    top: i64,
}

impl SentinelPolicy {
    /// Builds the policy for a bit depth.
    ///
    /// 32-bit images are signed, so `top = 2^31`; narrower images are
    /// unsigned with `top = 2^bit_depth`.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedBitDepth`] for zero or for depths whose
    /// codes do not fit in `i64`.
    pub fn for_bit_depth(bit_depth: u32) -> Result<Self> {
        let top = match bit_depth {
            32 => 1_i64 << 31,
            1..=62 => 1_i64 << bit_depth,
            _ => return Err(Error::UnsupportedBitDepth(bit_depth)),
        };
        Ok(Self { top })
    }

    /// Policy for an optional bit depth; `None` when the depth is unknown.
    ///
    /// # Errors
    /// See [`SentinelPolicy::for_bit_depth`].
    pub fn for_optional_bit_depth(bit_depth: Option<u32>) -> Result<Option<Self>> {
        bit_depth.map(Self::for_bit_depth).transpose()
    }

    /// `2^bits` boundary of the pixel range.
    #[must_use]
    pub fn top(&self) -> i64 {
        self.top
    }

    /// Code reported for inactive pixels (`top - 1`).
    #[must_use]
    pub fn inactive_code(&self) -> i64 {
        self.top - 1
    }

    /// Code reported for saturated pixels (`top - 2`).
    #[must_use]
    pub fn saturated_code(&self) -> i64 {
        self.top - 2
    }

    /// Maps one pixel value.
    #[inline]
    #[must_use]
    pub fn map_value(&self, value: i64) -> i64 {
        if value == self.top - 1 {
            INACTIVE_PIXEL
        } else if value == self.top - 2 {
            SATURATED_PIXEL
        } else {
            value
        }
    }

    /// Rewrites sentinel codes of one array in place.
    pub fn remap<S, D>(&self, array: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = i64>,
        D: Dimension,
    {
        array.mapv_inplace(|value| self.map_value(value));
    }

    /// Rewrites sentinel codes of every module array, preserving order.
    pub fn remap_all<S, D>(&self, arrays: &mut [ArrayBase<S, D>])
    where
        S: DataMut<Elem = i64>,
        D: Dimension,
    {
        for array in arrays {
            self.remap(array);
        }
    }
}
