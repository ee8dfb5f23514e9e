//! Per-module array extraction from a full detector frame.

use crate::Result;
use eigerpix_core::detector::ModuleSlice;
use ndarray::{s, Array2, ArrayView2};

/// Pixel array of one module.
pub type ModuleArray = Array2<i64>;

/// Cuts one module out of a full frame.
///
/// With a bit depth of 32 the stored values are reinterpreted as signed
/// 32-bit pixels; other depths pass values through unchanged.
///
/// # Errors
/// Returns [`eigerpix_core::Error::ModuleOutOfBounds`] if the module region
/// exceeds the frame.
#[allow(clippy::cast_possible_truncation)]
pub fn materialize(
    frame: ArrayView2<'_, i64>,
    slice: &ModuleSlice,
    bit_depth: Option<u32>,
) -> Result<ModuleArray> {
    let shape = [frame.nrows(), frame.ncols()];
    if !slice.fits(shape) {
        return Err(eigerpix_core::Error::ModuleOutOfBounds {
            rows: slice.rows.clone(),
            cols: slice.cols.clone(),
            shape,
        }
        .into());
    }

    let view = frame.slice(s![slice.rows.clone(), slice.cols.clone()]);
    let array = if bit_depth == Some(32) {
        view.mapv(|value| i64::from(value as i32))
    } else {
        view.to_owned()
    };
    Ok(array)
}

/// Cuts every module out of a full frame, in slice order.
///
/// # Errors
/// See [`materialize`].
pub fn materialize_modules(
    frame: ArrayView2<'_, i64>,
    slices: &[ModuleSlice],
    bit_depth: Option<u32>,
) -> Result<Vec<ModuleArray>> {
    slices
        .iter()
        .map(|slice| materialize(frame, slice, bit_depth))
        .collect()
}
