//! Goniometer geometry hint.

use serde::Serialize;

/// Single-axis goniometer description.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Goniometer {
    /// Rotation axis in the laboratory frame.
    pub rotation_axis: [f64; 3],
}

impl Goniometer {
    /// Goniometer rotating about a fixed, known axis.
    #[must_use]
    pub fn known_axis(rotation_axis: [f64; 3]) -> Self {
        Self { rotation_axis }
    }
}
