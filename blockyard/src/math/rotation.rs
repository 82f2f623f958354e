use serde::{Deserialize, Serialize};

use crate::math::{FreeCoordinate, FreeVector};

/// Orientation of a viewer or entity, as yaw and pitch angles in degrees.
///
/// On the wire this is the object `{"yaw": …, "pitch": …}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[expect(clippy::exhaustive_structs)]
pub struct Rotation {
    /// Degrees clockwise (seen from above) from looking towards −Z.
    ///
    /// The preferred range is 0 inclusive to 360 exclusive.
    pub yaw: FreeCoordinate,

    /// Degrees downward from looking horizontally.
    ///
    /// The preferred range is −90 to 90, inclusive.
    pub pitch: FreeCoordinate,
}

impl Rotation {
    /// Constructs a [`Rotation`] from yaw and pitch in degrees.
    pub const fn new(yaw: FreeCoordinate, pitch: FreeCoordinate) -> Self {
        Self { yaw, pitch }
    }

    /// Returns whether both angles are finite.
    pub fn is_finite(self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite()
    }

    /// Unit vector in the direction being looked at.
    pub fn forward(self) -> FreeVector {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        FreeVector::new(sin_yaw * cos_pitch, -sin_pitch, -cos_yaw * cos_pitch)
    }

    /// Unit vector pointing to the viewer's right. Always horizontal.
    pub fn right(self) -> FreeVector {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        FreeVector::new(cos_yaw, 0.0, sin_yaw)
    }

    /// Unit vector pointing to the viewer's up, perpendicular to [`Self::forward()`]
    /// and [`Self::right()`].
    pub fn up(self) -> FreeVector {
        self.right().cross(self.forward())
    }
}
