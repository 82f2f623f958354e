use std::fmt;

use euclid::Point3D;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::{Axis, FreeCoordinate, FreePoint, FreeVector, GridAab, GridCoordinate};

/// Axis-Aligned Box data type.
///
/// Note that this has continuous coordinates, and a discrete analogue exists as
/// [`GridAab`].
///
/// Bodies use an [`Aab`] relative to their position as their collision volume; see
/// [`Body`](crate::physics::Body).
#[derive(Copy, Clone, PartialEq)]
pub struct Aab {
    // The constructor's `lower <= upper` checks reject NaNs.
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// Constructs an [`Aab`] from individual coordinates.
    #[inline]
    #[track_caller]
    pub fn new(
        lx: FreeCoordinate,
        hx: FreeCoordinate,
        ly: FreeCoordinate,
        hy: FreeCoordinate,
        lz: FreeCoordinate,
        hz: FreeCoordinate,
    ) -> Self {
        Self::from_lower_upper(Point3D::new(lx, ly, lz), Point3D::new(hx, hy, hz))
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<FreePoint>,
        upper_bounds: impl Into<FreePoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        match Self::checked_from_lower_upper(lower_bounds, upper_bounds) {
            Some(aab) => aab,
            None => panic!(
                "invalid AAB points that are misordered or NaN: \
                lower {lower_bounds:?} upper {upper_bounds:?}"
            ),
        }
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Returns [`None`] if the points are not in the proper order or if they are NaN.
    pub fn checked_from_lower_upper(
        lower_bounds: FreePoint,
        upper_bounds: FreePoint,
    ) -> Option<Self> {
        if lower_bounds.x <= upper_bounds.x
            && lower_bounds.y <= upper_bounds.y
            && lower_bounds.z <= upper_bounds.z
        {
            Some(Self {
                lower_bounds,
                upper_bounds,
            })
        } else {
            None
        }
    }

    /// A box standing on its own origin: centered horizontally on the X and Z axes, and
    /// extending from 0 to `height` on the Y axis.
    ///
    /// This is the usual shape of a body whose position is its feet.
    ///
    /// ```
    /// use blockyard::math::Aab;
    ///
    /// assert_eq!(
    ///     Aab::standing(0.4, 1.8),
    ///     Aab::new(-0.4, 0.4, 0.0, 1.8, -0.4, 0.4)
    /// );
    /// ```
    #[track_caller]
    pub fn standing(half_width: FreeCoordinate, height: FreeCoordinate) -> Self {
        Self::new(-half_width, half_width, 0.0, height, -half_width, half_width)
    }

    /// The most negative corner of the box, as a [`Point3D`].
    #[inline]
    pub const fn lower_bounds_p(&self) -> FreePoint {
        self.lower_bounds
    }

    /// The most positive corner of the box, as a [`Point3D`].
    #[inline]
    pub const fn upper_bounds_p(&self) -> FreePoint {
        self.upper_bounds
    }

    /// Size of the box on the given axis.
    #[inline]
    pub fn axis_size(&self, axis: Axis) -> FreeCoordinate {
        self.upper_bounds[axis] - self.lower_bounds[axis]
    }

    /// Translate this box by the specified offset.
    ///
    /// Note that due to rounding error, the result may not have the same size.
    #[inline]
    #[must_use]
    #[track_caller] // in case of NaN
    pub fn translate(self, offset: FreeVector) -> Self {
        Self::from_lower_upper(self.lower_bounds + offset, self.upper_bounds + offset)
    }

    /// Construct the [`GridAab`] containing all cubes this [`Aab`] intersects.
    ///
    /// Grid cubes are considered to be half-open ranges, so, for example, an [`Aab`] with
    /// exact integer bounds on some axis will convert exactly as one might intuitively
    /// expect, while non-integer bounds will be rounded outward:
    ///
    /// ```
    /// use blockyard::math::{Aab, Cube, GridAab};
    ///
    /// let grid_aab = Aab::from_lower_upper([3.0, 0.5, 0.0], [5.0, 1.5, 1.0])
    ///     .round_up_to_grid();
    /// assert_eq!(grid_aab, GridAab::from_lower_upper([3, 0, 0], [5, 2, 1]));
    ///
    /// assert!(grid_aab.contains_cube(Cube::new(4, 1, 0)));
    /// assert!(!grid_aab.contains_cube(Cube::new(5, 1, 0)));
    /// ```
    ///
    /// If the floating-point coordinates are out of [`GridCoordinate`]'s numeric range,
    /// then they will be clamped (`as` conversion from float saturates).
    #[inline]
    pub fn round_up_to_grid(self) -> GridAab {
        GridAab::from_lower_upper(
            self.lower_bounds.map(|c| c.floor() as GridCoordinate),
            self.upper_bounds.map(|c| c.ceil() as GridCoordinate),
        )
    }
}

impl fmt::Debug for Aab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Aab {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("Aab")
            .field(&(l.x..=u.x))
            .field(&(l.y..=u.y))
            .field(&(l.z..=u.z))
            .finish()
    }
}

/// [`Aab`] rejects NaN values, so it can implement [`Eq`]
/// even though it contains floats.
impl Eq for Aab {}

#[derive(Debug, Deserialize, Serialize)]
struct AabSer {
    lower: [f64; 3],
    upper: [f64; 3],
}

impl Serialize for Aab {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        AabSer {
            lower: self.lower_bounds_p().to_array(),
            upper: self.upper_bounds_p().to_array(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Aab {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let AabSer { lower, upper } = AabSer::deserialize(deserializer)?;
        Aab::checked_from_lower_upper(lower.into(), upper.into())
            .ok_or_else(|| serde::de::Error::custom("invalid AAB"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;

    #[test]
    fn checked_rejects_nan_and_inversion() {
        assert_eq!(
            Aab::checked_from_lower_upper(point3(0., 0., 0.), point3(1., 1., f64::NAN)),
            None
        );
        assert_eq!(
            Aab::checked_from_lower_upper(point3(0., 2., 0.), point3(1., 1., 1.)),
            None
        );
        assert!(Aab::checked_from_lower_upper(point3(0., 1., 0.), point3(0., 1., 0.)).is_some());
    }

    #[test]
    #[should_panic = "invalid AAB points that are misordered or NaN: lower (0.0, 0.0, 0.0) upper (1.0, 1.0, NaN)"]
    fn new_panic_message() {
        Aab::from_lower_upper([0., 0., 0.], [1., 1., f64::NAN]);
    }

    #[test]
    fn round_up_exact_bounds_are_half_open() {
        // A box whose faces lie exactly on cube boundaries touches no cube beyond them.
        assert_eq!(
            Aab::new(1., 2., 0., 1.8, -0.5, 0.5).round_up_to_grid(),
            GridAab::from_lower_upper([1, 0, -1], [2, 2, 1])
        );
    }

    #[test]
    fn serde_roundtrip_rejects_inverted() {
        let json = r#"{"lower":[1,0,0],"upper":[0,1,1]}"#;
        assert!(serde_json::from_str::<Aab>(json).is_err());
        let aab = Aab::standing(0.25, 1.5);
        let json = serde_json::to_string(&aab).unwrap();
        assert_eq!(serde_json::from_str::<Aab>(&json).unwrap(), aab);
    }
}
