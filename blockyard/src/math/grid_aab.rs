//! Axis-aligned integer-coordinate box volumes ([`GridAab`]).

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::{Axis, Cube, GridCoordinate, GridPoint};

/// An axis-aligned box with integer coordinates, whose volume is made up of whole
/// [`Cube`]s.
///
/// Each axis is a half-open range: the cube at `lower_bounds` is contained, the cube at
/// `upper_bounds` is not.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct GridAab {
    lower_bounds: GridPoint,
    /// Constructor checks ensure this is not smaller than `lower_bounds`.
    upper_bounds: GridPoint,
}

impl GridAab {
    /// Constructs a [`GridAab`] from inclusive lower bounds and exclusive upper bounds.
    ///
    /// Panics if any of the `upper_bounds` are less than the `lower_bounds`.
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<GridPoint>,
        upper_bounds: impl Into<GridPoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        assert!(
            Axis::ALL
                .into_iter()
                .all(|axis| lower_bounds[axis] <= upper_bounds[axis]),
            "GridAab bounds are inverted: lower {lower_bounds:?} upper {upper_bounds:?}"
        );
        Self {
            lower_bounds,
            upper_bounds,
        }
    }

    /// Inclusive lower bounds on cube coordinates.
    #[inline]
    pub fn lower_bounds(&self) -> GridPoint {
        self.lower_bounds
    }

    /// Exclusive upper bounds on cube coordinates.
    #[inline]
    pub fn upper_bounds(&self) -> GridPoint {
        self.upper_bounds
    }

    /// The range of cube coordinates on the given axis.
    ///
    /// ```
    /// use blockyard::math::{Axis, GridAab};
    ///
    /// let b = GridAab::from_lower_upper([0, 0, -2], [10, 3, 2]);
    /// assert_eq!(b.axis_range(Axis::Z), -2..2);
    /// ```
    #[inline]
    pub fn axis_range(&self, axis: Axis) -> Range<GridCoordinate> {
        (self.lower_bounds[axis])..(self.upper_bounds[axis])
    }

    /// Returns whether the box contains no cubes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        Axis::ALL
            .into_iter()
            .any(|axis| self.axis_range(axis).is_empty())
    }

    /// Returns whether the box includes the given cube position in its volume.
    #[inline]
    pub fn contains_cube(&self, cube: Cube) -> bool {
        Axis::ALL
            .into_iter()
            .all(|axis| self.axis_range(axis).contains(&cube[axis]))
    }

    /// Returns a copy of this box with the range on `axis` replaced.
    ///
    /// Panics if the range is inverted.
    #[must_use]
    #[track_caller]
    pub fn with_axis_range(self, axis: Axis, range: Range<GridCoordinate>) -> Self {
        let mut lower = self.lower_bounds;
        let mut upper = self.upper_bounds;
        lower[axis] = range.start;
        upper[axis] = range.end;
        Self::from_lower_upper(lower, upper)
    }

    /// Iterate over all cubes that this contains, in X-major then Y then Z order
    /// (the same order as [`Cube`]'s [`Ord`] implementation).
    pub fn interior_iter(self) -> impl Iterator<Item = Cube> {
        let ys = self.axis_range(Axis::Y);
        let zs = self.axis_range(Axis::Z);
        self.axis_range(Axis::X).flat_map(move |x| {
            let zs = zs.clone();
            ys.clone()
                .flat_map(move |y| zs.clone().map(move |z| Cube::new(x, y, z)))
        })
    }
}

impl fmt::Debug for GridAab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GridAab")
            .field(&self.axis_range(Axis::X))
            .field(&self.axis_range(Axis::Y))
            .field(&self.axis_range(Axis::Z))
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct GridAabSer {
    lower: [GridCoordinate; 3],
    upper: [GridCoordinate; 3],
}

impl Serialize for GridAab {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GridAabSer {
            lower: self.lower_bounds.to_array(),
            upper: self.upper_bounds.to_array(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GridAab {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let GridAabSer { lower, upper } = GridAabSer::deserialize(deserializer)?;
        if Axis::ALL.into_iter().any(|axis| lower[axis] > upper[axis]) {
            return Err(serde::de::Error::custom(format!(
                "GridAab bounds are inverted: lower {lower:?} upper {upper:?}"
            )));
        }
        Ok(GridAab::from_lower_upper(lower, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn interior_iter_order_matches_cube_ord() {
        let b = GridAab::from_lower_upper([0, 0, 0], [2, 2, 2]);
        let cubes: Vec<Cube> = b.interior_iter().collect();
        let mut sorted = cubes.clone();
        sorted.sort();
        assert_eq!(cubes.len(), 8);
        assert_eq!(cubes, sorted);
    }

    #[test]
    fn empty_box() {
        let b = GridAab::from_lower_upper([0, 0, 0], [3, 0, 3]);
        assert!(b.is_empty());
        assert_eq!(b.interior_iter().count(), 0);
        assert!(!b.contains_cube(Cube::ORIGIN));
    }

    #[test]
    #[should_panic = "GridAab bounds are inverted"]
    fn inverted_panics() {
        GridAab::from_lower_upper([1, 0, 0], [0, 1, 1]);
    }

    #[test]
    fn serde_form() {
        let b = GridAab::from_lower_upper([0, 1, 2], [3, 4, 5]);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"{"lower":[0,1,2],"upper":[3,4,5]}"#);
        assert_eq!(serde_json::from_str::<GridAab>(&json).unwrap(), b);
        assert!(serde_json::from_str::<GridAab>(r#"{"lower":[1,0,0],"upper":[0,1,1]}"#).is_err());
    }

    #[test]
    fn debug() {
        assert_eq!(
            format!("{:?}", GridAab::from_lower_upper([0, 1, 2], [3, 4, 5])),
            "GridAab(0..3, 1..4, 2..5)"
        );
    }
}
