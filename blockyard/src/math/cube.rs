use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::{Axis, FreeCoordinate, FreePoint, GridCoordinate, GridPoint};

/// “A cube”, in this documentation, is a unit cube whose corners' coordinates are integers.
/// This type identifies such a cube by the coordinates of its most negative corner, and is
/// the key type of the [`BlockStore`](crate::store::BlockStore).
///
/// Considered in continuous space, the ranges of coordinates a cube contains are
/// half-open intervals: lower inclusive and upper exclusive.
///
/// Cubes are ordered lexicographically by X, then Y, then Z. This order is used wherever
/// the store yields records in a deterministic sequence.
///
/// On the wire and in configuration, a cube is a 3-element array `[x, y, z]`.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
#[allow(missing_docs, clippy::exhaustive_structs)]
pub struct Cube {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cube {
    /// Equal to `Cube::new(0, 0, 0)`.
    ///
    /// Note that this is not a box _centered_ on the coordinate origin.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    /// Construct `Cube { x, y, z }` from the given coordinates.
    #[inline]
    pub const fn new(x: GridCoordinate, y: GridCoordinate, z: GridCoordinate) -> Self {
        Self { x, y, z }
    }

    /// Convert a point in space to the unit cube that encloses it.
    ///
    /// Such cubes are defined to be half-open intervals on each axis; that is,
    /// an integer coordinate is counted as part of the cube extending positively
    /// from that coordinate.
    ///
    /// If the point coordinates are outside of the numeric range of [`GridCoordinate`],
    /// or are NaN, returns [`None`].
    ///
    /// ```
    /// use blockyard::math::{FreePoint, Cube};
    ///
    /// assert_eq!(Cube::containing(FreePoint::new(1.0, 1.5, -2.5)), Some(Cube::new(1, 1, -3)));
    /// ```
    #[inline]
    pub fn containing(point: FreePoint) -> Option<Self> {
        const MIN_INCLUSIVE: FreeCoordinate = GridCoordinate::MIN as FreeCoordinate;
        const MAX_EXCLUSIVE: FreeCoordinate = GridCoordinate::MAX as FreeCoordinate + 1.0;

        let FreePoint { x, y, z, .. } = point;

        // Written with `&` so that NaN fails every comparison rather than short-circuiting.
        if (MIN_INCLUSIVE <= x)
            & (MIN_INCLUSIVE <= y)
            & (MIN_INCLUSIVE <= z)
            & (x < MAX_EXCLUSIVE)
            & (y < MAX_EXCLUSIVE)
            & (z < MAX_EXCLUSIVE)
        {
            Some(Self {
                x: x.floor() as GridCoordinate,
                y: y.floor() as GridCoordinate,
                z: z.floor() as GridCoordinate,
            })
        } else {
            None
        }
    }

    /// Returns the corner of this cube with the most negative coordinates, as a
    /// floating-point position.
    #[inline]
    pub fn lower_bounds_free(self) -> FreePoint {
        FreePoint::new(self.x.into(), self.y.into(), self.z.into())
    }

    /// Returns the center of this cube.
    #[inline]
    pub fn center(self) -> FreePoint {
        let Self { x, y, z } = self;
        FreePoint::new(
            FreeCoordinate::from(x) + 0.5,
            FreeCoordinate::from(y) + 0.5,
            FreeCoordinate::from(z) + 0.5,
        )
    }

    /// Returns this cube with the coordinate on `axis` replaced.
    #[must_use]
    #[inline]
    pub fn with(mut self, axis: Axis, value: GridCoordinate) -> Self {
        self[axis] = value;
        self
    }
}

impl fmt::Debug for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { x, y, z } = self;
        write!(f, "({x:+}, {y:+}, {z:+})")
    }
}

impl Ord for Cube {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .cmp(&other.x)
            .then(self.y.cmp(&other.y))
            .then(self.z.cmp(&other.z))
    }
}
impl PartialOrd for Cube {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<[GridCoordinate; 3]> for Cube {
    #[inline]
    fn from([x, y, z]: [GridCoordinate; 3]) -> Self {
        Self { x, y, z }
    }
}
impl From<Cube> for [GridCoordinate; 3] {
    #[inline]
    fn from(Cube { x, y, z }: Cube) -> [GridCoordinate; 3] {
        [x, y, z]
    }
}
impl From<GridPoint> for Cube {
    #[inline]
    fn from(point: GridPoint) -> Self {
        Self::new(point.x, point.y, point.z)
    }
}

mod index {
    use super::*;
    use std::ops;

    impl ops::Index<Axis> for Cube {
        type Output = GridCoordinate;
        #[inline]
        fn index(&self, index: Axis) -> &Self::Output {
            match index {
                Axis::X => &self.x,
                Axis::Y => &self.y,
                Axis::Z => &self.z,
            }
        }
    }
    impl ops::IndexMut<Axis> for Cube {
        #[inline]
        fn index_mut(&mut self, index: Axis) -> &mut Self::Output {
            match index {
                Axis::X => &mut self.x,
                Axis::Y => &mut self.y,
                Axis::Z => &mut self.z,
            }
        }
    }
}

impl Serialize for Cube {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let &Cube { x, y, z } = self;

        [x, y, z].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cube {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y, z] = <[i32; 3]>::deserialize(deserializer)?;
        Ok(Cube::new(x, y, z))
    }
}
