//! Mathematical types shared by the store, collision, and query engines.

use euclid::{Point3D, Vector3D};

mod aab;
pub use aab::*;
mod axis;
pub use axis::*;
mod cube;
pub use cube::Cube;
mod grid_aab;
pub use grid_aab::*;
mod rotation;
pub use rotation::*;

/// Coordinates that are locked to the cube grid.
pub type GridCoordinate = i32;

/// Positions that are locked to the cube grid.
pub type GridPoint = Point3D<GridCoordinate, Cube>;

/// Coordinates that are not locked to the cube grid.
///
/// Note: Because `GridCoordinate = i32` and `FreeCoordinate = f64`, which has
/// more than 32 bits of mantissa, the infallible conversion
/// `From<GridCoordinate> for FreeCoordinate` exists, which is often convenient.
pub type FreeCoordinate = f64;

/// Positions that are not locked to the cube grid but may interact with it.
pub type FreePoint = Point3D<FreeCoordinate, Cube>;

/// Vectors that are not locked to the cube grid but may interact with it.
pub type FreeVector = Vector3D<FreeCoordinate, Cube>;

/// Returns whether every component of `point` is finite (neither NaN nor infinite).
pub(crate) fn is_finite_point(point: FreePoint) -> bool {
    Axis::ALL.into_iter().all(|axis| point[axis].is_finite())
}
