//! Algorithms for resolving movement of boxes through the block grid.

use std::ops;

use serde::{Deserialize, Serialize};

use crate::block::BlockRecord;
use crate::config::WorldConfig;
use crate::math::{Aab, Axis, Cube, FreeCoordinate, FreePoint, GridCoordinate};
use crate::physics::POSITION_EPSILON;
use crate::store::BlockStore;

/// Abstraction over voxel sources that collision resolution can use, i.e.
/// [`BlockStore`] and anything a test wants to construct.
pub trait CollisionSpace {
    /// Returns whether the cube obstructs movement. Cubes with no block must return
    /// `false`.
    fn collides(&self, cube: Cube) -> bool;
}

impl CollisionSpace for BlockStore {
    #[inline]
    fn collides(&self, cube: Cube) -> bool {
        self.get(cube).is_some_and(BlockRecord::collision_enabled)
    }
}

impl<T: CollisionSpace + ?Sized> CollisionSpace for &T {
    fn collides(&self, cube: Cube) -> bool {
        (**self).collides(cube)
    }
}

/// The region bodies are confined to: `[0, size]` on X and Z, and `[0, height]` on Y.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct WorldBounds {
    /// Horizontal extent.
    pub size: FreeCoordinate,
    /// Vertical extent.
    pub height: FreeCoordinate,
}

impl WorldBounds {
    /// The bounds of a world with the given configuration.
    pub fn from_config(config: &WorldConfig) -> Self {
        Self {
            size: FreeCoordinate::from(config.world_size),
            height: FreeCoordinate::from(config.world_height),
        }
    }

    /// The upper bound on `axis`. The lower bound is always zero.
    pub fn upper(&self, axis: Axis) -> FreeCoordinate {
        match axis {
            Axis::Y => self.height,
            Axis::X | Axis::Z => self.size,
        }
    }
}

/// Per-axis record of whether a movement was obstructed or clamped.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[expect(clippy::exhaustive_structs)]
#[allow(missing_docs)]
pub struct Collided {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Collided {
    /// Returns whether any axis collided.
    pub fn any(self) -> bool {
        self.x || self.y || self.z
    }
}

impl ops::Index<Axis> for Collided {
    type Output = bool;
    fn index(&self, axis: Axis) -> &bool {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}
impl ops::IndexMut<Axis> for Collided {
    fn index_mut(&mut self, axis: Axis) -> &mut bool {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

/// Moves a body whose collision volume is `collision_box` (relative to its position)
/// from `from` towards `to`, and returns where it actually ends up and which axes were
/// obstructed.
///
/// The target is first clamped to `bounds` so that the whole box stays inside the world;
/// non-finite target coordinates are replaced with the starting coordinate. Then the box
/// is moved along X, then Y, then Z, each time stopping just short of the first
/// colliding cube it would enter. Cubes the box already intersects when an axis move
/// begins never obstruct it, so a body embedded in a block can always leave.
///
/// `from` is assumed to be a previously resolved position.
pub fn resolve_move<S>(
    space: &S,
    bounds: WorldBounds,
    collision_box: Aab,
    from: FreePoint,
    to: FreePoint,
) -> (FreePoint, Collided)
where
    S: CollisionSpace + ?Sized,
{
    let mut collided = Collided::default();

    let mut target = to;
    for axis in Axis::ALL {
        if !target[axis].is_finite() {
            target[axis] = from[axis];
            collided[axis] = true;
        }
        let low = -collision_box.lower_bounds_p()[axis];
        let high = (bounds.upper(axis) - collision_box.upper_bounds_p()[axis]).max(low);
        let clamped = target[axis].clamp(low, high);
        if clamped != target[axis] {
            target[axis] = clamped;
            collided[axis] = true;
        }
    }

    let mut position = from;
    for axis in Axis::ALL {
        let (reached, obstructed) =
            sweep_axis(space, collision_box, position, axis, target[axis]);
        position[axis] = reached;
        collided[axis] |= obstructed;
    }

    (position, collided)
}

/// Moves the box at `position` along `axis` alone until its coordinate on that axis is
/// `target`, or until it would enter a colliding cube.
///
/// Returns the coordinate reached and whether the move was obstructed.
fn sweep_axis<S>(
    space: &S,
    collision_box: Aab,
    position: FreePoint,
    axis: Axis,
    target: FreeCoordinate,
) -> (FreeCoordinate, bool)
where
    S: CollisionSpace + ?Sized,
{
    let start = position[axis];
    if target == start {
        return (start, false);
    }
    let box_lower = collision_box.lower_bounds_p()[axis];
    let box_upper = collision_box.upper_bounds_p()[axis];

    // The cross-section of cubes the box occupies on the other two axes.
    let occupied = collision_box.translate(position.to_vector()).round_up_to_grid();
    let (axis_1, axis_2) = (axis.increment(), axis.decrement());
    let range_1 = occupied.axis_range(axis_1);
    let range_2 = occupied.axis_range(axis_2);
    let layer_collides = |k: GridCoordinate| {
        range_1.clone().any(|c1| {
            range_2.clone().any(|c2| {
                let cube = Cube::ORIGIN.with(axis, k).with(axis_1, c1).with(axis_2, c2);
                space.collides(cube)
            })
        })
    };

    if target > start {
        // Layers of cubes the leading face newly enters. Layers the box already overlaps
        // are excluded by starting at the ceiling of the leading face.
        let first = (start + box_upper).ceil() as GridCoordinate;
        let end = (target + box_upper).ceil() as GridCoordinate;
        for k in first..end {
            if layer_collides(k) {
                let face = FreeCoordinate::from(k);
                let mut stop = face - box_upper - POSITION_EPSILON;
                while stop + box_upper > face {
                    stop = stop.next_down();
                }
                return (stop.max(start), true);
            }
        }
    } else {
        let first = (start + box_lower).floor() as GridCoordinate - 1;
        let end = (target + box_lower).floor() as GridCoordinate - 1;
        for k in (end + 1..=first).rev() {
            if layer_collides(k) {
                let face = FreeCoordinate::from(k) + 1.0;
                let mut stop = face - box_lower + POSITION_EPSILON;
                while stop + box_lower < face {
                    stop = stop.next_up();
                }
                return (stop.min(start), true);
            }
        }
    }
    (target, false)
}
