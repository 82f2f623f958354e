use std::fmt;
use std::time::Duration;

use crate::math::{Aab, FreeCoordinate, FreePoint, FreeVector, Rotation};
use crate::physics::{Collided, CollisionSpace, WorldBounds, resolve_move};

/// An object with a position, velocity, orientation, and collision volume.
/// What it collides with is determined externally.
#[derive(Clone, PartialEq)]
#[non_exhaustive]
pub struct Body {
    /// Position of the bottom center of the body.
    pub position: FreePoint,

    /// Velocity, in position units per second, as observed from the most recent move.
    pub velocity: FreeVector,

    /// Collision volume, defined with `position` as the origin.
    pub collision_box: Aab,

    /// Look direction. This does not affect movement.
    pub rotation: Rotation,
    // When adding a field, don't forget to expand the Debug impl.
}

impl fmt::Debug for Body {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Body")
            .field("position", &self.position.to_array())
            .field("velocity", &self.velocity.to_array())
            .field("collision_box", &self.collision_box)
            .field("rotation", &self.rotation)
            .finish()
    }
}

impl Body {
    /// Constructs a [`Body`] at rest.
    pub fn new(position: impl Into<FreePoint>, collision_box: Aab) -> Self {
        Self {
            position: position.into(),
            velocity: FreeVector::zero(),
            collision_box,
            rotation: Rotation::default(),
        }
    }

    /// Moves the body towards `target` as far as `space` and `bounds` allow, adopts
    /// `rotation` (if finite), and updates the velocity from the displacement actually
    /// achieved over `elapsed`.
    pub fn move_to<S>(
        &mut self,
        space: &S,
        bounds: WorldBounds,
        target: FreePoint,
        rotation: Rotation,
        elapsed: Duration,
    ) -> Collided
    where
        S: CollisionSpace + ?Sized,
    {
        let (resolved, collided) =
            resolve_move(space, bounds, self.collision_box, self.position, target);

        let seconds: FreeCoordinate = elapsed.as_secs_f64();
        self.velocity = if seconds > 0.0 {
            (resolved - self.position) / seconds
        } else {
            FreeVector::zero()
        };
        self.position = resolved;
        if rotation.is_finite() {
            self.rotation = Rotation::new(
                rotation.yaw.rem_euclid(360.0),
                rotation.pitch.clamp(-90.0, 90.0),
            );
        }

        collided
    }
}
