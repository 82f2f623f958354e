//! [`WorldConfig`], the parameters of a world and of its synchronization protocol.

use serde::{Deserialize, Serialize};

use crate::block::CollisionRules;
use crate::math::{Aab, Axis, FreeCoordinate, FreePoint, GridCoordinate, is_finite_point};
use crate::sync::worst_case_chunk_bytes;

/// Parameters of a world, fixed for the lifetime of a [`World`](crate::session::World).
///
/// Deserializing accepts partial input; missing fields take their [`Default`] values.
/// Deserialized configurations should be checked with [`WorldConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct WorldConfig {
    /// Extent of the world on the horizontal axes; positions range over `[0, world_size]`.
    pub world_size: GridCoordinate,

    /// Extent of the world on the Y axis; positions range over `[0, world_height]`.
    pub world_height: GridCoordinate,

    /// Maximum number of records in one `world_chunk` message.
    pub chunk_max: usize,

    /// Upper bound on the serialized size of any single server message.
    pub max_message_bytes: usize,

    /// Field of view used by view queries.
    pub field_of_view: FieldOfView,

    /// Where newly connected entities appear.
    pub spawn: FreePoint,

    /// Collision volume of player entities, relative to their position.
    pub body_box: Aab,

    /// How many incremental updates may be queued for one connection before it is
    /// considered lagging and is resynchronized with a full snapshot.
    pub update_backlog: usize,

    /// Per-block-type collision overrides.
    pub collision_overrides: CollisionRules,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_size: 64,
            world_height: 64,
            chunk_max: 256,
            max_message_bytes: 64 * 1024,
            field_of_view: FieldOfView::default(),
            spawn: FreePoint::new(32.5, 8.0, 32.5),
            body_box: Aab::standing(0.3, 1.8),
            update_backlog: 1024,
            collision_overrides: CollisionRules::default(),
        }
    }
}

impl WorldConfig {
    /// Checks that the configuration describes a usable world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world_size <= 0 {
            return Err(ConfigError::WorldSize(self.world_size));
        }
        if self.world_height <= 0 {
            return Err(ConfigError::WorldHeight(self.world_height));
        }
        if self.chunk_max == 0 {
            return Err(ConfigError::ZeroChunkMax);
        }
        if self.update_backlog == 0 {
            return Err(ConfigError::ZeroBacklog);
        }
        self.field_of_view.validate()?;

        let needed = worst_case_chunk_bytes(self.chunk_max);
        if needed > self.max_message_bytes {
            return Err(ConfigError::ChunkTooLarge {
                chunk_max: self.chunk_max,
                needed,
                max_message_bytes: self.max_message_bytes,
            });
        }

        for axis in Axis::ALL {
            if self.body_box.axis_size(axis) > self.axis_bound(axis) {
                return Err(ConfigError::BodyTooLarge(self.body_box));
            }
        }

        if !is_finite_point(self.spawn)
            || Axis::ALL.into_iter().any(|axis| {
                !(0.0..=self.axis_bound(axis)).contains(&self.spawn[axis])
            })
        {
            return Err(ConfigError::SpawnOutOfBounds(self.spawn));
        }

        Ok(())
    }

    /// The upper bound of positions on the given axis.
    pub fn axis_bound(&self, axis: Axis) -> FreeCoordinate {
        FreeCoordinate::from(match axis {
            Axis::Y => self.world_height,
            Axis::X | Axis::Z => self.world_size,
        })
    }
}

/// Angular extent of the view frustum.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
#[expect(clippy::exhaustive_structs)]
pub struct FieldOfView {
    /// Full horizontal angle, in degrees.
    pub horizontal_degrees: f64,
    /// Full vertical angle, in degrees.
    pub vertical_degrees: f64,
}

impl Default for FieldOfView {
    fn default() -> Self {
        Self {
            horizontal_degrees: 90.0,
            vertical_degrees: 70.0,
        }
    }
}

impl FieldOfView {
    fn validate(&self) -> Result<(), ConfigError> {
        for angle in [self.horizontal_degrees, self.vertical_degrees] {
            // The frustum test divides the cone by tan(angle / 2), which diverges at 180°.
            if !(angle > 0.0 && angle < 180.0) {
                return Err(ConfigError::FieldOfView(angle));
            }
        }
        Ok(())
    }
}

/// Error from [`WorldConfig::validate()`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `world_size` was not positive.
    #[error("world_size must be positive, not {0}")]
    WorldSize(GridCoordinate),
    /// `world_height` was not positive.
    #[error("world_height must be positive, not {0}")]
    WorldHeight(GridCoordinate),
    /// `chunk_max` was zero.
    #[error("chunk_max must be at least 1")]
    ZeroChunkMax,
    /// `update_backlog` was zero.
    #[error("update_backlog must be at least 1")]
    ZeroBacklog,
    /// A field of view angle was outside the open interval (0, 180).
    #[error("field of view angles must be between 0 and 180 degrees exclusive, not {0}")]
    FieldOfView(f64),
    /// A chunk of `chunk_max` records might exceed `max_message_bytes`.
    #[error(
        "a chunk of {chunk_max} records may serialize to {needed} bytes, \
        which exceeds max_message_bytes = {max_message_bytes}"
    )]
    ChunkTooLarge {
        /// Configured records per chunk.
        chunk_max: usize,
        /// Worst-case serialized size of such a chunk.
        needed: usize,
        /// Configured message size limit.
        max_message_bytes: usize,
    },
    /// The body box does not fit inside the world.
    #[error("body_box {0:?} does not fit inside the world")]
    BodyTooLarge(Aab),
    /// The spawn point is not inside the world.
    #[error("spawn point {0:?} is outside the world")]
    SpawnOutOfBounds(FreePoint),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_valid() {
        WorldConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: WorldConfig =
            serde_json::from_str(r#"{"world_size": 16, "spawn": [8.0, 2.0, 8.0]}"#).unwrap();
        assert_eq!(
            config,
            WorldConfig {
                world_size: 16,
                spawn: FreePoint::new(8.0, 2.0, 8.0),
                ..WorldConfig::default()
            }
        );
        config.validate().unwrap();
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(serde_json::from_str::<WorldConfig>(r#"{"wrold_size": 16}"#).is_err());
    }

    #[test]
    fn chunk_must_fit_in_message() {
        let config = WorldConfig {
            chunk_max: 10_000,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChunkTooLarge {
                chunk_max: 10_000,
                ..
            })
        ));
    }

    #[test]
    fn spawn_must_be_inside() {
        let config = WorldConfig {
            spawn: FreePoint::new(100.0, 1.0, 1.0),
            ..WorldConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpawnOutOfBounds(FreePoint::new(100.0, 1.0, 1.0)))
        );
    }

    #[test]
    fn field_of_view_range() {
        let config = WorldConfig {
            field_of_view: FieldOfView {
                horizontal_degrees: 180.0,
                vertical_degrees: 70.0,
            },
            ..WorldConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::FieldOfView(180.0)));
    }
}
