//! Initial world contents.
//!
//! Procedural generation proper is done elsewhere; this module only defines the
//! [`TerrainSource`] interface and the simple layered terrain the server starts with.

use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockRecord, BlockType};
use crate::config::WorldConfig;
use crate::math::{Axis, Cube, GridAab, GridCoordinate};
use crate::store::{BlockStore, PutError};

/// Supplies the initial records of a world.
pub trait TerrainSource {
    /// Inserts this terrain's records into `store`, which is normally empty.
    ///
    /// Implementations must only place blocks inside the bounds `config` describes.
    fn populate(&self, config: &WorldConfig, store: &mut BlockStore) -> Result<(), PutError>;
}

/// Terrain with no blocks at all.
#[derive(Clone, Copy, Debug, Default)]
#[expect(clippy::exhaustive_structs)]
pub struct EmptyTerrain;

impl TerrainSource for EmptyTerrain {
    fn populate(&self, _: &WorldConfig, _: &mut BlockStore) -> Result<(), PutError> {
        Ok(())
    }
}

/// Flat layered terrain covering the whole horizontal extent of the world: bedrock at
/// `y = 0`, then stone, then `dirt_depth` layers of dirt, then grass at `surface_y`.
///
/// Optionally, the blocks within `pool` are replaced with water, and camera markers with
/// ids `camera_0`, `camera_1`, … are placed at each of `cameras`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct FlatTerrain {
    /// Height of the grass layer.
    pub surface_y: GridCoordinate,
    /// Number of dirt layers under the grass.
    pub dirt_depth: GridCoordinate,
    /// Region to fill with water instead of terrain.
    pub pool: Option<GridAab>,
    /// Positions of camera markers.
    pub cameras: Vec<Cube>,
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self {
            surface_y: 4,
            dirt_depth: 2,
            pool: None,
            cameras: Vec::new(),
        }
    }
}

impl FlatTerrain {
    fn layer_type(&self, y: GridCoordinate) -> Option<BlockType> {
        if y == 0 {
            Some(BlockType::Bedrock)
        } else if y > self.surface_y {
            None
        } else if y == self.surface_y {
            Some(BlockType::Grass)
        } else if y >= self.surface_y - self.dirt_depth {
            Some(BlockType::Dirt)
        } else {
            Some(BlockType::Stone)
        }
    }
}

impl TerrainSource for FlatTerrain {
    fn populate(&self, config: &WorldConfig, store: &mut BlockStore) -> Result<(), PutError> {
        let world = GridAab::from_lower_upper(
            [0, 0, 0],
            [config.world_size, config.world_height, config.world_size],
        );
        let layers_end = (self.surface_y + 1).clamp(0, config.world_height);

        for cube in world.with_axis_range(Axis::Y, 0..layers_end).interior_iter() {
            let in_pool = self.pool.is_some_and(|pool| pool.contains_cube(cube));
            let block_type = if in_pool {
                Some(BlockType::Water)
            } else {
                self.layer_type(cube.y)
            };
            if let Some(block_type) = block_type {
                store.put(cube, block_type, None)?;
            }
        }

        for (i, &cube) in self.cameras.iter().enumerate() {
            if !world.contains_cube(cube) {
                log::warn!("camera {i} at {cube:?} is outside the world; skipping");
                continue;
            }
            let Ok(id) = BlockId::new(&format!("camera_{i}")) else {
                unreachable!("camera ids are valid");
            };
            store.insert(BlockRecord::new(cube, BlockType::Camera).with_id(Some(id)))?;
        }

        log::debug!("flat terrain populated {} blocks", store.len());
        Ok(())
    }
}
