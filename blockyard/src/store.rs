//! [`BlockStore`], the authoritative map from [`Cube`] to [`BlockRecord`].

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;

use crate::block::{BlockId, BlockRecord, BlockType, CollisionRules};
use crate::math::{Cube, FreeCoordinate, FreePoint, GridCoordinate};

#[cfg(test)]
mod tests;

/// Container for the world's [`BlockRecord`]s, and an index of the identified ones.
///
/// Cubes with no record are empty space. Records are kept sorted by position, so every
/// method that returns multiple records returns them in [`Cube`]'s ordering (X, then Y,
/// then Z), and two stores with equal contents iterate identically.
///
/// Every record carrying a [`BlockId`] has exactly one entry in the id index, pointing
/// at that record's position; all mutating methods maintain this.
#[derive(Clone, Default)]
pub struct BlockStore {
    records: BTreeMap<Cube, BlockRecord>,
    ids: HashMap<BlockId, Cube>,
    rules: CollisionRules,
}

impl BlockStore {
    /// Constructs an empty store with default collision behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an empty store which uses the given collision overrides for
    /// [`BlockStore::put()`].
    pub fn with_rules(rules: CollisionRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Returns the record at `position`, if any.
    #[inline]
    pub fn get(&self, position: impl Into<Cube>) -> Option<&BlockRecord> {
        self.records.get(&position.into())
    }

    /// Returns whether there is a record at `position`.
    #[inline]
    pub fn contains(&self, position: Cube) -> bool {
        self.records.contains_key(&position)
    }

    /// Places a block of the given type at `position`, replacing any existing record.
    ///
    /// The new record's collision is [`BlockStore::derive_collision()`] of its type.
    /// Returns the record that was replaced.
    ///
    /// Fails, leaving the store unchanged, if `block_id` is already used by a record at a
    /// different position.
    pub fn put(
        &mut self,
        position: impl Into<Cube>,
        block_type: BlockType,
        block_id: Option<BlockId>,
    ) -> Result<Option<BlockRecord>, PutError> {
        let record = BlockRecord::new(position, block_type)
            .with_collision(self.derive_collision(block_type))
            .with_id(block_id);
        self.insert(record)
    }

    /// Places the given record at its position, replacing any existing record, and
    /// keeping the record's own collision setting.
    ///
    /// Fails in the same way as [`BlockStore::put()`].
    pub fn insert(&mut self, record: BlockRecord) -> Result<Option<BlockRecord>, PutError> {
        let position = record.position();
        if let Some(id) = record.block_id() {
            if let Some(&existing) = self.ids.get(id) {
                if existing != position {
                    return Err(PutError::DuplicateBlockId {
                        block_id: id.clone(),
                        existing,
                    });
                }
            }
        }

        let new_id = record.block_id().cloned();
        let previous = self.records.insert(position, record);
        if let Some(old_id) = previous.as_ref().and_then(BlockRecord::block_id) {
            self.ids.remove(old_id);
        }
        if let Some(new_id) = new_id {
            self.ids.insert(new_id, position);
        }
        Ok(previous)
    }

    /// Removes and returns the record at `position`, if any, along with its id index entry.
    pub fn remove(&mut self, position: impl Into<Cube>) -> Option<BlockRecord> {
        let removed = self.records.remove(&position.into())?;
        if let Some(id) = removed.block_id() {
            self.ids.remove(id);
        }
        Some(removed)
    }

    /// Moves the record at `from`, including its id, to `to`.
    ///
    /// Any record already at `to` is removed and returned. Relocating a record onto its
    /// own position does nothing.
    pub fn relocate(&mut self, from: Cube, to: Cube) -> Result<Option<BlockRecord>, RelocateError> {
        if !self.records.contains_key(&from) {
            return Err(RelocateError::NoSource(from));
        }
        if from == to {
            return Ok(None);
        }

        let displaced = self.remove(to);
        let Some(moving) = self.records.remove(&from) else {
            unreachable!("presence was checked above");
        };
        if let Some(id) = moving.block_id() {
            self.ids.insert(id.clone(), to);
        }
        self.records.insert(to, moving.with_position(to));
        Ok(displaced)
    }

    /// Returns the position of the record with the given id.
    #[inline]
    pub fn lookup_by_id(&self, block_id: &BlockId) -> Option<Cube> {
        self.ids.get(block_id).copied()
    }

    /// Returns the record with the given id.
    pub fn get_by_id(&self, block_id: &BlockId) -> Option<&BlockRecord> {
        self.get(self.lookup_by_id(block_id)?)
    }

    /// Returns all records whose cube coordinates, taken as a point, lie within `radius`
    /// of `center` (inclusive), in positional order.
    ///
    /// A negative or NaN `radius` matches nothing.
    pub fn query_region(
        &self,
        center: FreePoint,
        radius: FreeCoordinate,
    ) -> impl Iterator<Item = &BlockRecord> + '_ {
        // Narrow by X using the ordering of the map, then filter exactly.
        let x_low = (center.x - radius).ceil() as GridCoordinate;
        let x_high = (center.x + radius).floor() as GridCoordinate;
        let candidates = if radius >= 0.0 && x_low <= x_high {
            Some(self.records.range(
                Cube::new(x_low, GridCoordinate::MIN, GridCoordinate::MIN)
                    ..=Cube::new(x_high, GridCoordinate::MAX, GridCoordinate::MAX),
            ))
        } else {
            None
        };
        let radius_squared = radius * radius;
        candidates
            .into_iter()
            .flatten()
            .filter_map(move |(cube, record)| {
                let distance_squared = (cube.lower_bounds_free() - center).square_length();
                (distance_squared <= radius_squared).then_some(record)
            })
    }

    /// Iterates over all records in positional order.
    pub fn records(&self) -> impl ExactSizeIterator<Item = &BlockRecord> + '_ {
        self.records.values()
    }

    /// Number of records in the store.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the store has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the collision a newly [put](Self::put) block of `block_type` gets.
    pub fn derive_collision(&self, block_type: BlockType) -> bool {
        self.rules.derive(block_type)
    }

    /// Panics if the id index does not exactly mirror the identified records.
    #[cfg(test)]
    #[track_caller]
    pub(crate) fn consistency_check(&self) {
        let mut identified = 0;
        for (&cube, record) in &self.records {
            assert_eq!(cube, record.position(), "record stored under wrong key");
            if let Some(id) = record.block_id() {
                identified += 1;
                assert_eq!(self.ids.get(id), Some(&cube), "index missing {id}");
            }
            assert!(
                !record.collision_enabled() || record.block_type().can_collide(),
                "{record:?} collides"
            );
        }
        assert_eq!(self.ids.len(), identified, "index has stale entries");
    }
}

impl fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Records can be numerous; summarize.
        f.debug_struct("BlockStore")
            .field("len", &self.records.len())
            .field("identified", &self.ids.len())
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Error from [`BlockStore::put()`] or [`BlockStore::insert()`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PutError {
    /// The id is already owned by the record at `existing`.
    #[error("block id {block_id} is already in use at {existing:?}")]
    DuplicateBlockId {
        /// The id which was requested.
        block_id: BlockId,
        /// Position of the record which owns the id.
        existing: Cube,
    },
}

/// Error from [`BlockStore::relocate()`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RelocateError {
    /// There is no record at the source position.
    #[error("there is no block at {0:?} to move")]
    NoSource(Cube),
}
