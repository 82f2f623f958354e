//! [`BlockRecord`] and the types it is made of.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::math::Cube;

// -------------------------------------------------------------------------------------------------

/// The kind of block occupying a cube.
///
/// Block types fall into four groups, which determine their default collision:
///
/// * empty space ([`BlockType::Air`]) never collides,
/// * liquids ([`BlockType::Water`]) never collide,
/// * terrain solids collide,
/// * actor markers ([`BlockType::Camera`], [`BlockType::Player`]) collide unless
///   overridden, and are the blocks that normally carry a [`BlockId`].
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize, exhaust::Exhaust,
)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum BlockType {
    Air,

    Bedrock,
    Stone,
    Dirt,
    Grass,
    Sand,
    Wood,
    Leaves,
    Glass,

    Water,

    /// Observation point; clients may run view queries from its perspective.
    Camera,
    /// Position marker of a connected player's avatar.
    Player,
}

impl BlockType {
    /// Returns whether this type denotes empty space.
    pub const fn is_empty_space(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Returns whether this type is a traversable liquid.
    pub const fn is_liquid(self) -> bool {
        matches!(self, Self::Water)
    }

    /// Returns whether blocks of this type are permitted to obstruct movement at all.
    ///
    /// This is `false` for empty space and liquids, and no override can change that.
    pub const fn can_collide(self) -> bool {
        !(self.is_empty_space() || self.is_liquid())
    }

    /// The collision behavior of this type when no override applies.
    pub const fn default_collision(self) -> bool {
        self.can_collide()
    }

    /// The name used for this type in messages and configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Bedrock => "bedrock",
            Self::Stone => "stone",
            Self::Dirt => "dirt",
            Self::Grass => "grass",
            Self::Sand => "sand",
            Self::Wood => "wood",
            Self::Leaves => "leaves",
            Self::Glass => "glass",
            Self::Water => "water",
            Self::Camera => "camera",
            Self::Player => "player",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -------------------------------------------------------------------------------------------------

/// Globally unique identifier of a block, used to address actor markers.
///
/// Identifiers are non-empty, at most [`BlockId::MAX_LEN`] bytes long, and contain no
/// control characters or whitespace. The length limit bounds the serialized size of a
/// [`BlockRecord`], which the snapshot chunking relies on.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockId(Arc<str>);

impl BlockId {
    /// Maximum length of an identifier, in bytes.
    pub const MAX_LEN: usize = 64;

    /// Validates and constructs a [`BlockId`].
    pub fn new(id: &str) -> Result<Self, InvalidBlockId> {
        if id.is_empty() {
            Err(InvalidBlockId::Empty)
        } else if id.len() > Self::MAX_LEN {
            Err(InvalidBlockId::TooLong(id.len()))
        } else if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
            Err(InvalidBlockId::BadCharacter)
        } else {
            Ok(Self(id.into()))
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BlockId {
    type Error = InvalidBlockId;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}
impl TryFrom<&str> for BlockId {
    type Error = InvalidBlockId;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<BlockId> for String {
    fn from(value: BlockId) -> Self {
        value.0.as_ref().to_owned()
    }
}

/// Error from [`BlockId::new()`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidBlockId {
    /// The identifier was the empty string.
    #[error("block id must not be empty")]
    Empty,
    /// The identifier was longer than [`BlockId::MAX_LEN`].
    #[error("block id is {0} bytes long; the maximum is {max}", max = BlockId::MAX_LEN)]
    TooLong(usize),
    /// The identifier contained whitespace or control characters.
    #[error("block id must not contain whitespace or control characters")]
    BadCharacter,
}

// -------------------------------------------------------------------------------------------------

/// The stored attributes of one occupied cube.
///
/// A record's `collision` flag is derived from its [`BlockType`] unless overridden, and is
/// never `true` for a type which [cannot collide](BlockType::can_collide).
#[derive(Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(from = "BlockRecordSer", into = "BlockRecordSer")]
pub struct BlockRecord {
    position: Cube,
    block_type: BlockType,
    collision: bool,
    block_id: Option<BlockId>,
}

impl BlockRecord {
    /// Constructs a record with the default collision for `block_type` and no id.
    pub fn new(position: impl Into<Cube>, block_type: BlockType) -> Self {
        Self {
            position: position.into(),
            block_type,
            collision: block_type.default_collision(),
            block_id: None,
        }
    }

    /// Returns this record with the given id.
    #[must_use]
    pub fn with_id(mut self, block_id: Option<BlockId>) -> Self {
        self.block_id = block_id;
        self
    }

    /// Returns this record with collision explicitly set.
    ///
    /// Requests to enable collision on a type which cannot collide are ignored.
    #[must_use]
    pub fn with_collision(mut self, collision: bool) -> Self {
        self.collision = collision && self.block_type.can_collide();
        self
    }

    #[must_use]
    pub(crate) fn with_position(mut self, position: Cube) -> Self {
        self.position = position;
        self
    }

    /// The cube this record occupies.
    pub fn position(&self) -> Cube {
        self.position
    }

    /// The type of block.
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Whether this block obstructs movement.
    pub fn collision_enabled(&self) -> bool {
        self.collision
    }

    /// The block's unique identifier, if it has one.
    pub fn block_id(&self) -> Option<&BlockId> {
        self.block_id.as_ref()
    }
}

impl fmt::Debug for BlockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ds = f.debug_struct("BlockRecord");
        ds.field("position", &self.position)
            .field("block_type", &self.block_type)
            .field("collision", &self.collision);
        if let Some(id) = &self.block_id {
            ds.field("block_id", id);
        }
        ds.finish()
    }
}

/// Wire form of [`BlockRecord`]. Deserializing goes through [`BlockRecord::with_collision`]
/// so that the collision invariant holds for records from any source.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct BlockRecordSer {
    position: Cube,
    block_type: BlockType,
    block_id: Option<BlockId>,
    collision: bool,
}

impl From<BlockRecordSer> for BlockRecord {
    fn from(value: BlockRecordSer) -> Self {
        let BlockRecordSer {
            position,
            block_type,
            block_id,
            collision,
        } = value;
        BlockRecord::new(position, block_type)
            .with_collision(collision)
            .with_id(block_id)
    }
}
impl From<BlockRecord> for BlockRecordSer {
    fn from(value: BlockRecord) -> Self {
        let BlockRecord {
            position,
            block_type,
            collision,
            block_id,
        } = value;
        BlockRecordSer {
            position,
            block_type,
            block_id,
            collision,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Per-type collision overrides, consulted when a block is placed without an explicit
/// per-record collision setting.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CollisionRules {
    overrides: HashMap<BlockType, bool>,
}

impl CollisionRules {
    /// Records an override for `block_type`. Overrides which would make empty space or
    /// liquids collide are ignored.
    pub fn set(&mut self, block_type: BlockType, collision: bool) {
        if collision && !block_type.can_collide() {
            log::warn!("ignoring collision override for non-colliding block type {block_type}");
            self.overrides.remove(&block_type);
        } else {
            self.overrides.insert(block_type, collision);
        }
    }

    /// Returns the collision for `block_type`: its override if one is recorded, else
    /// [`BlockType::default_collision()`].
    pub fn derive(&self, block_type: BlockType) -> bool {
        let collision = self
            .overrides
            .get(&block_type)
            .copied()
            .unwrap_or(block_type.default_collision());
        collision && block_type.can_collide()
    }
}
