use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockRecord, BlockType};
use crate::math::{Cube, FreeCoordinate, FreePoint, GridCoordinate, Rotation};
use crate::physics::Collided;
use crate::store::{PutError, RelocateError};
use crate::view::{QueryError, QueryHit, ViewOrigin};

/// Client-chosen number echoed in the reply to a request.
pub type RequestId = u64;

/// Identifies a connected entity for the lifetime of the server.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
#[allow(clippy::exhaustive_structs)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// A message from a client to the server.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ClientMessage {
    /// Opens the session. Must be the first message, and must not be repeated.
    Hello {
        /// Opaque identity token; recorded, not verified.
        token: String,
    },

    /// Asks for a [`ServerMessage::BlocksList`].
    GetBlocksList(BlocksRequest),

    /// Moves this connection's entity.
    Move {
        /// Proposed new position.
        position: FreePoint,
        /// New look direction.
        rotation: Rotation,
    },

    /// Places a block, replacing whatever was there.
    SetBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[allow(missing_docs)]
        request_id: Option<RequestId>,
        /// Where to place it.
        position: Cube,
        /// What to place.
        block_type: BlockType,
        /// Identifier for the new block, which must not be in use elsewhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<BlockId>,
        /// Collision override; if absent, derived from the type.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collision: Option<bool>,
    },

    /// Removes the block at a position, if any.
    RemoveBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[allow(missing_docs)]
        request_id: Option<RequestId>,
        #[allow(missing_docs)]
        position: Cube,
    },

    /// Moves a block, including its id, to another position.
    MoveBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[allow(missing_docs)]
        request_id: Option<RequestId>,
        #[allow(missing_docs)]
        from: Cube,
        #[allow(missing_docs)]
        to: Cube,
    },
}

impl ClientMessage {
    /// The `type` tag of this message, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::GetBlocksList(_) => "get_blocks_list",
            Self::Move { .. } => "move",
            Self::SetBlock { .. } => "set_block",
            Self::RemoveBlock { .. } => "remove_block",
            Self::MoveBlock { .. } => "move_block",
        }
    }

    /// The request id the reply to this message should carry.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::GetBlocksList(BlocksRequest { request_id, .. })
            | Self::SetBlock { request_id, .. }
            | Self::RemoveBlock { request_id, .. }
            | Self::MoveBlock { request_id, .. } => *request_id,
            Self::Hello { .. } | Self::Move { .. } => None,
        }
    }
}

/// Contents of [`ClientMessage::GetBlocksList`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[non_exhaustive]
pub struct BlocksRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub request_id: Option<RequestId>,
    #[serde(flatten)]
    #[allow(missing_docs)]
    pub query: BlockQuery,
}

impl BlocksRequest {
    #[allow(missing_docs)]
    pub fn new(request_id: Option<RequestId>, query: BlockQuery) -> Self {
        Self { request_id, query }
    }
}

/// The two kinds of block query, distinguished on the wire by `query_type`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
#[expect(clippy::exhaustive_enums)]
pub enum BlockQuery {
    /// All blocks within `radius` of `center`.
    Region {
        #[allow(missing_docs)]
        center: FreePoint,
        #[allow(missing_docs)]
        radius: FreeCoordinate,
    },
    /// Blocks visible from a viewpoint. Exactly one of `position` and `block_id` must be
    /// given.
    View {
        /// Viewpoint position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<FreePoint>,
        /// Block whose cube center is the viewpoint.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<BlockId>,
        /// Look direction.
        rotation: Rotation,
        /// Maximum distance of results.
        view_distance: FreeCoordinate,
    },
}

impl BlockQuery {
    /// For a view query, returns the viewpoint, or an error if it is ambiguous or absent.
    pub(crate) fn view_origin(
        position: Option<FreePoint>,
        block_id: Option<&BlockId>,
    ) -> Result<ViewOrigin, ErrorReport> {
        match (position, block_id) {
            (Some(position), None) => Ok(ViewOrigin::Position(position)),
            (None, Some(id)) => Ok(ViewOrigin::Block(id.clone())),
            _ => Err(ErrorReport::new(
                ErrorKind::InvalidQuery,
                "view query needs exactly one of position and block_id",
            )),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A message from the server to a client.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ServerMessage {
    /// Reply to [`ClientMessage::Hello`].
    Welcome {
        /// The entity this connection controls.
        entity_id: EntityId,
        #[allow(missing_docs)]
        world_size: GridCoordinate,
        #[allow(missing_docs)]
        world_height: GridCoordinate,
        /// Maximum records per [`ServerMessage::WorldChunk`].
        chunk_max: usize,
        /// Where the entity starts.
        spawn: FreePoint,
    },

    /// Part of a snapshot.
    WorldChunk {
        #[allow(missing_docs)]
        blocks: Vec<BlockRecord>,
    },

    /// End of a snapshot.
    ///
    /// A snapshot resent to a lagging connection is followed by messages that bring its
    /// entities up to date as well.
    WorldComplete {
        /// Number of records in all the preceding chunks together.
        total: usize,
    },

    /// A cube's contents changed.
    BlockChanged {
        #[allow(missing_docs)]
        position: Cube,
        /// New type, or [`None`] if the block was removed.
        block_type: Option<BlockType>,
        #[allow(missing_docs)]
        block_id: Option<BlockId>,
        #[allow(missing_docs)]
        collision: bool,
    },

    /// An entity moved.
    EntityMoved {
        #[allow(missing_docs)]
        entity_id: EntityId,
        /// Position after collision resolution.
        position: FreePoint,
        #[allow(missing_docs)]
        rotation: Rotation,
        /// Which axes were obstructed or clamped.
        collided: Collided,
    },

    /// An entity left the world.
    EntityRemoved {
        #[allow(missing_docs)]
        entity_id: EntityId,
    },

    /// Reply to [`ClientMessage::GetBlocksList`].
    ///
    /// Large results are split over several messages with the same `request_id`;
    /// `remaining` counts the hits still to come and is zero in the last one.
    BlocksList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[allow(missing_docs)]
        request_id: Option<RequestId>,
        #[allow(missing_docs)]
        blocks: Vec<QueryHit>,
        #[serde(default)]
        #[allow(missing_docs)]
        remaining: usize,
    },

    /// A request failed.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[allow(missing_docs)]
        request_id: Option<RequestId>,
        #[allow(missing_docs)]
        kind: ErrorKind,
        /// Human-readable explanation.
        message: String,
    },
}

impl ServerMessage {
    /// Describes the current contents of `position`: `record`, or nothing.
    pub fn block_changed(position: Cube, record: Option<&BlockRecord>) -> Self {
        match record {
            Some(record) => Self::BlockChanged {
                position,
                block_type: Some(record.block_type()),
                block_id: record.block_id().cloned(),
                collision: record.collision_enabled(),
            },
            None => Self::BlockChanged {
                position,
                block_type: None,
                block_id: None,
                collision: false,
            },
        }
    }

    /// Constructs an [`ServerMessage::Error`] reply.
    pub fn error(request_id: Option<RequestId>, report: ErrorReport) -> Self {
        Self::Error {
            request_id,
            kind: report.kind,
            message: report.message,
        }
    }

    /// Returns whether this is one of the incremental update messages which may only be
    /// applied to a complete snapshot.
    pub fn is_incremental_update(&self) -> bool {
        matches!(
            self,
            Self::BlockChanged { .. } | Self::EntityMoved { .. } | Self::EntityRemoved { .. }
        )
    }

    /// The `type` tag of this message, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::WorldChunk { .. } => "world_chunk",
            Self::WorldComplete { .. } => "world_complete",
            Self::BlockChanged { .. } => "block_changed",
            Self::EntityMoved { .. } => "entity_moved",
            Self::EntityRemoved { .. } => "entity_removed",
            Self::BlocksList { .. } => "blocks_list",
            Self::Error { .. } => "error",
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Category of a failed request, as sent in [`ServerMessage::Error`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize, exhaust::Exhaust)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// A block id was already in use at another position.
    DuplicateBlockId,
    /// A block id did not exist.
    UnknownBlockId,
    /// A query's parameters were unusable.
    InvalidQuery,
    /// A message could not be parsed or its contents were unacceptable.
    InvalidRequest,
    /// The message sequence was wrong. The connection is closed after this is reported.
    ProtocolViolation,
}

impl ErrorKind {
    /// Returns whether the server closes the connection after reporting this error.
    pub fn closes_connection(self) -> bool {
        matches!(self, Self::ProtocolViolation)
    }
}

/// An error ready to be sent to a client: its [`ErrorKind`] and explanation.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ErrorReport {
    #[allow(missing_docs)]
    pub kind: ErrorKind,
    #[allow(missing_docs)]
    pub message: String,
}

impl ErrorReport {
    #[allow(missing_docs)]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<PutError> for ErrorReport {
    fn from(error: PutError) -> Self {
        let kind = match error {
            PutError::DuplicateBlockId { .. } => ErrorKind::DuplicateBlockId,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<RelocateError> for ErrorReport {
    fn from(error: RelocateError) -> Self {
        Self::new(ErrorKind::InvalidRequest, error.to_string())
    }
}

impl From<QueryError> for ErrorReport {
    fn from(error: QueryError) -> Self {
        let kind = match error {
            QueryError::UnknownBlockId(_) => ErrorKind::UnknownBlockId,
            QueryError::InvalidDistance(_) | QueryError::InvalidOrigin => ErrorKind::InvalidQuery,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidRequest, format!("malformed message: {error}"))
    }
}

impl From<super::ProtocolViolation> for ErrorReport {
    fn from(error: super::ProtocolViolation) -> Self {
        Self::new(ErrorKind::ProtocolViolation, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_region_query() {
        let message: ClientMessage = serde_json::from_value(json!({
            "type": "get_blocks_list",
            "request_id": 7,
            "query_type": "region",
            "center": [1.0, 2.0, 3.0],
            "radius": 4.5,
        }))
        .unwrap();
        assert_eq!(
            message,
            ClientMessage::GetBlocksList(BlocksRequest::new(
                Some(7),
                BlockQuery::Region {
                    center: FreePoint::new(1.0, 2.0, 3.0),
                    radius: 4.5,
                }
            ))
        );
        assert_eq!(message.request_id(), Some(7));
    }

    #[test]
    fn parse_view_query_by_id() {
        let message: ClientMessage = serde_json::from_value(json!({
            "type": "get_blocks_list",
            "query_type": "view",
            "block_id": "camera_0",
            "rotation": {"yaw": 90, "pitch": 10},
            "view_distance": 20,
        }))
        .unwrap();
        assert_eq!(
            message,
            ClientMessage::GetBlocksList(BlocksRequest::new(
                None,
                BlockQuery::View {
                    position: None,
                    block_id: Some(BlockId::new("camera_0").unwrap()),
                    rotation: Rotation::new(90.0, 10.0),
                    view_distance: 20.0,
                }
            ))
        );
    }

    #[test]
    fn parse_set_block_defaults() {
        let message: ClientMessage = serde_json::from_value(json!({
            "type": "set_block",
            "position": [1, 2, 3],
            "block_type": "sand",
        }))
        .unwrap();
        assert_eq!(
            message,
            ClientMessage::SetBlock {
                request_id: None,
                position: Cube::new(1, 2, 3),
                block_type: BlockType::Sand,
                block_id: None,
                collision: None,
            }
        );
    }

    #[test]
    fn reject_unknown_type_and_bad_id() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "explode"})).is_err());
        assert!(
            serde_json::from_value::<ClientMessage>(json!({
                "type": "set_block",
                "position": [0, 0, 0],
                "block_type": "camera",
                "block_id": "",
            }))
            .is_err()
        );
    }

    #[test]
    fn block_changed_removal_wire_format() {
        assert_eq!(
            serde_json::to_value(ServerMessage::block_changed(Cube::new(4, 5, 6), None)).unwrap(),
            json!({
                "type": "block_changed",
                "position": [4, 5, 6],
                "block_type": null,
                "block_id": null,
                "collision": false,
            })
        );
    }

    #[test]
    fn entity_moved_wire_format() {
        let message = ServerMessage::EntityMoved {
            entity_id: EntityId(3),
            position: FreePoint::new(1.5, 0.0, 2.0),
            rotation: Rotation::new(0.0, 0.0),
            collided: Collided {
                x: true,
                y: false,
                z: false,
            },
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "entity_moved",
                "entity_id": 3,
                "position": [1.5, 0.0, 2.0],
                "rotation": {"yaw": 0.0, "pitch": 0.0},
                "collided": {"x": true, "y": false, "z": false},
            })
        );
    }

    #[test]
    fn error_kinds() {
        use exhaust::Exhaust as _;
        let closing: Vec<ErrorKind> = ErrorKind::exhaust()
            .filter(|kind| kind.closes_connection())
            .collect();
        assert_eq!(closing, vec![ErrorKind::ProtocolViolation]);
        assert_eq!(
            serde_json::to_value(ErrorKind::DuplicateBlockId).unwrap(),
            json!("duplicate_block_id")
        );
    }

    #[test]
    fn error_report_from_store_errors() {
        let report = ErrorReport::from(PutError::DuplicateBlockId {
            block_id: BlockId::new("a").unwrap(),
            existing: Cube::ORIGIN,
        });
        assert_eq!(report.kind, ErrorKind::DuplicateBlockId);
        let report = ErrorReport::from(QueryError::UnknownBlockId(BlockId::new("a").unwrap()));
        assert_eq!(report.kind, ErrorKind::UnknownBlockId);
        let report = ErrorReport::from(QueryError::InvalidDistance(-1.0));
        assert_eq!(report.kind, ErrorKind::InvalidQuery);
    }
}
