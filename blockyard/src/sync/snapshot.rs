use exhaust::Exhaust as _;

use crate::block::{BlockId, BlockRecord, BlockType};
use crate::math::{Cube, GridCoordinate};
use crate::store::BlockStore;
use crate::sync::{ProtocolViolation, RequestId, ServerMessage};
use crate::view::QueryHit;

/// A copy of every record in a [`BlockStore`], taken at one instant, ready to be sent
/// as a sequence of chunks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<BlockRecord>,
}

impl Snapshot {
    /// Copies the current contents of `store`, in positional order.
    pub fn take(store: &BlockStore) -> Self {
        Self {
            records: store.records().cloned().collect(),
        }
    }

    /// Number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the snapshot has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the messages that transmit this snapshot: `ceil(len / chunk_max)`
    /// [`ServerMessage::WorldChunk`]s followed by one [`ServerMessage::WorldComplete`].
    ///
    /// Panics if `chunk_max` is zero.
    pub fn messages(&self, chunk_max: usize) -> impl Iterator<Item = ServerMessage> + '_ {
        self.records
            .chunks(chunk_max)
            .map(|chunk| ServerMessage::WorldChunk {
                blocks: chunk.to_vec(),
            })
            .chain(std::iter::once(ServerMessage::WorldComplete {
                total: self.records.len(),
            }))
    }
}

/// Splits query results into [`ServerMessage::BlocksList`] messages of at most
/// `chunk_max` hits each. An empty result is still one message.
pub fn blocks_list_messages(
    request_id: Option<RequestId>,
    hits: Vec<QueryHit>,
    chunk_max: usize,
) -> Vec<ServerMessage> {
    if hits.is_empty() {
        return vec![ServerMessage::BlocksList {
            request_id,
            blocks: hits,
            remaining: 0,
        }];
    }
    let mut remaining = hits.len();
    hits.chunks(chunk_max)
        .map(|page| {
            remaining -= page.len();
            ServerMessage::BlocksList {
                request_id,
                blocks: page.to_vec(),
                remaining,
            }
        })
        .collect()
}

/// Upper bound on the serialized size of a [`ServerMessage::WorldChunk`] or
/// [`ServerMessage::BlocksList`] carrying `chunk_max` records.
pub fn worst_case_chunk_bytes(chunk_max: usize) -> usize {
    let record = worst_case_record();
    let hit = QueryHit {
        record: record.clone(),
        // Among the longest representations of an f64.
        distance: Some(-1.2345678901234567e-300),
    };
    let chunk = worst_case_page(
        ServerMessage::WorldChunk {
            blocks: vec![record.clone()],
        },
        &record,
        chunk_max,
    );
    let list = worst_case_page(
        ServerMessage::BlocksList {
            request_id: Some(RequestId::MAX),
            blocks: vec![hit.clone()],
            remaining: usize::MAX,
        },
        &hit,
        chunk_max,
    );
    chunk.max(list)
}

/// Size of `single` (a message holding one `item`) grown to hold `count` items.
fn worst_case_page<T: serde::Serialize>(single: ServerMessage, item: &T, count: usize) -> usize {
    let single_len = serde_json::to_vec(&single).map_or(usize::MAX, |bytes| bytes.len());
    let item_len = serde_json::to_vec(item).map_or(usize::MAX, |bytes| bytes.len());
    // Each further item adds its own text and a comma.
    count
        .saturating_sub(1)
        .saturating_mul(item_len.saturating_add(1))
        .saturating_add(single_len)
}

fn worst_case_record() -> BlockRecord {
    let longest_type = BlockType::exhaust()
        .max_by_key(|block_type| block_type.name().len())
        .unwrap_or(BlockType::Bedrock);
    // Quotes are escaped, doubling their length.
    let id = BlockId::new(&"\"".repeat(BlockId::MAX_LEN)).ok();
    BlockRecord::new([GridCoordinate::MIN; 3], longest_type)
        .with_collision(false)
        .with_id(id)
}

// -------------------------------------------------------------------------------------------------

/// Client-side reassembly of the world from the server's message stream.
///
/// Feed every [`ServerMessage`] to [`SnapshotAssembler::receive()`]. Once a snapshot's
/// completion marker has arrived, [`SnapshotAssembler::world()`] is a replica of the
/// server's world, and subsequent [`ServerMessage::BlockChanged`] messages keep it up to
/// date. A chunk or completion marker arriving after completion begins a fresh snapshot;
/// a marker alone is a fresh, empty snapshot.
#[derive(Debug, Default)]
pub struct SnapshotAssembler {
    world: BlockStore,
    received: usize,
    complete: bool,
}

impl SnapshotAssembler {
    /// Constructs an assembler awaiting its first snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a snapshot has been completely received.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The assembled world. Only meaningful once [`Self::is_complete()`].
    pub fn world(&self) -> &BlockStore {
        &self.world
    }

    /// Processes one message from the server.
    ///
    /// Messages unrelated to world contents are accepted and ignored.
    pub fn receive(&mut self, message: &ServerMessage) -> Result<(), ProtocolViolation> {
        match message {
            ServerMessage::WorldChunk { blocks } => {
                if self.complete {
                    *self = Self::default();
                }
                for record in blocks {
                    let previous = self
                        .world
                        .insert(record.clone())
                        .map_err(|e| ProtocolViolation::Inconsistent(e.to_string()))?;
                    if previous.is_some() {
                        return Err(ProtocolViolation::Inconsistent(format!(
                            "position {:?} appeared twice in snapshot",
                            record.position()
                        )));
                    }
                }
                self.received += blocks.len();
                Ok(())
            }
            &ServerMessage::WorldComplete { total } => {
                if self.complete {
                    *self = Self::default();
                }
                if total != self.received {
                    return Err(ProtocolViolation::SnapshotCountMismatch {
                        declared: total,
                        received: self.received,
                    });
                }
                self.complete = true;
                Ok(())
            }
            _ if message.is_incremental_update() && !self.complete => Err(
                ProtocolViolation::UpdateBeforeSnapshot(message.type_name()),
            ),
            ServerMessage::BlockChanged {
                position,
                block_type,
                block_id,
                collision,
            } => self.apply_change(*position, *block_type, block_id.clone(), *collision),
            _ => Ok(()),
        }
    }

    fn apply_change(
        &mut self,
        position: Cube,
        block_type: Option<BlockType>,
        block_id: Option<BlockId>,
        collision: bool,
    ) -> Result<(), ProtocolViolation> {
        match block_type {
            Some(block_type) => {
                self.world
                    .insert(
                        BlockRecord::new(position, block_type)
                            .with_collision(collision)
                            .with_id(block_id),
                    )
                    .map_err(|e| ProtocolViolation::Inconsistent(e.to_string()))?;
            }
            None => {
                self.world.remove(position);
            }
        }
        Ok(())
    }
}
