//! The shared [`World`] and the per-connection tasks that serve it.
//!
//! One [`World`] exists per server. Each connection is served by [`run_connection()`],
//! which reads the client's messages from an ordered queue and writes the server's
//! replies and updates to another; the transport that fills and drains those queues is
//! not this module's concern.
//!
//! All mutations of the world's [`BlockStore`] and entity table happen under the store's
//! write lock, and the resulting incremental updates are published to every connection
//! before the lock is released. Therefore every connection observes changes in the order
//! the store admitted them. Locks are always acquired store first, then entities, and are
//! never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::block::{BlockId, BlockRecord, BlockType};
use crate::config::{ConfigError, WorldConfig};
use crate::math::{Cube, FreePoint, GridAab, Rotation};
use crate::physics::{Body, WorldBounds};
use crate::store::{BlockStore, PutError, RelocateError};
use crate::sync::{EntityId, ErrorKind, ErrorReport, ProtocolViolation, ServerMessage, Snapshot};
use crate::worldgen::TerrainSource;

mod connection;
pub use connection::run_connection;

/// Prefix of the ids of player markers. Clients may not assign ids with this prefix.
const PLAYER_ID_PREFIX: &str = "player_";

/// The authoritative state of one world: blocks, connected entities, and the stream of
/// updates describing changes to them.
pub struct World {
    config: WorldConfig,
    bounds: WorldBounds,
    store: RwLock<BlockStore>,
    entities: Mutex<HashMap<EntityId, EntityState>>,
    updates: broadcast::Sender<ServerMessage>,
    next_entity_id: AtomicU64,
}

/// Per-connection actor state.
#[derive(Debug)]
struct EntityState {
    body: Body,
    /// Id of this entity's player marker block, which may or may not currently exist.
    marker_id: BlockId,
    last_move: Instant,
}

/// What a connection receives on joining: everything it needs to reach
/// [`Phase::Synchronized`](crate::sync::Phase::Synchronized).
#[derive(Debug)]
pub(crate) struct Joined {
    pub entity_id: EntityId,
    pub snapshot: Snapshot,
    pub updates: broadcast::Receiver<ServerMessage>,
    /// Current positions of other entities, to send after the snapshot.
    pub others: Vec<ServerMessage>,
}

/// What a lagging connection receives to catch up.
#[derive(Debug)]
pub(crate) struct Resync {
    pub snapshot: Snapshot,
    pub updates: broadcast::Receiver<ServerMessage>,
    /// An [`ServerMessage::EntityMoved`] for every entity now in the world, including
    /// the lagging connection's own.
    pub entities: Vec<ServerMessage>,
}

impl World {
    /// Creates a world whose initial contents are supplied by `terrain`.
    pub fn new(config: WorldConfig, terrain: &dyn TerrainSource) -> Result<Self, SessionError> {
        config.validate()?;
        let mut store = BlockStore::with_rules(config.collision_overrides.clone());
        terrain.populate(&config, &mut store)?;
        log::info!(
            "world of size {}×{}×{} created with {} blocks",
            config.world_size,
            config.world_height,
            config.world_size,
            store.len()
        );
        let (updates, _) = broadcast::channel(config.update_backlog);
        Ok(Self {
            bounds: WorldBounds::from_config(&config),
            config,
            store: RwLock::new(store),
            entities: Mutex::new(HashMap::new()),
            updates,
            next_entity_id: AtomicU64::new(1),
        })
    }

    /// The configuration this world was created with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of blocks currently in the world.
    pub fn block_count(&self) -> usize {
        self.read_store().len()
    }

    /// Number of entities (joined connections) currently in the world.
    pub fn entity_count(&self) -> usize {
        self.lock_entities().len()
    }

    /// Calls `f` with shared access to the block store.
    ///
    /// Mutations are blocked for the duration, so `f` should be brief.
    pub fn read<R>(&self, f: impl FnOnce(&BlockStore) -> R) -> R {
        f(&self.read_store())
    }

    /// Subscribes to the world's incremental updates, as sent to synchronized connections.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    /// Places a block, replacing whatever was there, and publishes the change.
    ///
    /// If `collision` is [`None`], the block's collision is derived from its type.
    pub fn set_block(
        &self,
        position: Cube,
        block_type: BlockType,
        block_id: Option<BlockId>,
        collision: Option<bool>,
    ) -> Result<(), MutationError> {
        self.check_in_bounds(position)?;
        if let Some(id) = &block_id {
            if id.as_str().starts_with(PLAYER_ID_PREFIX) {
                return Err(MutationError::ReservedId(id.clone()));
            }
        }

        let mut store = self.write_store();
        let collision = collision.unwrap_or_else(|| store.derive_collision(block_type));
        let record = BlockRecord::new(position, block_type)
            .with_collision(collision)
            .with_id(block_id);
        store.insert(record)?;
        self.publish(ServerMessage::block_changed(position, store.get(position)));
        Ok(())
    }

    /// Removes the block at `position`, if any, and publishes the change.
    pub fn remove_block(&self, position: Cube) -> Option<BlockRecord> {
        let mut store = self.write_store();
        let removed = store.remove(position)?;
        self.publish(ServerMessage::block_changed(position, None));
        Some(removed)
    }

    /// Moves the block at `from` to `to`, replacing whatever was there, and publishes the
    /// changes to both positions.
    pub fn move_block(&self, from: Cube, to: Cube) -> Result<(), MutationError> {
        self.check_in_bounds(to)?;
        let mut store = self.write_store();
        store.relocate(from, to)?;
        if from != to {
            self.publish(ServerMessage::block_changed(from, None));
            self.publish(ServerMessage::block_changed(to, store.get(to)));
        }
        Ok(())
    }

    /// Adds an entity for a newly greeted connection, and captures the snapshot and
    /// update subscription it starts from.
    pub(crate) fn join(&self, token: &str) -> Joined {
        let entity_id = EntityId(self.next_entity_id.fetch_add(1, Ordering::Relaxed));
        let Ok(marker_id) = BlockId::new(&format!("{PLAYER_ID_PREFIX}{entity_id}")) else {
            unreachable!("player ids are valid");
        };
        let body = Body::new(self.config.spawn, self.config.body_box);

        let mut store = self.write_store();
        let mut entities = self.lock_entities();
        place_marker(&mut store, &marker_id, body.position, &mut |m| self.publish(m));

        let others = entities
            .iter()
            .map(|(&id, other)| entity_moved(id, &other.body, Default::default()))
            .collect();
        entities.insert(
            entity_id,
            EntityState {
                body,
                marker_id,
                last_move: Instant::now(),
            },
        );

        // Subscribing while still holding the lock means the receiver sees exactly the
        // changes after the snapshot.
        let snapshot = Snapshot::take(&store);
        let updates = self.updates.subscribe();
        log::info!(
            "entity {entity_id} joined with token {token:?}; {} entities present",
            entities.len()
        );
        Joined {
            entity_id,
            snapshot,
            updates,
            others,
        }
    }

    /// Captures a fresh snapshot, update subscription, and list of every entity present,
    /// for a connection that fell behind.
    pub(crate) fn resync(&self) -> Resync {
        let store = self.read_store();
        let entities = self.lock_entities();
        let mut present: Vec<(EntityId, &EntityState)> =
            entities.iter().map(|(&id, entity)| (id, entity)).collect();
        present.sort_by_key(|&(id, _)| id);
        Resync {
            snapshot: Snapshot::take(&store),
            updates: self.updates.subscribe(),
            entities: present
                .into_iter()
                .map(|(id, entity)| entity_moved(id, &entity.body, Default::default()))
                .collect(),
        }
    }

    /// Moves an entity as far towards `target` as collision allows, carries its marker
    /// block along, and publishes the outcome.
    pub(crate) fn move_entity(&self, entity_id: EntityId, target: FreePoint, rotation: Rotation) {
        let mut store = self.write_store();
        let mut entities = self.lock_entities();
        let Some(entity) = entities.get_mut(&entity_id) else {
            return;
        };

        let now = Instant::now();
        let collided = entity.body.move_to(
            &*store,
            self.bounds,
            target,
            rotation,
            now - entity.last_move,
        );
        entity.last_move = now;

        place_marker(
            &mut store,
            &entity.marker_id,
            entity.body.position,
            &mut |m| self.publish(m),
        );
        self.publish(entity_moved(entity_id, &entity.body, collided));
    }

    /// Removes an entity and its marker block, and publishes the removal.
    pub(crate) fn leave(&self, entity_id: EntityId) {
        let mut store = self.write_store();
        let mut entities = self.lock_entities();
        let Some(entity) = entities.remove(&entity_id) else {
            return;
        };
        if let Some(position) = store.lookup_by_id(&entity.marker_id) {
            store.remove(position);
            self.publish(ServerMessage::block_changed(position, None));
        }
        self.publish(ServerMessage::EntityRemoved { entity_id });
        log::info!(
            "entity {entity_id} left; {} entities remain",
            entities.len()
        );
    }

    fn publish(&self, message: ServerMessage) {
        // An error only means nobody is subscribed.
        let _ = self.updates.send(message);
    }

    fn check_in_bounds(&self, position: Cube) -> Result<(), MutationError> {
        let world = GridAab::from_lower_upper(
            [0, 0, 0],
            [
                self.config.world_size,
                self.config.world_height,
                self.config.world_size,
            ],
        );
        if world.contains_cube(position) {
            Ok(())
        } else {
            Err(MutationError::OutOfBounds(position))
        }
    }

    // Poisoning is ignored: every mutation leaves the store consistent before anything
    // that could panic.
    fn read_store(&self) -> RwLockReadGuard<'_, BlockStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }
    fn write_store(&self) -> RwLockWriteGuard<'_, BlockStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
    fn lock_entities(&self) -> MutexGuard<'_, HashMap<EntityId, EntityState>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("store", &*self.read_store())
            .field("entities", &self.lock_entities().len())
            .finish_non_exhaustive()
    }
}

fn entity_moved(entity_id: EntityId, body: &Body, collided: crate::physics::Collided) -> ServerMessage {
    ServerMessage::EntityMoved {
        entity_id,
        position: body.position,
        rotation: body.rotation,
        collided,
    }
}

/// Ensures the marker block `marker_id` is in the cube containing `position`, if that
/// cube is empty, and publishes whatever changed. A marker whose destination is occupied
/// stays where it was.
fn place_marker(
    store: &mut BlockStore,
    marker_id: &BlockId,
    position: FreePoint,
    publish: &mut dyn FnMut(ServerMessage),
) {
    let Some(destination) = Cube::containing(position) else {
        return;
    };
    let current = store.lookup_by_id(marker_id);
    if current == Some(destination) || store.contains(destination) {
        return;
    }
    match current {
        Some(from) => match store.relocate(from, destination) {
            Ok(_) => {
                publish(ServerMessage::block_changed(from, None));
                publish(ServerMessage::block_changed(destination, store.get(destination)));
            }
            Err(error) => log::error!("moving marker {marker_id}: {error}"),
        },
        None => {
            // Markers do not collide, or their owners would be stuck in them.
            let record = BlockRecord::new(destination, BlockType::Player)
                .with_collision(false)
                .with_id(Some(marker_id.clone()));
            match store.insert(record) {
                Ok(_) => publish(ServerMessage::block_changed(destination, store.get(destination))),
                Err(error) => log::error!("placing marker {marker_id}: {error}"),
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Error from [`World::new()`] or [`run_connection()`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The world configuration was invalid.
    #[error("invalid world configuration")]
    Config(#[from] ConfigError),
    /// The terrain provider failed.
    #[error("terrain generation failed")]
    Terrain(#[from] PutError),
    /// The client broke the protocol and was disconnected.
    #[error("client violated the protocol")]
    Protocol(#[from] ProtocolViolation),
}

/// Error from a [`World`] mutation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum MutationError {
    /// The store rejected the write.
    #[error(transparent)]
    Put(#[from] PutError),
    /// The block to move does not exist.
    #[error(transparent)]
    Relocate(#[from] RelocateError),
    /// The position is outside the world.
    #[error("position {0:?} is outside the world")]
    OutOfBounds(Cube),
    /// The id is reserved for player markers.
    #[error("block id {0} is reserved")]
    ReservedId(BlockId),
}

impl From<MutationError> for ErrorReport {
    fn from(error: MutationError) -> Self {
        match error {
            MutationError::Put(e) => e.into(),
            MutationError::Relocate(e) => e.into(),
            e @ (MutationError::OutOfBounds(_) | MutationError::ReservedId(_)) => {
                ErrorReport::new(ErrorKind::InvalidRequest, e.to_string())
            }
        }
    }
}
