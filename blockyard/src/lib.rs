//! Blockyard is the authoritative core of a multiplayer voxel world server.
//!
//! It owns the world's block state, resolves entity movement against that state, and
//! streams consistent snapshots and incremental updates to any number of concurrently
//! connected clients. Transport (WebSockets, HTTP) lives in the `blockyard-server`
//! package; this crate only sees ordered message queues.
//!
//! ## Components
//!
//! * [`BlockStore`] maps integer coordinates ([`Cube`]s) to [`BlockRecord`]s and keeps a
//!   secondary index from [`BlockId`] to position.
//! * [`physics`] resolves a proposed [`Body`] movement against the store, axis by axis,
//!   so that bodies slide along walls and never leave the world bounds.
//! * [`view`] answers region and view-frustum queries, nearest first.
//! * [`sync`] defines the wire messages, the chunked snapshot sequence, and the
//!   per-connection phase state machine.
//! * [`session`] composes the above: a shared [`World`] plus one task per connection
//!   ([`session::run_connection`]).
//! * [`worldgen`] supplies initial terrain through the [`TerrainSource`] trait.
//!
//! ## Coordinate system
//!
//! +Y is up. Horizontal world bounds are `[0, world_size]` on X and Z; vertical bounds are
//! `[0, world_height]`. Rotations use yaw in degrees clockwise (seen from above) from
//! looking toward −Z, and pitch in degrees downward from horizontal.
//!
//! ## Dependencies and global state
//!
//! `blockyard` has no global state. It writes log messages using the [`log`] crate and
//! is therefore subject to that global configuration.
//!
//! [`Body`]: crate::physics::Body
//! [`BlockRecord`]: crate::block::BlockRecord
//! [`BlockId`]: crate::block::BlockId
//! [`BlockStore`]: crate::store::BlockStore
//! [`Cube`]: crate::math::Cube
//! [`TerrainSource`]: crate::worldgen::TerrainSource
//! [`World`]: crate::session::World

pub mod block;
pub mod config;
pub mod math;
pub mod physics;
pub mod session;
pub mod store;
pub mod sync;
pub mod view;
pub mod worldgen;

pub use config::WorldConfig;

// reexport for convenience of our users and tests
#[doc(hidden)]
pub use euclid;
