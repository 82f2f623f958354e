//! WebSocket server hosting one Blockyard world.
//!
//! Each WebSocket connection is bridged to a [`blockyard::session::run_connection`] task;
//! everything about the protocol itself lives in the `blockyard` library.

pub mod config;
pub mod logging;
pub mod webserver;
