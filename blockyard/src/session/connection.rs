use std::sync::Arc;

use hashbrown::HashSet;
use tokio::sync::{broadcast, mpsc};

use crate::session::{Joined, Resync, SessionError, World};
use crate::sync::{
    BlockQuery, BlocksRequest, ClientMessage, EntityId, ErrorReport, Phase, ProtocolViolation,
    RequestId, ServerMessage, Snapshot, blocks_list_messages,
};
use crate::view;

/// Serves one client connection until it closes.
///
/// `inbound` carries the client's messages as JSON text, in arrival order; `outbound`
/// receives everything the server sends, in the order it must be delivered. The
/// connection ends when `inbound` is closed, when `outbound`'s receiver is dropped, or
/// when the client violates the protocol. In every case the connection's entity and
/// player marker are removed from the world, which is also done if the returned future is
/// dropped.
///
/// A connection that falls too far behind the world's updates is sent a fresh snapshot,
/// then [`ServerMessage::EntityRemoved`] for each entity it knew of that has since left,
/// then [`ServerMessage::EntityMoved`] for every entity present.
///
/// Returns an error only for a protocol violation, after reporting it to the client.
pub async fn run_connection(
    world: Arc<World>,
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<ServerMessage>,
) -> Result<(), SessionError> {
    let out = Outbound {
        sender: outbound,
        known_entities: HashSet::new(),
    };
    match serve(&world, inbound, out).await {
        Ok(()) | Err(Ended::Closed) => Ok(()),
        Err(Ended::Violation(violation)) => Err(SessionError::Protocol(violation)),
    }
}

async fn serve(
    world: &World,
    mut inbound: mpsc::Receiver<String>,
    mut out: Outbound,
) -> Result<(), Ended> {
    let mut phase = Phase::default();

    let token = loop {
        let Some(text) = inbound.recv().await else {
            log::debug!("connection closed before hello");
            return Ok(());
        };
        let message = match parse(&text) {
            Ok(message) => message,
            Err((request_id, report)) => {
                out.send(ServerMessage::error(request_id, report)).await?;
                continue;
            }
        };
        if let Err(violation) = phase.receive(&message) {
            return Err(out.violation(violation).await);
        }
        if let ClientMessage::Hello { token } = message {
            break token;
        }
    };

    let Joined {
        entity_id,
        snapshot,
        mut updates,
        others,
    } = world.join(&token);
    let _departure = Departure {
        world,
        entity_id,
    };

    let config = world.config();
    out.send(ServerMessage::Welcome {
        entity_id,
        world_size: config.world_size,
        world_height: config.world_height,
        chunk_max: config.chunk_max,
        spawn: config.spawn,
    })
    .await?;
    out.send_snapshot(&snapshot, config.chunk_max).await?;
    drop(snapshot);
    phase.snapshot_sent();
    for message in others {
        out.send(message).await?;
    }

    loop {
        tokio::select! {
            incoming = inbound.recv() => {
                let Some(text) = incoming else {
                    log::debug!("entity {entity_id}: client closed the connection");
                    break;
                };
                let (request_id, message) = match parse(&text) {
                    Ok(message) => (message.request_id(), message),
                    Err((request_id, report)) => {
                        out.send(ServerMessage::error(request_id, report)).await?;
                        continue;
                    }
                };
                if let Err(violation) = phase.receive(&message) {
                    return Err(out.violation(violation).await);
                }
                match handle_request(world, entity_id, message) {
                    Ok(replies) => {
                        for reply in replies {
                            out.send(reply).await?;
                        }
                    }
                    Err(report) => {
                        log::debug!("entity {entity_id}: request failed: {}", report.message);
                        out.send(ServerMessage::error(request_id, report)).await?;
                    }
                }
            }
            update = updates.recv() => match update {
                Ok(message) => out.send(message).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("entity {entity_id} fell {skipped} updates behind; resending world");
                    let Resync {
                        snapshot,
                        updates: resubscribed,
                        entities,
                    } = world.resync();
                    updates = resubscribed;
                    out.send_snapshot(&snapshot, config.chunk_max).await?;
                    phase.snapshot_sent();
                    out.replace_entities(entities).await?;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    phase.disconnect();
    Ok(())
}

/// Performs one request that arrived after `hello`, returning the direct replies.
///
/// Changes to the world are not replied to directly; they reach every connection,
/// including this one, as updates.
fn handle_request(
    world: &World,
    entity_id: EntityId,
    message: ClientMessage,
) -> Result<Vec<ServerMessage>, ErrorReport> {
    match message {
        // Rejected by the phase machine.
        ClientMessage::Hello { .. } => Ok(vec![]),
        ClientMessage::GetBlocksList(BlocksRequest { request_id, query }) => {
            let hits = world.read(|store| -> Result<_, ErrorReport> {
                Ok(match query {
                    BlockQuery::Region { center, radius } => {
                        view::query_region(store, center, radius)?
                    }
                    BlockQuery::View {
                        position,
                        block_id,
                        rotation,
                        view_distance,
                    } => {
                        let origin = BlockQuery::view_origin(position, block_id.as_ref())?;
                        view::query_view(
                            store,
                            world.config().field_of_view,
                            &origin,
                            rotation,
                            view_distance,
                        )?
                    }
                })
            })?;
            Ok(blocks_list_messages(
                request_id,
                hits,
                world.config().chunk_max,
            ))
        }
        ClientMessage::Move { position, rotation } => {
            world.move_entity(entity_id, position, rotation);
            Ok(vec![])
        }
        ClientMessage::SetBlock {
            request_id: _,
            position,
            block_type,
            block_id,
            collision,
        } => {
            world.set_block(position, block_type, block_id, collision)?;
            Ok(vec![])
        }
        ClientMessage::RemoveBlock {
            request_id: _,
            position,
        } => {
            world.remove_block(position);
            Ok(vec![])
        }
        ClientMessage::MoveBlock {
            request_id: _,
            from,
            to,
        } => {
            world.move_block(from, to)?;
            Ok(vec![])
        }
    }
}

/// Parses a client message. On failure, recovers the request id if the text was at
/// least a JSON object carrying one.
fn parse(text: &str) -> Result<ClientMessage, (Option<RequestId>, ErrorReport)> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| (None, ErrorReport::from(e)))?;
    let request_id = value.get("request_id").and_then(serde_json::Value::as_u64);
    serde_json::from_value(value).map_err(|e| (request_id, ErrorReport::from(e)))
}

/// Sending half of the connection.
struct Outbound {
    sender: mpsc::Sender<ServerMessage>,
    /// Entities the client has been told are present and not yet told are removed.
    known_entities: HashSet<EntityId>,
}

/// Why [`serve()`] stopped early.
enum Ended {
    /// The client stopped receiving; not an error.
    Closed,
    Violation(ProtocolViolation),
}

impl Outbound {
    async fn send(&mut self, message: ServerMessage) -> Result<(), Ended> {
        match message {
            ServerMessage::EntityMoved { entity_id, .. } => {
                self.known_entities.insert(entity_id);
            }
            ServerMessage::EntityRemoved { entity_id } => {
                self.known_entities.remove(&entity_id);
            }
            _ => {}
        }
        self.sender.send(message).await.map_err(|_| Ended::Closed)
    }

    async fn send_snapshot(&mut self, snapshot: &Snapshot, chunk_max: usize) -> Result<(), Ended> {
        for message in snapshot.messages(chunk_max) {
            self.send(message).await?;
        }
        Ok(())
    }

    /// After a resent snapshot, brings the client's set of entities up to date: removes
    /// the ones no longer in `present` and then sends every entry of `present`, which
    /// are [`ServerMessage::EntityMoved`]s.
    async fn replace_entities(&mut self, present: Vec<ServerMessage>) -> Result<(), Ended> {
        let present_ids: HashSet<EntityId> = present
            .iter()
            .filter_map(|message| match *message {
                ServerMessage::EntityMoved { entity_id, .. } => Some(entity_id),
                _ => None,
            })
            .collect();
        let mut departed: Vec<EntityId> = self
            .known_entities
            .difference(&present_ids)
            .copied()
            .collect();
        departed.sort_unstable();
        for entity_id in departed {
            self.send(ServerMessage::EntityRemoved { entity_id }).await?;
        }
        for message in present {
            self.send(message).await?;
        }
        Ok(())
    }

    /// Reports a protocol violation to the client, if it is still listening.
    async fn violation(&mut self, violation: ProtocolViolation) -> Ended {
        log::info!("closing connection: {violation}");
        let _ = self
            .send(ServerMessage::error(None, ErrorReport::from(violation.clone())))
            .await;
        Ended::Violation(violation)
    }
}

/// Removes the entity from the world when the connection ends, however it ends.
struct Departure<'a> {
    world: &'a World,
    entity_id: EntityId,
}

impl Drop for Departure<'_> {
    fn drop(&mut self) {
        self.world.leave(self.entity_id);
    }
}
