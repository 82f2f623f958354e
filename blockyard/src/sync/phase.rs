use crate::sync::ClientMessage;

/// Where a connection is in its lifecycle.
///
/// ```text
/// Connecting --hello--> Handshaking --snapshot sent--> Synchronized
///      \___________________\_____________________________\__--> Disconnected
/// ```
///
/// `Disconnected` is terminal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, exhaust::Exhaust)]
#[expect(clippy::exhaustive_enums)]
pub enum Phase {
    /// Transport open; waiting for `hello`.
    #[default]
    Connecting,
    /// `hello` received; the initial snapshot is being sent.
    Handshaking,
    /// The initial snapshot has been delivered; incremental updates flow.
    Synchronized,
    /// The connection is closed.
    Disconnected,
}

impl Phase {
    /// Checks an incoming client message against the current phase and advances the
    /// phase if the message is `hello`.
    ///
    /// On error, the phase becomes [`Phase::Disconnected`].
    pub fn receive(&mut self, message: &ClientMessage) -> Result<(), ProtocolViolation> {
        let result = match (*self, message) {
            (Phase::Disconnected, _) => Err(ProtocolViolation::Disconnected),
            (Phase::Connecting, ClientMessage::Hello { .. }) => {
                *self = Phase::Handshaking;
                Ok(())
            }
            (Phase::Connecting, other) => Err(ProtocolViolation::ExpectedHello(other.type_name())),
            (Phase::Handshaking | Phase::Synchronized, ClientMessage::Hello { .. }) => {
                Err(ProtocolViolation::RepeatedHello)
            }
            (Phase::Handshaking | Phase::Synchronized, _) => Ok(()),
        };
        if result.is_err() {
            *self = Phase::Disconnected;
        }
        result
    }

    /// Records that a snapshot completion marker has been sent.
    ///
    /// Snapshots resent to a lagging connection leave it [`Phase::Synchronized`].
    pub fn snapshot_sent(&mut self) {
        match *self {
            Phase::Handshaking | Phase::Synchronized => *self = Phase::Synchronized,
            Phase::Connecting | Phase::Disconnected => {
                log::warn!("snapshot sent in phase {self:?}");
            }
        }
    }

    /// Moves to [`Phase::Disconnected`].
    pub fn disconnect(&mut self) {
        *self = Phase::Disconnected;
    }
}

/// A message arrived that the protocol does not allow at that point.
///
/// This is the only kind of error after which the server closes the connection.
#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolViolation {
    /// The first message was not `hello`.
    #[error("expected hello, but received {0}")]
    ExpectedHello(&'static str),
    /// `hello` was sent more than once.
    #[error("hello may only be sent once")]
    RepeatedHello,
    /// A message arrived after the connection was closed.
    #[error("connection is closed")]
    Disconnected,
    /// An incremental update arrived before the snapshot was complete.
    #[error("received {0} before the snapshot was complete")]
    UpdateBeforeSnapshot(&'static str),
    /// The completion marker's total disagrees with the records received.
    #[error("snapshot declared {declared} records but {received} were received")]
    SnapshotCountMismatch {
        /// `total` from the marker.
        declared: usize,
        /// Records actually received.
        received: usize,
    },
    /// The snapshot or an update contradicted the records already received.
    #[error("inconsistent world data: {0}")]
    Inconsistent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FreePoint, Rotation};
    use pretty_assertions::assert_eq;

    fn hello() -> ClientMessage {
        ClientMessage::Hello {
            token: "t".into(),
        }
    }

    fn a_move() -> ClientMessage {
        ClientMessage::Move {
            position: FreePoint::origin(),
            rotation: Rotation::default(),
        }
    }

    #[test]
    fn happy_path() {
        let mut phase = Phase::default();
        assert_eq!(phase, Phase::Connecting);
        phase.receive(&hello()).unwrap();
        assert_eq!(phase, Phase::Handshaking);
        // Requests may be queued while the snapshot is in flight.
        phase.receive(&a_move()).unwrap();
        phase.snapshot_sent();
        assert_eq!(phase, Phase::Synchronized);
        phase.snapshot_sent();
        assert_eq!(phase, Phase::Synchronized);
        phase.disconnect();
        assert_eq!(phase, Phase::Disconnected);
    }

    #[test]
    fn request_before_hello() {
        let mut phase = Phase::default();
        assert_eq!(
            phase.receive(&a_move()),
            Err(ProtocolViolation::ExpectedHello("move"))
        );
        assert_eq!(phase, Phase::Disconnected);
    }

    #[test]
    fn second_hello() {
        let mut phase = Phase::default();
        phase.receive(&hello()).unwrap();
        phase.snapshot_sent();
        assert_eq!(phase.receive(&hello()), Err(ProtocolViolation::RepeatedHello));
        assert_eq!(phase, Phase::Disconnected);
        assert_eq!(phase.receive(&a_move()), Err(ProtocolViolation::Disconnected));
    }
}
