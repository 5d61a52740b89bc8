use crate::error::TransportError;
use huddle_core::{ConnectionHealth, ServerMessage};

#[derive(Debug)]
pub enum SignalingEvent {
    /// The socket is up and `join-room` has already been sent on it.
    Connected {
        reconnected: bool,
        health: ConnectionHealth,
    },

    Message(ServerMessage),

    Health(ConnectionHealth),

    /// The connection is down; attempt `attempt` follows after a backoff.
    Reconnecting { attempt: u32, error: TransportError },

    /// Reconnect attempts are exhausted. The channel has stopped.
    Failed(TransportError),

    Closed,
}
