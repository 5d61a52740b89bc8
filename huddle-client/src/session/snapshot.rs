use crate::media::LocalStream;
use crate::roster::Participant;
use crate::session::{ConnectionState, SessionPhase};
use huddle_core::{ChatMessage, ConnectionHealth, NetworkQuality};

/// Read-only view of the session for rendering. A fresh one is published
/// after every state change.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub reconnecting: bool,
    pub local: Participant,
    pub participants: Vec<Participant>,
    pub local_stream: LocalStream,
    pub is_connected: bool,
    pub connection_state: ConnectionState,
    pub network_quality: NetworkQuality,
    pub health: ConnectionHealth,
    pub error: Option<String>,
    pub chat: Vec<ChatMessage>,
    pub is_screen_sharing: bool,
}
