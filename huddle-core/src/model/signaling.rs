use crate::model::chat::ChatMessage;
use crate::model::health::ConnectionHealth;
use crate::model::participant::{ParticipantId, ParticipantInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// Frames sent by a participant to the rendezvous server.
/// Relayed negotiation frames always carry both ends so interleaved
/// negotiations with different participants stay apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinRoom {
        room_id: String,
        user_name: String,
    },
    LeaveRoom {
        room_id: String,
    },
    Offer {
        offer: SessionDescription,
        target_id: ParticipantId,
        sender_id: ParticipantId,
    },
    Answer {
        answer: SessionDescription,
        target_id: ParticipantId,
        sender_id: ParticipantId,
    },
    IceCandidate {
        candidate: IceCandidate,
        target_id: ParticipantId,
        sender_id: ParticipantId,
    },
    UserMuted {
        participant_id: ParticipantId,
        is_muted: bool,
    },
    UserVideoToggled {
        participant_id: ParticipantId,
        is_video_off: bool,
    },
    RaiseHandToggled {
        participant_id: ParticipantId,
        is_raise_hand: bool,
    },
    Reaction {
        emoji: String,
        sender_id: ParticipantId,
        timestamp: i64,
    },
    SendMessage {
        id: String,
        text: String,
    },
    Ping {
        timestamp: i64,
    },
}

impl ClientMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "join-room",
            ClientMessage::LeaveRoom { .. } => "leave-room",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::UserMuted { .. } => "user-muted",
            ClientMessage::UserVideoToggled { .. } => "user-video-toggled",
            ClientMessage::RaiseHandToggled { .. } => "raise-hand-toggled",
            ClientMessage::Reaction { .. } => "reaction",
            ClientMessage::SendMessage { .. } => "send-message",
            ClientMessage::Ping { .. } => "ping",
        }
    }
}

/// Frames pushed by the rendezvous server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    Welcome {
        participant_id: ParticipantId,
    },
    UserJoined {
        participant: ParticipantInfo,
    },
    CurrentParticipants(Vec<ParticipantInfo>),
    UserLeft {
        participant_id: ParticipantId,
        #[serde(default)]
        user_name: String,
    },
    Offer {
        offer: SessionDescription,
        target_id: ParticipantId,
        sender_id: ParticipantId,
    },
    Answer {
        answer: SessionDescription,
        target_id: ParticipantId,
        sender_id: ParticipantId,
    },
    IceCandidate {
        candidate: IceCandidate,
        target_id: ParticipantId,
        sender_id: ParticipantId,
    },
    UserMuted {
        participant_id: ParticipantId,
        is_muted: bool,
    },
    UserVideoToggled {
        participant_id: ParticipantId,
        is_video_off: bool,
    },
    RaiseHandToggled {
        participant_id: ParticipantId,
        is_raise_hand: bool,
    },
    Reaction {
        emoji: String,
        sender_id: ParticipantId,
        timestamp: i64,
    },
    NewMessage(ChatMessage),
    Pong {
        timestamp: i64,
        #[serde(default)]
        connection_health: Option<ConnectionHealth>,
    },
    BufferedMessages(Vec<ServerMessage>),
    HostChanged {
        new_host_id: ParticipantId,
        #[serde(default)]
        new_host_name: String,
    },
    ServerShutdown {
        #[serde(default)]
        message: String,
    },
    ForceDisconnect {
        #[serde(default)]
        reason: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::UserJoined { .. } => "user-joined",
            ServerMessage::CurrentParticipants(_) => "current-participants",
            ServerMessage::UserLeft { .. } => "user-left",
            ServerMessage::Offer { .. } => "offer",
            ServerMessage::Answer { .. } => "answer",
            ServerMessage::IceCandidate { .. } => "ice-candidate",
            ServerMessage::UserMuted { .. } => "user-muted",
            ServerMessage::UserVideoToggled { .. } => "user-video-toggled",
            ServerMessage::RaiseHandToggled { .. } => "raise-hand-toggled",
            ServerMessage::Reaction { .. } => "reaction",
            ServerMessage::NewMessage(_) => "new-message",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::BufferedMessages(_) => "buffered-messages",
            ServerMessage::HostChanged { .. } => "host-changed",
            ServerMessage::ServerShutdown { .. } => "server-shutdown",
            ServerMessage::ForceDisconnect { .. } => "force-disconnect",
            ServerMessage::Error { .. } => "error",
        }
    }

    /// Only transient chat and reactions are replayed from a buffered batch.
    pub fn is_replayable(&self) -> bool {
        matches!(
            self,
            ServerMessage::NewMessage(_) | ServerMessage::Reaction { .. }
        )
    }
}
