mod chat;
mod health;
mod participant;
mod signaling;
mod track;

pub use chat::ChatMessage;
pub use health::{ConnectionHealth, NetworkQuality};
pub use participant::{ParticipantId, ParticipantInfo};
pub use signaling::{
    ClientMessage, IceCandidate, IceServerConfig, SdpKind, ServerMessage, SessionDescription,
};
pub use track::TrackKind;
