use crate::media::LocalTrack;
use crate::peer::RemoteTrack;
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription, TrackKind};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Callbacks of one transport, delivered to the link that owns it.
#[derive(Debug)]
pub enum TransportEvent {
    CandidateGenerated(IceCandidate),
    TrackAdded(RemoteTrack),
    ConnectionStateChanged(LinkConnectionState),
    IceStateChanged(IceState),
}

/// One negotiated media connection to a single remote participant.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self, ice_restart: bool) -> anyhow::Result<SessionDescription>;

    async fn create_answer(&self) -> anyhow::Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> anyhow::Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> anyhow::Result<()>;

    /// Drops a pending local offer and returns to stable.
    async fn rollback(&self) -> anyhow::Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> anyhow::Result<()>;

    async fn add_track(&self, track: &LocalTrack) -> anyhow::Result<()>;

    /// Replaces the outgoing track of `kind` without renegotiating.
    /// Returns `true` when no sender existed yet and one had to be added,
    /// in which case the caller must renegotiate.
    async fn replace_track(&self, kind: TrackKind, track: Option<&LocalTrack>)
    -> anyhow::Result<bool>;

    async fn close(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PeerTransportFactory: Send + Sync + 'static {
    async fn create(
        &self,
        participant: &ParticipantId,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> anyhow::Result<Box<dyn PeerTransport>>;
}
