use crate::peer::RemoteTrack;
use huddle_core::{ParticipantId, ParticipantInfo, TrackKind};
use tokio::time::Instant;

/// Addresses either the local participant or a remote one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParticipantSlot {
    Local,
    Remote(ParticipantId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceStatus {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveReaction {
    pub symbol: String,
    pub expires_at: Instant,
    pub(crate) generation: u64,
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub is_host: bool,
    pub is_muted: bool,
    pub is_video_off: bool,
    pub is_raise_hand: bool,
    pub is_speaking: bool,
    pub active_reaction: Option<ActiveReaction>,
    pub status: PresenceStatus,
    pub tracks: Vec<RemoteTrack>,
    pub is_local: bool,
}

impl Participant {
    pub fn local(name: impl Into<String>) -> Self {
        let mut participant = Self::remote(ParticipantId::from(""), name);
        participant.is_local = true;
        participant
    }

    pub fn remote(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_host: false,
            is_muted: false,
            is_video_off: false,
            is_raise_hand: false,
            is_speaking: false,
            active_reaction: None,
            status: PresenceStatus::Online,
            tracks: Vec::new(),
            is_local: false,
        }
    }

    pub fn from_info(info: ParticipantInfo) -> Self {
        let mut participant = Self::remote(info.id, info.user_name);
        participant.is_host = info.is_host;
        participant.is_muted = info.is_muted;
        participant.is_video_off = info.is_video_off;
        participant.is_raise_hand = info.is_raise_hand;
        participant
    }

    pub fn is_online(&self) -> bool {
        self.status == PresenceStatus::Online
    }

    pub fn track(&self, kind: TrackKind) -> Option<&RemoteTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    /// Brings presentation attributes in line with a server record.
    /// Tracks and transient state are left alone.
    pub(crate) fn apply_info(&mut self, info: &ParticipantInfo) {
        self.name = info.user_name.clone();
        self.is_host = info.is_host;
        self.is_raise_hand = info.is_raise_hand;
        self.set_muted(info.is_muted);
        self.set_video_off(info.is_video_off);
        self.status = PresenceStatus::Online;
    }

    /// Keeps the received audio track's enabled flag in line with the flag shown.
    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.is_muted = muted;
        if let Some(track) = self.track(TrackKind::Audio) {
            track.set_enabled(!muted);
        }
    }

    pub(crate) fn set_video_off(&mut self, video_off: bool) {
        self.is_video_off = video_off;
        if let Some(track) = self.track(TrackKind::Video) {
            track.set_enabled(!video_off);
        }
    }
}
