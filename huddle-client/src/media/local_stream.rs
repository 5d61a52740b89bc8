use crate::media::LocalTrack;
use huddle_core::TrackKind;

/// The outgoing track set: at most one audio and one video track.
#[derive(Debug, Clone, Default)]
pub struct LocalStream {
    audio: Option<LocalTrack>,
    video: Option<LocalTrack>,
}

impl LocalStream {
    pub fn audio(&self) -> Option<&LocalTrack> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&LocalTrack> {
        self.video.as_ref()
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        match kind {
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Video => self.video.as_ref(),
        }
    }

    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.audio.iter().chain(self.video.iter()).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }

    /// Replaces the slot for `kind`, returning what was there.
    pub(crate) fn set(&mut self, kind: TrackKind, track: Option<LocalTrack>) -> Option<LocalTrack> {
        let slot = match kind {
            TrackKind::Audio => &mut self.audio,
            TrackKind::Video => &mut self.video,
        };
        std::mem::replace(slot, track)
    }
}
