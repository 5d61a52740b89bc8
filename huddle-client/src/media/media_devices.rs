use crate::error::DeviceError;
use crate::media::LocalTrack;
use async_trait::async_trait;
use huddle_core::TrackKind;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl MediaConstraints {
    pub fn only(kind: TrackKind) -> Self {
        Self {
            audio: kind == TrackKind::Audio,
            video: kind == TrackKind::Video,
        }
    }

    pub fn wants(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio,
            TrackKind::Video => self.video,
        }
    }
}

/// The platform capture stack.
#[async_trait]
pub trait MediaDevices: Send + Sync + 'static {
    /// Camera and/or microphone. Fails as a whole if any requested device fails.
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<LocalTrack>, DeviceError>;

    /// A display video track plus, when the platform offers one, display audio.
    async fn get_display_media(&self, with_audio: bool) -> Result<Vec<LocalTrack>, DeviceError>;
}
