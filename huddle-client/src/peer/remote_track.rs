use huddle_core::TrackKind;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

struct RemoteTrackInner {
    id: String,
    kind: TrackKind,
    stream_id: String,
    enabled: AtomicBool,
    rtc: Option<Arc<TrackRemote>>,
}

/// An inbound track. The owning peer link keeps it alive; the roster only
/// holds clones of this handle.
#[derive(Clone)]
pub struct RemoteTrack {
    inner: Arc<RemoteTrackInner>,
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind, stream_id: impl Into<String>) -> Self {
        Self::build(id.into(), kind, stream_id.into(), None)
    }

    pub(crate) fn from_rtc(track: Arc<TrackRemote>) -> Option<Self> {
        let kind = match track.kind() {
            RTPCodecType::Audio => TrackKind::Audio,
            RTPCodecType::Video => TrackKind::Video,
            _ => return None,
        };
        Some(Self::build(
            track.id(),
            kind,
            track.stream_id(),
            Some(track),
        ))
    }

    fn build(id: String, kind: TrackKind, stream_id: String, rtc: Option<Arc<TrackRemote>>) -> Self {
        Self {
            inner: Arc::new(RemoteTrackInner {
                id,
                kind,
                stream_id,
                enabled: AtomicBool::new(true),
                rtc,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn stream_id(&self) -> &str {
        &self.inner.stream_id
    }

    /// Whether playback of this track should have any effect locally.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn rtc_track(&self) -> Option<&Arc<TrackRemote>> {
        self.inner.rtc.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
