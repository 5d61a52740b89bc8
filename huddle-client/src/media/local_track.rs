use huddle_core::TrackKind;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const LOCAL_STREAM_ID: &str = "huddle-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackSource {
    Camera,
    Microphone,
    Screen,
    ScreenAudio,
}

impl TrackSource {
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackSource::Camera | TrackSource::Screen => TrackKind::Video,
            TrackSource::Microphone | TrackSource::ScreenAudio => TrackKind::Audio,
        }
    }

    pub fn is_display(&self) -> bool {
        matches!(self, TrackSource::Screen | TrackSource::ScreenAudio)
    }

    pub fn device_for(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => TrackSource::Microphone,
            TrackKind::Video => TrackSource::Camera,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    /// Released on purpose by this client.
    Stopped,
    /// Ended from the outside: device unplugged, permission revoked,
    /// or the platform's own "stop sharing" control.
    Ended,
}

struct LocalTrackInner {
    id: String,
    source: TrackSource,
    label: String,
    enabled: AtomicBool,
    lifecycle: watch::Sender<Lifecycle>,
    rtp: Arc<TrackLocalStaticSample>,
}

/// Handle to one captured track. Clones share the same underlying track.
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<LocalTrackInner>,
}

impl LocalTrack {
    pub fn new(source: TrackSource, label: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let capability = match source.kind() {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        let rtp = Arc::new(TrackLocalStaticSample::new(
            capability,
            id.clone(),
            LOCAL_STREAM_ID.to_owned(),
        ));
        let (lifecycle, _) = watch::channel(Lifecycle::Live);

        Self {
            inner: Arc::new(LocalTrackInner {
                id,
                source,
                label: label.into(),
                enabled: AtomicBool::new(true),
                lifecycle,
                rtp,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.source.kind()
    }

    pub fn source(&self) -> TrackSource {
        self.inner.source
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        *self.inner.lifecycle.borrow() == Lifecycle::Live
    }

    pub fn stop(&self) {
        self.transition(Lifecycle::Stopped);
    }

    /// Marks the track as ended by its source rather than by this client.
    pub fn end(&self) {
        self.transition(Lifecycle::Ended);
    }

    /// Resolves once the track is no longer live.
    /// Returns `true` only when it ended unexpectedly.
    pub async fn ended(&self) -> bool {
        let mut rx = self.inner.lifecycle.subscribe();
        match rx.wait_for(|state| *state != Lifecycle::Live).await {
            Ok(state) => *state == Lifecycle::Ended,
            Err(_) => false,
        }
    }

    pub fn rtp_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.inner.rtp.clone()
    }

    pub fn same_track(&self, other: &LocalTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn transition(&self, to: Lifecycle) {
        self.inner.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Live {
                *state = to;
                true
            } else {
                false
            }
        });
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("enabled", &self.is_enabled())
            .field("live", &self.is_live())
            .finish()
    }
}
