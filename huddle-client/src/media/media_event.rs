use crate::error::{DeviceError, Result};
use crate::media::{LocalTrack, TrackSource};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum MediaEvent {
    TrackEnded {
        track_id: String,
        source: TrackSource,
    },

    Recovered {
        source: TrackSource,
        track: LocalTrack,
    },

    RecoveryFailed {
        source: TrackSource,
        error: DeviceError,
    },

    /// A requested device could not be acquired while others were.
    DeviceError(DeviceError),

    ScreenCaptured {
        result: std::result::Result<Vec<LocalTrack>, DeviceError>,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
}
