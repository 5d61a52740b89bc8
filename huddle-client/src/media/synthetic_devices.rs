use crate::error::DeviceError;
use crate::media::{LocalTrack, MediaConstraints, MediaDevices, TrackSource};
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::TrackKind;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct SyntheticInner {
    unavailable: DashMap<TrackSource, DeviceError>,
    issued: DashMap<String, LocalTrack>,
}

/// Capture devices that hand out silent, frameless tracks.
/// Availability can be switched per source and live tracks can be
/// "unplugged", which is how headless participants and tests exercise
/// the device-loss paths.
#[derive(Clone, Default)]
pub struct SyntheticDevices {
    inner: Arc<SyntheticInner>,
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, source: TrackSource, error: DeviceError) {
        self.inner.unavailable.insert(source, error);
    }

    pub fn set_available(&self, source: TrackSource) {
        self.inner.unavailable.remove(&source);
    }

    /// Live tracks handed out for `source`.
    pub fn issued(&self, source: TrackSource) -> Vec<LocalTrack> {
        self.inner
            .issued
            .iter()
            .filter(|entry| entry.value().source() == source && entry.value().is_live())
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn live_tracks(&self) -> Vec<LocalTrack> {
        self.inner
            .issued
            .iter()
            .filter(|entry| entry.value().is_live())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Ends every live track of `source` as if the device went away.
    pub fn unplug(&self, source: TrackSource) -> usize {
        let tracks = self.issued(source);
        for track in &tracks {
            track.end();
        }
        tracks.len()
    }

    fn check(&self, source: TrackSource) -> Result<(), DeviceError> {
        match self.inner.unavailable.get(&source) {
            Some(error) => Err(error.value().clone()),
            None => Ok(()),
        }
    }

    fn issue(&self, source: TrackSource) -> LocalTrack {
        let label = match source {
            TrackSource::Camera => "Synthetic camera",
            TrackSource::Microphone => "Synthetic microphone",
            TrackSource::Screen => "Synthetic display",
            TrackSource::ScreenAudio => "Synthetic display audio",
        };
        let track = LocalTrack::new(source, label);
        debug!("Issued {:?} track {}", source, track.id());
        self.inner.issued.insert(track.id().to_owned(), track.clone());
        track
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<LocalTrack>, DeviceError> {
        let sources: Vec<TrackSource> = [TrackKind::Audio, TrackKind::Video]
            .into_iter()
            .filter(|kind| constraints.wants(*kind))
            .map(TrackSource::device_for)
            .collect();

        for source in &sources {
            self.check(*source)?;
        }

        Ok(sources.into_iter().map(|source| self.issue(source)).collect())
    }

    async fn get_display_media(&self, with_audio: bool) -> Result<Vec<LocalTrack>, DeviceError> {
        self.check(TrackSource::Screen)?;

        let mut tracks = vec![self.issue(TrackSource::Screen)];
        if with_audio && self.check(TrackSource::ScreenAudio).is_ok() {
            tracks.push(self.issue(TrackSource::ScreenAudio));
        }
        Ok(tracks)
    }
}
