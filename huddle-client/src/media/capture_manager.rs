use crate::error::DeviceError;
use crate::event::SessionEvent;
use crate::media::{LocalStream, LocalTrack, MediaConstraints, MediaDevices, MediaEvent, TrackSource};
use crate::Result;
use huddle_core::TrackKind;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outgoing track changes that every open peer link has to mirror.
pub type TrackReplacements = Vec<(TrackKind, Option<LocalTrack>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndedAction {
    /// Not a track we hold any more.
    Ignored,
    /// The display track went away; run the regular stop-sharing path.
    StopScreenShare,
    /// A device track died and a re-acquisition is scheduled.
    /// `detach` is set when the dead track was on the peer links.
    Recovering { kind: TrackKind, detach: bool },
}

struct ScreenShare {
    video: LocalTrack,
    audio: Option<LocalTrack>,
    /// Device tracks parked while sharing, restored on stop.
    camera: Option<LocalTrack>,
    microphone: Option<LocalTrack>,
}

/// Owns the local capture tracks for one session.
pub struct MediaCaptureManager {
    devices: Arc<dyn MediaDevices>,
    events: mpsc::UnboundedSender<SessionEvent>,
    recovery_delay: Duration,
    stream: LocalStream,
    screen: Option<ScreenShare>,
    is_muted: bool,
    is_video_off: bool,
    recovering: HashMap<TrackSource, JoinHandle<()>>,
    watchers: HashMap<String, JoinHandle<()>>,
}

impl MediaCaptureManager {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        events: mpsc::UnboundedSender<SessionEvent>,
        recovery_delay: Duration,
    ) -> Self {
        Self {
            devices,
            events,
            recovery_delay,
            stream: LocalStream::default(),
            screen: None,
            is_muted: false,
            is_video_off: false,
            recovering: HashMap::new(),
            watchers: HashMap::new(),
        }
    }

    /// Acquires camera and microphone. When the combined request fails each
    /// device is retried alone, so one missing device does not cost the other.
    /// Partial failures are reported as [`MediaEvent::DeviceError`].
    pub async fn acquire(
        &mut self,
        constraints: MediaConstraints,
    ) -> std::result::Result<LocalStream, DeviceError> {
        self.release();

        let mut errors = Vec::new();
        let tracks = match self.devices.get_user_media(constraints).await {
            Ok(tracks) => tracks,
            Err(err) if constraints.audio && constraints.video => {
                warn!("Combined capture failed ({}), retrying per device", err);
                let mut tracks = Vec::new();
                for kind in [TrackKind::Audio, TrackKind::Video] {
                    match self.devices.get_user_media(MediaConstraints::only(kind)).await {
                        Ok(mut acquired) => tracks.append(&mut acquired),
                        Err(e) => errors.push(e),
                    }
                }
                tracks
            }
            Err(err) => {
                errors.push(err);
                Vec::new()
            }
        };

        for track in tracks {
            if self.stream.track(track.kind()).is_some() {
                track.stop();
                continue;
            }
            self.prepare(&track);
            self.stream.set(track.kind(), Some(track));
        }

        if self.stream.is_empty() {
            if let Some(first) = errors.into_iter().next() {
                return Err(first);
            }
            return Ok(self.stream.clone());
        }

        for error in errors {
            let _ = self
                .events
                .send(SessionEvent::Media(MediaEvent::DeviceError(error)));
        }

        info!(
            "Local media acquired (audio: {}, video: {})",
            self.stream.audio().is_some(),
            self.stream.video().is_some()
        );
        Ok(self.stream.clone())
    }

    /// Stops every held track, including tracks parked by a screen share.
    pub fn release(&mut self) {
        for (_, watcher) in self.watchers.drain() {
            watcher.abort();
        }
        for track in self.stream.tracks() {
            track.stop();
        }
        if let Some(share) = self.screen.take() {
            share.video.stop();
            for track in [share.audio, share.camera, share.microphone]
                .into_iter()
                .flatten()
            {
                track.stop();
            }
        }
        self.stream = LocalStream::default();
        for (_, recovery) in self.recovering.drain() {
            recovery.abort();
        }
        self.is_muted = false;
        self.is_video_off = false;
    }

    pub fn local_stream(&self) -> &LocalStream {
        &self.stream
    }

    /// Live tracks this manager is responsible for.
    pub fn held_tracks(&self) -> usize {
        let parked = self.screen.iter().flat_map(|share| {
            share.camera.iter().chain(share.microphone.iter())
        });
        self.stream
            .tracks()
            .iter()
            .chain(parked)
            .filter(|track| track.is_live())
            .count()
    }

    pub fn holds(&self, track_id: &str) -> bool {
        self.stream.tracks().iter().any(|t| t.id() == track_id)
            || self.screen.as_ref().is_some_and(|share| {
                [&share.camera, &share.microphone, &share.audio]
                    .into_iter()
                    .flatten()
                    .any(|t| t.id() == track_id)
            })
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_video_off(&self) -> bool {
        self.is_video_off
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// Returns the new muted state.
    pub fn toggle_mute(&mut self) -> bool {
        self.is_muted = !self.is_muted;
        let enabled = !self.is_muted;
        if let Some(audio) = self.stream.audio() {
            audio.set_enabled(enabled);
        }
        if let Some(mic) = self.screen.as_ref().and_then(|s| s.microphone.as_ref()) {
            mic.set_enabled(enabled);
        }
        self.is_muted
    }

    /// Returns the new video-off state. Applies to the camera even while it
    /// is parked behind a screen share.
    pub fn toggle_video(&mut self) -> bool {
        self.is_video_off = !self.is_video_off;
        if let Some(camera) = self.camera() {
            camera.set_enabled(!self.is_video_off);
        }
        self.is_video_off
    }

    /// Puts `track` on the outgoing stream and returns the one it replaced.
    /// The replaced track is not stopped.
    pub fn swap_video_track(&mut self, track: LocalTrack) -> Option<LocalTrack> {
        self.swap(TrackKind::Video, track)
    }

    pub fn swap_audio_track(&mut self, track: LocalTrack) -> Option<LocalTrack> {
        self.swap(TrackKind::Audio, track)
    }

    pub fn handle_track_ended(&mut self, track_id: &str, source: TrackSource) -> TrackEndedAction {
        self.watchers.remove(track_id);

        if let Some(share) = self.screen.as_mut() {
            if share.video.id() == track_id
                || share.audio.as_ref().is_some_and(|a| a.id() == track_id)
            {
                return TrackEndedAction::StopScreenShare;
            }
            if share.camera.as_ref().is_some_and(|c| c.id() == track_id) {
                share.camera = None;
                self.schedule_recovery(source);
                return TrackEndedAction::Recovering {
                    kind: TrackKind::Video,
                    detach: false,
                };
            }
            if share.microphone.as_ref().is_some_and(|m| m.id() == track_id) {
                share.microphone = None;
                self.schedule_recovery(source);
                return TrackEndedAction::Recovering {
                    kind: TrackKind::Audio,
                    detach: false,
                };
            }
        }

        let kind = source.kind();
        let on_stream = self.stream.track(kind).is_some_and(|t| t.id() == track_id);
        if !on_stream {
            return TrackEndedAction::Ignored;
        }

        warn!("Local {} track ended unexpectedly, scheduling recovery", kind);
        self.stream.set(kind, None);
        self.schedule_recovery(source);
        TrackEndedAction::Recovering { kind, detach: true }
    }

    /// Installs a re-acquired device track. Returns the track when it has to
    /// go out on the peer links (i.e. it is not parked behind a screen share).
    /// A track nobody is waiting for any more is stopped and dropped.
    pub fn apply_recovered(&mut self, source: TrackSource, track: LocalTrack) -> Option<LocalTrack> {
        if self.recovering.remove(&source).is_none() {
            debug!("Dropping stale {} recovery", track.kind());
            track.stop();
            return None;
        }
        self.prepare(&track);

        if let Some(share) = self.screen.as_mut() {
            match track.kind() {
                TrackKind::Video => {
                    share.camera = Some(track);
                    return None;
                }
                TrackKind::Audio if share.audio.is_some() => {
                    share.microphone = Some(track);
                    return None;
                }
                TrackKind::Audio => {}
            }
        }

        if let Some(previous) = self.stream.set(track.kind(), Some(track.clone())) {
            previous.stop();
        }
        info!("Recovered local {} track", track.kind());
        Some(track)
    }

    /// Returns false when the failed recovery was no longer expected.
    pub fn recovery_failed(&mut self, source: TrackSource) -> bool {
        self.recovering.remove(&source).is_some()
    }

    /// Starts display capture off the event loop; the outcome arrives as
    /// [`MediaEvent::ScreenCaptured`].
    pub fn begin_screen_share(&self, reply: Option<oneshot::Sender<Result<()>>>) {
        let devices = self.devices.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = devices.get_display_media(true).await;
            let _ = events.send(SessionEvent::Media(MediaEvent::ScreenCaptured { result, reply }));
        });
    }

    /// Swaps the display tracks in. Without a display audio track the
    /// microphone stays on the links.
    pub fn install_screen_share(
        &mut self,
        tracks: Vec<LocalTrack>,
    ) -> std::result::Result<TrackReplacements, DeviceError> {
        let mut video = None;
        let mut audio = None;
        for track in tracks {
            match track.kind() {
                TrackKind::Video if video.is_none() => video = Some(track),
                TrackKind::Audio if audio.is_none() => audio = Some(track),
                _ => track.stop(),
            }
        }

        let Some(video) = video else {
            if let Some(audio) = audio {
                audio.stop();
            }
            return Err(DeviceError::DisplayUnavailable(
                "no display video track".to_owned(),
            ));
        };

        self.watch(&video);
        let camera = self.stream.set(TrackKind::Video, Some(video.clone()));
        let mut replacements = vec![(TrackKind::Video, Some(video.clone()))];

        let microphone = match &audio {
            Some(display_audio) => {
                display_audio.set_enabled(!self.is_muted);
                self.watch(display_audio);
                replacements.push((TrackKind::Audio, Some(display_audio.clone())));
                self.stream.set(TrackKind::Audio, Some(display_audio.clone()))
            }
            None => {
                info!("No display audio track, keeping the microphone");
                None
            }
        };

        self.screen = Some(ScreenShare {
            video,
            audio,
            camera,
            microphone,
        });
        Ok(replacements)
    }

    /// Stops the display tracks and puts the parked device tracks back.
    pub fn stop_screen_share(&mut self) -> TrackReplacements {
        let Some(share) = self.screen.take() else {
            return Vec::new();
        };

        self.unwatch(&share.video);
        share.video.stop();
        self.stream.set(TrackKind::Video, share.camera.clone());
        let mut replacements = vec![(TrackKind::Video, share.camera)];

        if let Some(audio) = share.audio {
            self.unwatch(&audio);
            audio.stop();
            self.stream.set(TrackKind::Audio, share.microphone.clone());
            replacements.push((TrackKind::Audio, share.microphone));
        }

        info!("Screen share stopped");
        replacements
    }

    fn camera(&self) -> Option<&LocalTrack> {
        match &self.screen {
            Some(share) => share.camera.as_ref(),
            None => self.stream.video(),
        }
    }

    fn swap(&mut self, kind: TrackKind, track: LocalTrack) -> Option<LocalTrack> {
        self.prepare(&track);
        let previous = self.stream.set(kind, Some(track));
        if let Some(previous) = &previous {
            self.unwatch(previous);
        }
        previous
    }

    /// Applies the current mute/video state and starts watching for an
    /// unexpected end.
    fn prepare(&mut self, track: &LocalTrack) {
        match track.source() {
            TrackSource::Microphone | TrackSource::ScreenAudio => track.set_enabled(!self.is_muted),
            TrackSource::Camera => track.set_enabled(!self.is_video_off),
            TrackSource::Screen => track.set_enabled(true),
        }
        self.watch(track);
    }

    fn watch(&mut self, track: &LocalTrack) {
        let events = self.events.clone();
        let watched = track.clone();
        let watcher = tokio::spawn(async move {
            if watched.ended().await {
                let _ = events.send(SessionEvent::Media(MediaEvent::TrackEnded {
                    track_id: watched.id().to_owned(),
                    source: watched.source(),
                }));
            }
        });
        if let Some(old) = self.watchers.insert(track.id().to_owned(), watcher) {
            old.abort();
        }
    }

    fn unwatch(&mut self, track: &LocalTrack) {
        if let Some(watcher) = self.watchers.remove(track.id()) {
            watcher.abort();
        }
    }

    fn schedule_recovery(&mut self, source: TrackSource) {
        if self.recovering.contains_key(&source) {
            return;
        }

        let devices = self.devices.clone();
        let events = self.events.clone();
        let delay = self.recovery_delay;
        let recovery = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let kind = source.kind();
            let event = match devices.get_user_media(MediaConstraints::only(kind)).await {
                Ok(tracks) => match tracks.into_iter().find(|t| t.kind() == kind) {
                    Some(track) => MediaEvent::Recovered { source, track },
                    None => MediaEvent::RecoveryFailed {
                        source,
                        error: DeviceError::unavailable(kind, "no track returned"),
                    },
                },
                Err(err) => MediaEvent::RecoveryFailed {
                    source,
                    error: DeviceError::unavailable(kind, err.to_string()),
                },
            };
            let _ = events.send(SessionEvent::Media(event));
        });
        self.recovering.insert(source, recovery);
    }
}
