use huddle_client::{DeviceError, TrackSource};
use huddle_core::TrackKind;

use crate::integration::init_tracing;
use crate::utils::{TestSession, pid, test_config, wait_until};

fn first_issued(t: &TestSession, source: TrackSource) -> String {
    t.devices
        .issued(source)
        .first()
        .map(|track| track.id().to_owned())
        .expect("Nothing issued")
}

#[tokio::test]
async fn test_screen_share_round_trip_restores_camera() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;

    let camera = t.session.media().local_stream().video().cloned().unwrap();
    let mic = t.session.media().local_stream().audio().cloned().unwrap();
    assert!(t.session.toggle_video().unwrap());

    t.session.start_screen_share().unwrap();
    t.pump_until(|s| s.media().is_screen_sharing()).await;
    assert!(t.session.snapshot().is_screen_sharing);

    let display = first_issued(&t, TrackSource::Screen);
    let display_audio = first_issued(&t, TrackSource::ScreenAudio);
    let factory = t.factory.clone();
    wait_until(|| {
        factory.outgoing(&pid("p1"), TrackKind::Video).as_deref() == Some(display.as_str())
            && factory.outgoing(&pid("p1"), TrackKind::Audio).as_deref()
                == Some(display_audio.as_str())
    })
    .await;
    assert!(camera.is_live(), "Camera is parked, not stopped");

    t.session.stop_screen_share().unwrap();
    assert!(!t.session.media().is_screen_sharing());
    wait_until(|| {
        factory.outgoing(&pid("p1"), TrackKind::Video).as_deref() == Some(camera.id())
            && factory.outgoing(&pid("p1"), TrackKind::Audio).as_deref() == Some(mic.id())
    })
    .await;

    assert!(!camera.is_enabled(), "Video-off survives the share");
    assert!(t.devices.issued(TrackSource::Screen).is_empty());
    assert!(t.devices.issued(TrackSource::ScreenAudio).is_empty());
    assert_eq!(t.session.media().held_tracks(), 2);
}

#[tokio::test]
async fn test_platform_ending_capture_stops_sharing() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;
    let camera = t.session.media().local_stream().video().cloned().unwrap();

    t.session.start_screen_share().unwrap();
    t.pump_until(|s| s.media().is_screen_sharing()).await;

    assert_eq!(t.devices.unplug(TrackSource::Screen), 1);
    t.pump_until(|s| !s.media().is_screen_sharing()).await;

    let factory = t.factory.clone();
    wait_until(|| factory.outgoing(&pid("p1"), TrackKind::Video).as_deref() == Some(camera.id()))
        .await;
    assert!(camera.is_enabled());
    assert!(!t.session.snapshot().is_screen_sharing);
}

#[tokio::test]
async fn test_share_without_display_audio_keeps_microphone() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    t.devices.set_unavailable(
        TrackSource::ScreenAudio,
        DeviceError::DisplayUnavailable("no loopback".to_owned()),
    );
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;
    let mic = t.session.media().local_stream().audio().cloned().unwrap();

    t.session.start_screen_share().unwrap();
    t.pump_until(|s| s.media().is_screen_sharing()).await;

    let display = first_issued(&t, TrackSource::Screen);
    let factory = t.factory.clone();
    wait_until(|| {
        factory.outgoing(&pid("p1"), TrackKind::Video).as_deref() == Some(display.as_str())
    })
    .await;

    assert_eq!(
        factory.outgoing(&pid("p1"), TrackKind::Audio).as_deref(),
        Some(mic.id())
    );
    assert!(
        t.session
            .media()
            .local_stream()
            .audio()
            .is_some_and(|a| a.same_track(&mic))
    );

    // Muting while sharing still silences the microphone.
    assert!(t.session.toggle_mute().unwrap());
    assert!(!mic.is_enabled());
}

#[tokio::test]
async fn test_denied_capture_reports_error() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    t.devices.set_unavailable(
        TrackSource::Screen,
        DeviceError::PermissionDenied(TrackKind::Video),
    );
    let _server = t.join_as("me").await;

    t.session.start_screen_share().unwrap();
    t.pump_until(|s| s.error().is_some()).await;

    assert!(!t.session.media().is_screen_sharing());
    assert_eq!(
        t.session.error(),
        Some("Permission to use the video was denied")
    );
}
