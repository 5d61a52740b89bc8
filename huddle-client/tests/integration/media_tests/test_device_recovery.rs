use huddle_client::{DeviceError, TrackSource};
use huddle_core::TrackKind;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{ROOM, TestSession, pid, test_config, wait_until};

#[tokio::test]
async fn test_unplugged_camera_is_recovered_on_every_link() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1", "p2"]).await;
    let old = t.session.media().local_stream().video().cloned().unwrap();

    assert_eq!(t.devices.unplug(TrackSource::Camera), 1);

    t.pump_until(|s| {
        s.media()
            .local_stream()
            .video()
            .is_some_and(|v| v.id() != old.id())
    })
    .await;
    let fresh = t.session.media().local_stream().video().cloned().unwrap();
    assert!(fresh.is_live());

    let factory = t.factory.clone();
    wait_until(|| {
        ["p1", "p2"].iter().all(|id| {
            factory.outgoing(&pid(id), TrackKind::Video).as_deref() == Some(fresh.id())
        })
    })
    .await;
    assert!(t.session.error().is_none());
}

#[tokio::test]
async fn test_recovered_camera_keeps_video_off() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let _server = t.join_as("me").await;
    let old = t.session.media().local_stream().video().cloned().unwrap();
    assert!(t.session.toggle_video().unwrap());

    t.devices.unplug(TrackSource::Camera);
    t.pump_until(|s| {
        s.media()
            .local_stream()
            .video()
            .is_some_and(|v| v.id() != old.id())
    })
    .await;

    let fresh = t.session.media().local_stream().video().cloned().unwrap();
    assert!(!fresh.is_enabled());
}

#[tokio::test]
async fn test_failed_recovery_surfaces_device_error() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;

    t.devices.set_unavailable(
        TrackSource::Camera,
        DeviceError::NotFound(TrackKind::Video),
    );
    t.devices.unplug(TrackSource::Camera);

    t.pump_until(|s| s.error().is_some()).await;

    let error = t.session.error().unwrap();
    assert!(error.starts_with("Camera unavailable"), "{error}");
    assert!(t.session.media().local_stream().video().is_none());
    assert!(t.session.media().local_stream().audio().is_some());

    let factory = t.factory.clone();
    wait_until(|| factory.outgoing(&pid("p1"), TrackKind::Video).is_none()).await;
}

#[tokio::test]
async fn test_recovery_from_previous_session_is_discarded() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let _server = t.join_as("me").await;

    t.devices.unplug(TrackSource::Camera);
    t.pump_until(|s| s.media().local_stream().video().is_none())
        .await;

    // Let the re-acquired camera land in the queue without handling it.
    tokio::time::sleep(Duration::from_millis(150)).await;
    t.session.leave().await;

    t.session.join(ROOM, "Me").await.unwrap();
    let joined = t.session.media().local_stream().video().cloned().unwrap();
    let mut server = t.next_connection().await;
    t.welcome(&mut server, "me").await;
    t.add_participants(&mut server, &["p1"]).await;

    let current = t.session.media().local_stream().video().cloned().unwrap();
    assert_eq!(current.id(), joined.id());
    assert!(current.is_live());
    assert_eq!(t.devices.issued(TrackSource::Camera).len(), 1);

    let factory = t.factory.clone();
    wait_until(|| factory.outgoing(&pid("p1"), TrackKind::Video).as_deref() == Some(joined.id()))
        .await;
}
