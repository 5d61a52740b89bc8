use huddle_client::{RemoteTrack, TransportEvent};
use huddle_core::{ServerMessage, TrackKind};

use crate::integration::init_tracing;
use crate::utils::{TestSession, pid, test_config};

#[tokio::test]
async fn test_remote_mute_disables_received_audio() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1", "p2"]).await;

    let audio = RemoteTrack::new("p1-audio", TrackKind::Audio, "p1-stream");
    t.factory
        .emit(&pid("p1"), TransportEvent::TrackAdded(audio.clone()));
    t.pump_until(|s| {
        s.roster()
            .get(&pid("p1"))
            .is_some_and(|p| p.track(TrackKind::Audio).is_some())
    })
    .await;

    server.push(ServerMessage::UserMuted {
        participant_id: pid("p1"),
        is_muted: true,
    });
    t.pump_until(|s| s.roster().get(&pid("p1")).is_some_and(|p| p.is_muted))
        .await;

    assert!(!audio.is_enabled());
    assert!(!t.session.roster().local().is_muted);
    assert!(!t.session.roster().get(&pid("p2")).unwrap().is_muted);

    server.push(ServerMessage::UserMuted {
        participant_id: pid("p1"),
        is_muted: false,
    });
    t.pump_until(|s| s.roster().get(&pid("p1")).is_some_and(|p| !p.is_muted))
        .await;
    assert!(audio.is_enabled());
}

#[tokio::test]
async fn test_echo_of_own_state_is_ignored() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let server = t.join_as("me").await;

    server.push(ServerMessage::UserMuted {
        participant_id: pid("me"),
        is_muted: true,
    });
    server.push(ServerMessage::RaiseHandToggled {
        participant_id: pid("me"),
        is_raise_hand: true,
    });
    server.push(ServerMessage::Error {
        message: "sync".to_owned(),
    });
    t.pump_until(|s| s.error() == Some("sync")).await;

    assert!(!t.session.roster().local().is_muted);
    assert!(!t.session.roster().local().is_raise_hand);
}

#[tokio::test]
async fn test_host_changes_move_the_flag() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1", "p2"]).await;

    server.push(ServerMessage::HostChanged {
        new_host_id: pid("p1"),
        new_host_name: "User p1".to_owned(),
    });
    t.pump_until(|s| s.roster().get(&pid("p1")).is_some_and(|p| p.is_host))
        .await;
    assert!(!t.session.roster().local().is_host);

    server.push(ServerMessage::HostChanged {
        new_host_id: pid("me"),
        new_host_name: "Me".to_owned(),
    });
    t.pump_until(|s| s.roster().local().is_host).await;

    let hosts = t
        .session
        .snapshot()
        .participants
        .iter()
        .filter(|p| p.is_host)
        .count();
    assert_eq!(hosts, 0);
}

#[tokio::test]
async fn test_user_left_drops_participant_and_link() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1", "p2"]).await;

    server.push(ServerMessage::UserLeft {
        participant_id: pid("p1"),
        user_name: "User p1".to_owned(),
    });
    t.pump_until(|s| s.roster().get(&pid("p1")).is_none()).await;

    assert!(!t.session.links().contains(&pid("p1")));
    assert!(t.session.links().contains(&pid("p2")));
}
