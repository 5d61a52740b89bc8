use huddle_client::SessionPhase;
use huddle_core::{ClientMessage, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{ROOM, TestSession, pid, test_config};

#[tokio::test]
async fn test_handle_drives_spawned_session() {
    init_tracing();

    let TestSession {
        session,
        mut accepted,
        ..
    } = TestSession::new(test_config());
    let handle = session.spawn();
    let mut snapshots = handle.subscribe();

    handle.join_room(ROOM, "Me").await.expect("Failed to join");
    let mut server = accepted.recv().await.expect("Client never connected");
    let join = server.recv().await;
    assert!(matches!(join, ClientMessage::JoinRoom { .. }));
    server.push(ServerMessage::Welcome {
        participant_id: pid("me"),
    });

    snapshots
        .wait_for(|s| s.phase == SessionPhase::Active && s.local.id == pid("me"))
        .await
        .expect("Session stopped");

    assert!(handle.toggle_mute().await.unwrap());
    let muted = server
        .recv_matching(|m| matches!(m, ClientMessage::UserMuted { .. }))
        .await;
    assert!(matches!(muted, ClientMessage::UserMuted { is_muted: true, .. }));

    handle.start_screen_share().await.expect("Share failed");
    assert!(handle.snapshot().is_screen_sharing);
    handle.stop_screen_share().await.unwrap();
    assert!(!handle.snapshot().is_screen_sharing);

    handle.leave_room().await.unwrap();
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert!(snapshot.local_stream.is_empty());
    assert!(handle.toggle_mute().await.is_err());
}
