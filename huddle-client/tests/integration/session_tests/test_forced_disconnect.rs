use huddle_client::SessionPhase;
use huddle_core::ServerMessage;

use crate::integration::init_tracing;
use crate::utils::{TestSession, test_config};

#[tokio::test]
async fn test_force_disconnect_leaves_with_reason() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1", "p2"]).await;

    server.push(ServerMessage::ForceDisconnect {
        reason: "Removed by the host".to_owned(),
    });
    t.pump_until(|s| s.phase() == SessionPhase::Idle).await;

    assert_eq!(t.session.error(), Some("Removed by the host"));
    assert!(t.session.links().is_empty());
    assert_eq!(t.session.media().held_tracks(), 0);
    assert_eq!(t.session.snapshot().error.as_deref(), Some("Removed by the host"));
}

#[tokio::test]
async fn test_server_shutdown_leaves_with_notice() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let server = t.join_as("me").await;

    server.push(ServerMessage::ServerShutdown {
        message: "Maintenance in 0 minutes".to_owned(),
    });
    t.pump_until(|s| s.phase() == SessionPhase::Idle).await;

    assert_eq!(t.session.error(), Some("Maintenance in 0 minutes"));
    assert!(t.devices.live_tracks().is_empty());
}
