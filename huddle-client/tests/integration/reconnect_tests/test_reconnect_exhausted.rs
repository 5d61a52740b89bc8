use huddle_client::{ConnectionState, SessionPhase};

use crate::integration::init_tracing;
use crate::utils::{TestSession, test_config};

#[tokio::test]
async fn test_exhausted_reconnects_force_a_leave() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;

    t.connector.set_refusing(true);
    server.disconnect();

    t.pump_until(|s| s.is_reconnecting()).await;
    let snapshot = t.session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Reconnecting);
    assert!(!snapshot.is_connected);
    assert_eq!(snapshot.participants.len(), 1, "Roster survives a reconnect");

    t.pump_until(|s| s.phase() == SessionPhase::Idle).await;

    // One initial connection plus two retries.
    assert_eq!(t.connector.attempts(), 3);
    let error = t.session.error().expect("No error after giving up");
    assert!(error.starts_with("Failed to reconnect"), "{error}");
    assert!(t.session.links().is_empty());
    assert_eq!(t.session.media().held_tracks(), 0);
    assert_eq!(
        t.session.snapshot().connection_state,
        ConnectionState::Disconnected
    );
}
