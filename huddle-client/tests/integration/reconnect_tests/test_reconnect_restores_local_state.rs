use huddle_core::ClientMessage;

use crate::integration::init_tracing;
use crate::utils::{ROOM, TestSession, pid, test_config};

fn is_state_frame(msg: &ClientMessage) -> bool {
    matches!(
        msg,
        ClientMessage::UserMuted { .. }
            | ClientMessage::UserVideoToggled { .. }
            | ClientMessage::RaiseHandToggled { .. }
    )
}

#[tokio::test]
async fn test_reconnect_announces_local_state_under_new_id() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;

    assert!(t.session.toggle_mute().unwrap());
    assert!(t.session.toggle_raise_hand().unwrap());
    t.expect(&mut server, |m| matches!(m, ClientMessage::RaiseHandToggled { .. }))
        .await;

    server.disconnect();

    let mut server = t.next_connection().await;
    t.welcome(&mut server, "me2").await;

    // Camera was never turned off, so no video frame sits between these.
    let first = t.expect(&mut server, is_state_frame).await;
    assert!(matches!(
        first,
        ClientMessage::UserMuted { ref participant_id, is_muted: true } if *participant_id == pid("me2")
    ));
    let second = t.expect(&mut server, is_state_frame).await;
    assert!(matches!(
        second,
        ClientMessage::RaiseHandToggled { ref participant_id, is_raise_hand: true } if *participant_id == pid("me2")
    ));
}

#[tokio::test]
async fn test_toggle_before_welcome_reaches_server() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    t.session.join(ROOM, "Me").await.unwrap();
    assert!(t.session.toggle_video().unwrap());

    let mut server = t.next_connection().await;
    t.welcome(&mut server, "me").await;

    let first = t.expect(&mut server, is_state_frame).await;
    assert!(matches!(
        first,
        ClientMessage::UserVideoToggled { ref participant_id, is_video_off: true } if *participant_id == pid("me")
    ));
}
