use huddle_client::NegotiationState;
use huddle_core::{ClientMessage, SdpKind, ServerMessage, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{TestSession, TransportCall, pid, test_config};

fn colliding_offer(from: &str, to: &str) -> ServerMessage {
    ServerMessage::Offer {
        offer: SessionDescription::offer(format!("v=0 from {from}")),
        target_id: pid(to),
        sender_id: pid(from),
    }
}

#[tokio::test]
async fn test_polite_side_rolls_back_and_answers() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("a").await;
    t.add_participants(&mut server, &["b"]).await;

    server.push(colliding_offer("b", "a"));
    t.expect(&mut server, |m| matches!(m, ClientMessage::Answer { .. }))
        .await;

    let calls = t.factory.calls(&pid("b"));
    let rollback = calls
        .iter()
        .position(|c| *c == TransportCall::Rollback)
        .expect("No rollback");
    let remote = calls
        .iter()
        .position(|c| *c == TransportCall::SetRemote(SdpKind::Offer))
        .expect("Offer not applied");
    assert!(rollback < remote);

    let link = t.session.links().get(&pid("b")).expect("Link missing");
    assert_eq!(link.state().negotiation, NegotiationState::Stable);
    assert_eq!(t.factory.created(&pid("b")), 1);
}

#[tokio::test]
async fn test_impolite_side_keeps_its_offer() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("z").await;
    t.add_participants(&mut server, &["b"]).await;

    server.push(colliding_offer("b", "z"));
    // Only applies while our own offer is still pending.
    server.push(ServerMessage::Answer {
        answer: SessionDescription::answer("v=0 from b"),
        target_id: pid("z"),
        sender_id: pid("b"),
    });
    t.pump_until(|s| {
        s.links()
            .get(&pid("b"))
            .is_some_and(|l| l.state().negotiation == NegotiationState::Stable)
    })
    .await;

    assert_eq!(t.factory.count(&pid("b"), &TransportCall::Rollback), 0);
    assert_eq!(
        t.factory
            .count(&pid("b"), &TransportCall::SetRemote(SdpKind::Offer)),
        0
    );
    assert_eq!(
        t.factory
            .count(&pid("b"), &TransportCall::SetRemote(SdpKind::Answer)),
        1
    );
    assert!(
        !server
            .drain()
            .iter()
            .any(|m| matches!(m, ClientMessage::Answer { .. }))
    );
}

#[tokio::test]
async fn test_failed_rollback_rebuilds_the_transport() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    t.factory.set_fail_rollback(true);
    let mut server = t.join_as("a").await;
    t.add_participants(&mut server, &["b"]).await;

    server.push(colliding_offer("b", "a"));
    t.expect(&mut server, |m| matches!(m, ClientMessage::Answer { .. }))
        .await;

    assert_eq!(t.factory.created(&pid("b")), 2);
    let calls = t.factory.calls(&pid("b"));
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, TransportCall::AddTrack(..)))
            .count(),
        2,
        "Fresh transport should carry the local tracks again"
    );
    assert!(calls.contains(&TransportCall::SetRemote(SdpKind::Offer)));
}
