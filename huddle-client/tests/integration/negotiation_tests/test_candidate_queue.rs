use huddle_client::NegotiationState;
use huddle_core::{SdpKind, ServerMessage, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{TestSession, TransportCall, candidate, pid, test_config};

#[tokio::test]
async fn test_early_candidates_wait_for_remote_description() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;

    for line in ["candidate:early 1", "candidate:early 2"] {
        server.push(ServerMessage::IceCandidate {
            candidate: candidate(line),
            target_id: pid("me"),
            sender_id: pid("p1"),
        });
    }
    server.push(ServerMessage::Answer {
        answer: SessionDescription::answer("v=0 from p1"),
        target_id: pid("me"),
        sender_id: pid("p1"),
    });

    t.pump_until(|s| {
        s.links()
            .get(&pid("p1"))
            .is_some_and(|l| l.state().negotiation == NegotiationState::Stable)
    })
    .await;

    let calls = t.factory.calls(&pid("p1"));
    let position = |call: &TransportCall| calls.iter().position(|c| c == call);
    let answer_at = position(&TransportCall::SetRemote(SdpKind::Answer)).expect("Answer not applied");
    let first = position(&TransportCall::AddCandidate("candidate:early 1".to_owned()))
        .expect("First candidate lost");
    let second = position(&TransportCall::AddCandidate("candidate:early 2".to_owned()))
        .expect("Second candidate lost");

    assert!(answer_at < first);
    assert!(first < second);
}
