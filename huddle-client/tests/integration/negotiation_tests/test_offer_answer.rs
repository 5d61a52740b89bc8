use huddle_client::NegotiationState;
use huddle_core::{ClientMessage, SdpKind, ServerMessage, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{TestSession, TransportCall, pid, test_config};

#[tokio::test]
async fn test_offer_from_unknown_sender_is_answered() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;

    server.push(ServerMessage::Offer {
        offer: SessionDescription::offer("v=0 from p9"),
        target_id: pid("me"),
        sender_id: pid("p9"),
    });

    let answer = t
        .expect(&mut server, |m| matches!(m, ClientMessage::Answer { .. }))
        .await;
    let ClientMessage::Answer {
        answer,
        target_id,
        sender_id,
    } = answer
    else {
        unreachable!()
    };
    assert_eq!(answer.kind, SdpKind::Answer);
    assert_eq!(target_id, pid("p9"));
    assert_eq!(sender_id, pid("me"));

    assert!(t.session.roster().get(&pid("p9")).is_some());
    assert_eq!(t.factory.created(&pid("p9")), 1);

    let calls: Vec<_> = t
        .factory
        .calls(&pid("p9"))
        .into_iter()
        .filter(|c| !matches!(c, TransportCall::AddTrack(..)))
        .collect();
    assert_eq!(
        calls,
        vec![
            TransportCall::SetRemote(SdpKind::Offer),
            TransportCall::CreateAnswer,
            TransportCall::SetLocal(SdpKind::Answer),
        ]
    );
}

#[tokio::test]
async fn test_answer_without_pending_offer_is_discarded() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;

    server.push(ServerMessage::Offer {
        offer: SessionDescription::offer("v=0 from p9"),
        target_id: pid("me"),
        sender_id: pid("p9"),
    });
    t.expect(&mut server, |m| matches!(m, ClientMessage::Answer { .. }))
        .await;

    server.push(ServerMessage::Answer {
        answer: SessionDescription::answer("late"),
        target_id: pid("me"),
        sender_id: pid("p9"),
    });
    // Commands reach a link in order, so once this renegotiation is
    // answered the stray answer has been dealt with.
    server.push(ServerMessage::Offer {
        offer: SessionDescription::offer("v=0 renegotiate"),
        target_id: pid("me"),
        sender_id: pid("p9"),
    });
    t.expect(&mut server, |m| matches!(m, ClientMessage::Answer { .. }))
        .await;

    assert_eq!(
        t.factory
            .count(&pid("p9"), &TransportCall::SetRemote(SdpKind::Answer)),
        0
    );
    assert_eq!(
        t.factory
            .count(&pid("p9"), &TransportCall::SetRemote(SdpKind::Offer)),
        2
    );
    let link = t.session.links().get(&pid("p9")).expect("Link missing");
    assert_eq!(link.state().negotiation, NegotiationState::Stable);
}

#[tokio::test]
async fn test_frames_for_someone_else_are_ignored() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;

    server.push(ServerMessage::Offer {
        offer: SessionDescription::offer("v=0"),
        target_id: pid("someone-else"),
        sender_id: pid("p9"),
    });
    server.push(ServerMessage::Offer {
        offer: SessionDescription::offer("v=0"),
        target_id: pid("me"),
        sender_id: pid("p8"),
    });
    t.expect(&mut server, |m| matches!(m, ClientMessage::Answer { .. }))
        .await;

    assert!(!t.session.links().contains(&pid("p9")));
    assert!(t.session.links().contains(&pid("p8")));
}
