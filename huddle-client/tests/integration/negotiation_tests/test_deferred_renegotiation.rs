use huddle_client::{DeviceError, NegotiationState, TrackSource};
use huddle_core::{ClientMessage, ServerMessage, SessionDescription, TrackKind};

use crate::integration::init_tracing;
use crate::utils::{TestSession, TransportCall, pid, test_config, wait_until};

#[tokio::test]
async fn test_sender_added_while_offering_is_offered_after_answer() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    t.devices.set_unavailable(
        TrackSource::Camera,
        DeviceError::NotFound(TrackKind::Video),
    );
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;
    assert!(t.session.media().local_stream().video().is_none());

    // The offer to p1 is still unanswered when the display track shows up.
    t.session.start_screen_share().unwrap();
    t.pump_until(|s| s.media().is_screen_sharing()).await;
    let display = t.devices.issued(TrackSource::Screen)[0].id().to_owned();
    let factory = t.factory.clone();
    wait_until(|| factory.outgoing(&pid("p1"), TrackKind::Video).as_deref() == Some(display.as_str()))
        .await;
    assert_eq!(
        t.factory
            .count(&pid("p1"), &TransportCall::CreateOffer { ice_restart: false }),
        1
    );

    server.push(ServerMessage::Answer {
        answer: SessionDescription::answer("v=0 from p1"),
        target_id: pid("me"),
        sender_id: pid("p1"),
    });

    let offer = t
        .expect(&mut server, |m| matches!(m, ClientMessage::Offer { .. }))
        .await;
    assert!(matches!(offer, ClientMessage::Offer { ref target_id, .. } if *target_id == pid("p1")));
    assert_eq!(
        t.factory
            .count(&pid("p1"), &TransportCall::CreateOffer { ice_restart: false }),
        2
    );
    let link = t.session.links().get(&pid("p1")).expect("Link missing");
    assert_eq!(link.state().negotiation, NegotiationState::HaveLocalOffer);
}
