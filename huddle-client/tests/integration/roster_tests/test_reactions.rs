use futures::FutureExt;
use huddle_client::Session;
use huddle_core::{ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::time::Instant;

use crate::integration::init_tracing;
use crate::utils::{TestSession, pid, test_config};

/// Lets spawned timers run, then handles whatever they produced.
async fn settle(session: &mut Session) {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    while let Some(Some(event)) = session.next_event().now_or_never() {
        session.handle_event(event).await;
    }
}

fn local_symbol(session: &Session) -> Option<String> {
    session
        .roster()
        .local()
        .active_reaction
        .as_ref()
        .map(|r| r.symbol.clone())
}

#[tokio::test(start_paused = true)]
async fn test_reaction_lasts_exactly_its_ttl() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;

    let start = Instant::now();
    t.session.send_reaction("👍").unwrap();
    let reaction = t.session.roster().local().active_reaction.clone().unwrap();
    assert_eq!(reaction.expires_at, start + Duration::from_secs(3));

    let sent = t
        .expect(&mut server, |m| matches!(m, ClientMessage::Reaction { .. }))
        .await;
    assert!(matches!(sent, ClientMessage::Reaction { ref emoji, .. } if emoji == "👍"));

    tokio::time::advance(start + Duration::from_millis(2999) - Instant::now()).await;
    settle(&mut t.session).await;
    assert_eq!(local_symbol(&t.session).as_deref(), Some("👍"));

    tokio::time::advance(Duration::from_millis(1)).await;
    t.pump_until(|s| s.roster().local().active_reaction.is_none())
        .await;
    assert!(t.session.snapshot().local.active_reaction.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_newer_reaction_replaces_and_outlives_older() {
    init_tracing();

    let mut t = TestSession::new(test_config());
    let mut server = t.join_as("me").await;
    t.add_participants(&mut server, &["p1"]).await;
    let symbol = |s: &Session| {
        s.roster()
            .get(&pid("p1"))
            .and_then(|p| p.active_reaction.as_ref())
            .map(|r| r.symbol.clone())
    };

    let start = Instant::now();
    server.push(ServerMessage::Reaction {
        emoji: "👍".to_owned(),
        sender_id: pid("p1"),
        timestamp: 1,
    });
    t.pump_until(|s| symbol(s).is_some()).await;
    let first = t
        .session
        .roster()
        .get(&pid("p1"))
        .and_then(|p| p.active_reaction.clone())
        .unwrap();
    assert_eq!(first.expires_at, start + Duration::from_secs(3));

    tokio::time::advance(Duration::from_secs(1)).await;
    server.push(ServerMessage::Reaction {
        emoji: "🎉".to_owned(),
        sender_id: pid("p1"),
        timestamp: 2,
    });
    t.pump_until(|s| symbol(s).as_deref() == Some("🎉")).await;

    // Past the first reaction's deadline.
    tokio::time::advance(Duration::from_millis(2500)).await;
    settle(&mut t.session).await;
    assert_eq!(symbol(&t.session).as_deref(), Some("🎉"));

    tokio::time::advance(Duration::from_millis(500)).await;
    t.pump_until(|s| symbol(s).is_none()).await;
    assert!(t.session.roster().get(&pid("p1")).is_some());
}
