use huddle_client::HeartbeatConfig;
use huddle_core::{ClientMessage, NetworkQuality, ServerMessage};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestSession, test_config};

fn heartbeat_config() -> huddle_client::SessionConfig {
    huddle_client::SessionConfig {
        heartbeat: HeartbeatConfig {
            interval: Duration::from_secs(5),
            max_missed: 3,
        },
        ..test_config()
    }
}

#[tokio::test(start_paused = true)]
async fn test_pong_measures_latency() {
    init_tracing();

    let mut t = TestSession::new(heartbeat_config());
    let mut server = t.join_as("me").await;
    assert_eq!(t.session.snapshot().network_quality, NetworkQuality::Good);

    let ping = t
        .expect(&mut server, |m| matches!(m, ClientMessage::Ping { .. }))
        .await;
    let ClientMessage::Ping { timestamp } = ping else {
        unreachable!()
    };

    tokio::time::advance(Duration::from_millis(40)).await;
    server.push(ServerMessage::Pong {
        timestamp,
        connection_health: None,
    });
    t.pump_until(|s| s.snapshot().health.latency_ms.is_some())
        .await;

    let snapshot = t.session.snapshot();
    assert_eq!(snapshot.health.latency_ms, Some(40));
    assert_eq!(snapshot.health.ping_count, 1);
    assert_eq!(snapshot.health.last_ping, Some(timestamp));
    assert_eq!(snapshot.network_quality, NetworkQuality::Excellent);
}

#[tokio::test(start_paused = true)]
async fn test_ping_timestamps_strictly_increase() {
    init_tracing();

    let mut t = TestSession::new(heartbeat_config());
    let mut server = t.join_as("me").await;

    let mut stamps = Vec::new();
    for _ in 0..3 {
        let ping = t
            .expect(&mut server, |m| matches!(m, ClientMessage::Ping { .. }))
            .await;
        if let ClientMessage::Ping { timestamp } = ping {
            stamps.push(timestamp);
            server.push(ServerMessage::Pong {
                timestamp,
                connection_health: None,
            });
        }
    }

    assert!(stamps.windows(2).all(|w| w[0] < w[1]), "{stamps:?}");
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_pings_mark_connection_unhealthy() {
    init_tracing();

    let mut t = TestSession::new(heartbeat_config());
    let mut server = t.join_as("me").await;
    assert!(t.session.snapshot().health.is_healthy);

    // Never answered.
    for _ in 0..3 {
        t.expect(&mut server, |m| matches!(m, ClientMessage::Ping { .. }))
            .await;
    }
    t.pump_until(|s| !s.snapshot().health.is_healthy).await;

    let snapshot = t.session.snapshot();
    assert_eq!(snapshot.network_quality, NetworkQuality::Disconnected);
    assert!(snapshot.is_connected, "Still joined, only the link quality dropped");

    // A late pong brings it back.
    server.push(ServerMessage::Pong {
        timestamp: 0,
        connection_health: None,
    });
    t.pump_until(|s| s.snapshot().health.is_healthy).await;
    assert_ne!(
        t.session.snapshot().network_quality,
        NetworkQuality::Disconnected
    );
}
