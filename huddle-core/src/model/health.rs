use serde::{Deserialize, Serialize};
use std::time::Duration;

const EXCELLENT_BELOW: Duration = Duration::from_millis(150);
const GOOD_BELOW: Duration = Duration::from_millis(300);

/// Liveness of the signaling connection, refreshed by the ping/pong heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealth {
    /// Unix epoch ms of the last successful (re)connect.
    pub connected_at: Option<i64>,
    /// Unix epoch ms of the last ping sent.
    pub last_ping: Option<i64>,
    pub ping_count: u64,
    pub reconnect_count: u32,
    pub is_healthy: bool,
    pub latency_ms: Option<u64>,
}

impl ConnectionHealth {
    pub fn latency(&self) -> Option<Duration> {
        self.latency_ms.map(Duration::from_millis)
    }

    pub fn network_quality(&self) -> NetworkQuality {
        if !self.is_healthy || self.connected_at.is_none() {
            return NetworkQuality::Disconnected;
        }
        match self.latency() {
            Some(latency) => NetworkQuality::from_latency(latency),
            // connected, not measured yet
            None => NetworkQuality::Good,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkQuality {
    Excellent,
    Good,
    Poor,
    Disconnected,
}

impl NetworkQuality {
    pub fn from_latency(latency: Duration) -> Self {
        if latency < EXCELLENT_BELOW {
            Self::Excellent
        } else if latency < GOOD_BELOW {
            Self::Good
        } else {
            Self::Poor
        }
    }
}
