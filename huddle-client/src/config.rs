use crate::media::MediaConstraints;
use huddle_core::IceServerConfig;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Everything a session needs to know before it joins a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    pub reconnect: ReconnectPolicy,
    pub heartbeat: HeartbeatConfig,
    pub constraints: MediaConstraints,
    pub speaking: SpeakingConfig,
    #[serde(with = "millis")]
    pub reaction_ttl: Duration,
    #[serde(with = "millis")]
    pub device_recovery_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:3001/ws".to_owned(),
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
            reconnect: ReconnectPolicy::default(),
            heartbeat: HeartbeatConfig::default(),
            constraints: MediaConstraints::default(),
            speaking: SpeakingConfig::default(),
            reaction_ttl: Duration::from_secs(3),
            device_recovery_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Consecutive unanswered pings before the connection is reported unhealthy.
    pub max_missed: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_missed: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SpeakingConfig {
    /// Normalized audio level (0.0..=1.0) that counts as speech.
    pub threshold: f32,
    #[serde(with = "millis")]
    pub hold: Duration,
}

impl Default for SpeakingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            hold: Duration::from_millis(300),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
