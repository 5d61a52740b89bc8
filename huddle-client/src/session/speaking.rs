use crate::config::SpeakingConfig;
use crate::roster::ParticipantSlot;
use std::collections::HashMap;
use tokio::time::Instant;

/// Turns sampled audio levels into a speaking flag with a short hold,
/// so pauses between words don't flicker.
#[derive(Debug)]
pub struct SpeakingDetector {
    config: SpeakingConfig,
    last_loud: HashMap<ParticipantSlot, Instant>,
}

impl SpeakingDetector {
    pub fn new(config: SpeakingConfig) -> Self {
        Self {
            config,
            last_loud: HashMap::new(),
        }
    }

    /// Feeds one level sample (0.0..=1.0) and returns whether the
    /// participant counts as speaking.
    pub fn observe(&mut self, slot: &ParticipantSlot, level: f32, now: Instant) -> bool {
        if level >= self.config.threshold {
            self.last_loud.insert(slot.clone(), now);
            return true;
        }
        match self.last_loud.get(slot) {
            Some(at) if now.duration_since(*at) < self.config.hold => true,
            Some(_) => {
                self.last_loud.remove(slot);
                false
            }
            None => false,
        }
    }

    pub fn forget(&mut self, slot: &ParticipantSlot) {
        self.last_loud.remove(slot);
    }

    pub fn clear(&mut self) {
        self.last_loud.clear();
    }
}
