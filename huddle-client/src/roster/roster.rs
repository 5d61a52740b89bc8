use crate::event::SessionEvent;
use crate::peer::RemoteTrack;
use crate::roster::{ActiveReaction, Participant, ParticipantSlot, PresenceStatus};
use huddle_core::{ParticipantId, ParticipantInfo};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// The local participant plus every remote participant we know of,
/// in join order.
pub struct Roster {
    local: Participant,
    remote: Vec<Participant>,
    reaction_ttl: Duration,
    reaction_timers: HashMap<ParticipantSlot, JoinHandle<()>>,
    next_generation: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Outcome of applying an authoritative participant list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub added: Vec<ParticipantId>,
    pub removed: Vec<ParticipantId>,
}

impl Roster {
    pub fn new(reaction_ttl: Duration, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            local: Participant::local(""),
            remote: Vec::new(),
            reaction_ttl,
            reaction_timers: HashMap::new(),
            next_generation: 0,
            events,
        }
    }

    pub fn reset_local(&mut self, name: impl Into<String>) {
        self.cancel_reaction(&ParticipantSlot::Local);
        self.local = Participant::local(name);
    }

    /// The server hands out a fresh id on every connection.
    pub fn set_local_id(&mut self, id: ParticipantId) {
        self.local.id = id;
    }

    pub fn local_id(&self) -> Option<&ParticipantId> {
        if self.local.id.as_str().is_empty() {
            None
        } else {
            Some(&self.local.id)
        }
    }

    pub fn is_local(&self, id: &ParticipantId) -> bool {
        self.local_id() == Some(id)
    }

    pub fn local(&self) -> &Participant {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut Participant {
        &mut self.local
    }

    pub fn participants(&self) -> &[Participant] {
        &self.remote
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.remote.iter().find(|p| &p.id == id)
    }

    fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.remote.iter_mut().find(|p| &p.id == id)
    }

    fn slot_mut(&mut self, slot: &ParticipantSlot) -> Option<&mut Participant> {
        match slot {
            ParticipantSlot::Local => Some(&mut self.local),
            ParticipantSlot::Remote(id) => self.get_mut(id),
        }
    }

    /// Inserts or refreshes a participant. Returns `true` when it was new.
    pub fn upsert(&mut self, info: ParticipantInfo) -> bool {
        if self.is_local(&info.id) {
            return false;
        }
        match self.get_mut(&info.id) {
            Some(existing) => {
                existing.apply_info(&info);
                false
            }
            None => {
                self.remote.push(Participant::from_info(info));
                true
            }
        }
    }

    /// Makes sure a participant we only know from a relayed frame has an entry.
    pub fn ensure(&mut self, id: &ParticipantId) -> bool {
        if self.is_local(id) || self.get(id).is_some() {
            return false;
        }
        self.remote
            .push(Participant::remote(id.clone(), id.as_str().to_owned()));
        true
    }

    /// Treats `snapshot` as the full room: anyone missing is dropped,
    /// newcomers are added, everyone else keeps their tracks.
    pub fn reconcile(&mut self, snapshot: &[ParticipantInfo]) -> Reconciliation {
        let present: HashSet<&ParticipantId> = snapshot.iter().map(|p| &p.id).collect();

        let removed: Vec<ParticipantId> = self
            .remote
            .iter()
            .filter(|p| !present.contains(&p.id))
            .map(|p| p.id.clone())
            .collect();
        for id in &removed {
            self.remove(id);
        }

        let mut added = Vec::new();
        for info in snapshot {
            let id = info.id.clone();
            if self.upsert(info.clone()) {
                added.push(id);
            }
        }

        Reconciliation { added, removed }
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        let index = self.remote.iter().position(|p| &p.id == id)?;
        self.cancel_reaction(&ParticipantSlot::Remote(id.clone()));
        Some(self.remote.remove(index))
    }

    /// The link to this participant is gone; keep the entry until they leave.
    pub fn mark_offline(&mut self, id: &ParticipantId) -> bool {
        match self.get_mut(id) {
            Some(participant) => {
                participant.status = PresenceStatus::Offline;
                participant.tracks.clear();
                participant.is_speaking = false;
                true
            }
            None => false,
        }
    }

    pub fn set_muted(&mut self, id: &ParticipantId, muted: bool) -> bool {
        self.get_mut(id).map(|p| p.set_muted(muted)).is_some()
    }

    pub fn set_video_off(&mut self, id: &ParticipantId, video_off: bool) -> bool {
        self.get_mut(id).map(|p| p.set_video_off(video_off)).is_some()
    }

    pub fn set_raise_hand(&mut self, id: &ParticipantId, raised: bool) -> bool {
        self.get_mut(id).map(|p| p.is_raise_hand = raised).is_some()
    }

    /// Exactly one participant, possibly the local one, ends up as host.
    pub fn set_host(&mut self, host: &ParticipantId) {
        self.local.is_host = self.local_id() == Some(host);
        for participant in &mut self.remote {
            participant.is_host = &participant.id == host;
        }
    }

    /// Records an inbound track, replacing an earlier one of the same kind.
    pub fn attach_track(&mut self, id: &ParticipantId, track: RemoteTrack) -> bool {
        let Some(participant) = self.get_mut(id) else {
            return false;
        };
        participant.status = PresenceStatus::Online;
        participant.tracks.retain(|t| t.kind() != track.kind());
        participant.tracks.push(track);
        let (muted, video_off) = (participant.is_muted, participant.is_video_off);
        participant.set_muted(muted);
        participant.set_video_off(video_off);
        true
    }

    /// Returns `true` if the flag changed.
    pub fn set_speaking(&mut self, slot: &ParticipantSlot, speaking: bool) -> bool {
        match self.slot_mut(slot) {
            Some(participant) if participant.is_speaking != speaking => {
                participant.is_speaking = speaking;
                true
            }
            _ => false,
        }
    }

    /// Shows `symbol` for the reaction TTL, replacing and cancelling any
    /// reaction still pending for the same participant.
    pub fn show_reaction(&mut self, slot: ParticipantSlot, symbol: impl Into<String>) -> bool {
        self.next_generation += 1;
        let generation = self.next_generation;
        let expires_at = Instant::now() + self.reaction_ttl;

        let Some(participant) = self.slot_mut(&slot) else {
            return false;
        };
        participant.active_reaction = Some(ActiveReaction {
            symbol: symbol.into(),
            expires_at,
            generation,
        });

        let events = self.events.clone();
        let timer_slot = slot.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let _ = events.send(SessionEvent::ReactionExpired {
                slot: timer_slot,
                generation,
            });
        });
        if let Some(previous) = self.reaction_timers.insert(slot, timer) {
            previous.abort();
        }
        true
    }

    /// Clears the reaction if `generation` is still the one displayed.
    pub fn expire_reaction(&mut self, slot: &ParticipantSlot, generation: u64) -> bool {
        let Some(participant) = self.slot_mut(slot) else {
            return false;
        };
        match &participant.active_reaction {
            Some(reaction) if reaction.generation == generation => {
                participant.active_reaction = None;
                self.reaction_timers.remove(slot);
                true
            }
            _ => {
                debug!("Ignoring stale reaction expiry for {:?}", slot);
                false
            }
        }
    }

    fn cancel_reaction(&mut self, slot: &ParticipantSlot) {
        if let Some(timer) = self.reaction_timers.remove(slot) {
            timer.abort();
        }
    }

    /// Drops every remote participant and resets the local one.
    pub fn clear(&mut self) {
        for (_, timer) in self.reaction_timers.drain() {
            timer.abort();
        }
        self.remote.clear();
        self.local = Participant::local("");
    }
}
