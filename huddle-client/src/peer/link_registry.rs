use crate::event::SessionEvent;
use crate::media::{LocalStream, LocalTrack};
use crate::peer::{PeerLink, PeerTransportFactory};
use huddle_core::{ParticipantId, TrackKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// At most one live link per remote participant.
pub struct PeerLinkRegistry {
    factory: Arc<dyn PeerTransportFactory>,
    events: mpsc::UnboundedSender<SessionEvent>,
    links: HashMap<ParticipantId, PeerLink>,
    next_link_id: u64,
}

impl PeerLinkRegistry {
    pub fn new(
        factory: Arc<dyn PeerTransportFactory>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            factory,
            events,
            links: HashMap::new(),
            next_link_id: 1,
        }
    }

    /// Returns the existing link or spawns a new one carrying `local`'s tracks.
    pub fn get_or_create(&mut self, participant: &ParticipantId, local: &LocalStream) -> &PeerLink {
        self.links.entry(participant.clone()).or_insert_with(|| {
            let link_id = self.next_link_id;
            self.next_link_id += 1;
            info!("Opening peer link {} to {}", link_id, participant);
            PeerLink::spawn(
                participant.clone(),
                link_id,
                self.factory.clone(),
                local.clone(),
                self.events.clone(),
            )
        })
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(participant)
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.links.contains_key(participant)
    }

    /// Tells the link to shut down and forgets it right away.
    pub fn close(&mut self, participant: &ParticipantId) -> bool {
        match self.links.remove(participant) {
            Some(link) => {
                info!("Closing peer link to {}", participant);
                drop(link.close());
                true
            }
            None => false,
        }
    }

    /// Closes every link and waits for the transports to be closed.
    pub async fn close_all(&mut self) {
        let tasks: Vec<_> = self.links.drain().map(|(_, link)| link.close()).collect();
        for task in tasks {
            let _ = task.await;
        }
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.links.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Whether `link_id` is still the live link for `participant`.
    pub fn is_current(&self, participant: &ParticipantId, link_id: u64) -> bool {
        self.links
            .get(participant)
            .is_some_and(|link| link.link_id() == link_id)
    }

    /// Swaps the outgoing track on every open link. Links already shutting
    /// down ignore it.
    pub fn replace_track_all(&self, kind: TrackKind, track: Option<LocalTrack>) {
        for link in self.links.values() {
            link.replace_track(kind, track.clone());
        }
    }
}
