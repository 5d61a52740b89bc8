use crate::media::MediaEvent;
use crate::peer::LinkEvent;
use crate::roster::ParticipantSlot;
use crate::signaling::SignalingEvent;
use huddle_core::ParticipantId;

/// Everything the session event loop reacts to. Producers (signaling task,
/// peer link tasks, capture recovery, reaction timers) only ever send these;
/// all state mutation happens in the loop that consumes them.
#[derive(Debug)]
pub enum SessionEvent {
    /// Tagged with the channel id so a torn-down channel cannot leak into a new session.
    Signaling { channel: u64, event: SignalingEvent },

    /// Tagged with the link id so events from a replaced link are dropped.
    Link {
        participant: ParticipantId,
        link_id: u64,
        event: LinkEvent,
    },

    Media(MediaEvent),

    ReactionExpired { slot: ParticipantSlot, generation: u64 },
}
