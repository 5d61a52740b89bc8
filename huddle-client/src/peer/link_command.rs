use crate::media::LocalTrack;
use huddle_core::{IceCandidate, SessionDescription, TrackKind};

/// Work items a peer link task processes strictly in arrival order.
#[derive(Debug)]
pub enum LinkCommand {
    /// Create an offer, set it locally and relay it.
    StartOffer,

    /// `polite` decides who backs off when both sides offered at once.
    RemoteOffer {
        offer: SessionDescription,
        polite: bool,
    },

    RemoteAnswer(SessionDescription),

    RemoteCandidate(IceCandidate),

    /// Swap the outgoing track of `kind` in place; `None` detaches it.
    ReplaceTrack {
        kind: TrackKind,
        track: Option<LocalTrack>,
    },
}
