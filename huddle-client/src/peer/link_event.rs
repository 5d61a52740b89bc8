use crate::peer::{LinkConnectionState, RemoteTrack};
use huddle_core::{IceCandidate, SessionDescription};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::New => "new",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
            NegotiationState::Stable => "stable",
            NegotiationState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    pub negotiation: NegotiationState,
    pub connection: LinkConnectionState,
}

impl LinkState {
    pub fn is_closed(&self) -> bool {
        self.negotiation == NegotiationState::Closed
    }
}

/// What a peer link reports back to the session loop.
#[derive(Debug)]
pub enum LinkEvent {
    LocalOffer(SessionDescription),
    LocalAnswer(SessionDescription),
    LocalCandidate(IceCandidate),
    TrackAdded(RemoteTrack),
    StateChanged(LinkState),
    /// The link gave up and closed itself.
    Terminated { reason: String },
    /// A negotiation step failed; the link stays usable.
    NegotiationFailed(String),
}
