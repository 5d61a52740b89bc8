use crate::error::Result;
use crate::roster::ParticipantSlot;
use tokio::sync::oneshot;

/// Requests a [`SessionHandle`](crate::SessionHandle) sends to the session task.
#[derive(Debug)]
pub enum SessionCommand {
    JoinRoom {
        room_id: String,
        user_name: String,
        reply: oneshot::Sender<Result<()>>,
    },

    LeaveRoom {
        reply: oneshot::Sender<()>,
    },

    ToggleMute {
        reply: oneshot::Sender<Result<bool>>,
    },

    ToggleVideo {
        reply: oneshot::Sender<Result<bool>>,
    },

    ToggleRaiseHand {
        reply: oneshot::Sender<Result<bool>>,
    },

    SendReaction {
        emoji: String,
        reply: oneshot::Sender<Result<()>>,
    },

    SendMessage {
        text: String,
        reply: oneshot::Sender<Result<()>>,
    },

    /// Replies once capture finished and the display tracks are on the links.
    StartScreenShare {
        reply: oneshot::Sender<Result<()>>,
    },

    StopScreenShare {
        reply: oneshot::Sender<Result<()>>,
    },

    ReportAudioLevel {
        slot: ParticipantSlot,
        level: f32,
    },
}
