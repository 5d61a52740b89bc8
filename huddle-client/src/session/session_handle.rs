use crate::error::{Result, SessionError};
use crate::roster::ParticipantSlot;
use crate::session::{SessionCommand, SessionSnapshot};
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front door to a session running on its own task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self { commands, snapshot }
    }

    pub async fn join_room(&self, room_id: impl Into<String>, user_name: impl Into<String>) -> Result<()> {
        let room_id = room_id.into();
        let user_name = user_name.into();
        self.request(|reply| SessionCommand::JoinRoom {
            room_id,
            user_name,
            reply,
        })
        .await?
    }

    pub async fn leave_room(&self) -> Result<()> {
        self.request(|reply| SessionCommand::LeaveRoom { reply }).await
    }

    pub async fn toggle_mute(&self) -> Result<bool> {
        self.request(|reply| SessionCommand::ToggleMute { reply }).await?
    }

    pub async fn toggle_video(&self) -> Result<bool> {
        self.request(|reply| SessionCommand::ToggleVideo { reply }).await?
    }

    pub async fn toggle_raise_hand(&self) -> Result<bool> {
        self.request(|reply| SessionCommand::ToggleRaiseHand { reply }).await?
    }

    pub async fn send_reaction(&self, emoji: impl Into<String>) -> Result<()> {
        let emoji = emoji.into();
        self.request(|reply| SessionCommand::SendReaction { emoji, reply })
            .await?
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendMessage { text, reply })
            .await?
    }

    pub async fn start_screen_share(&self) -> Result<()> {
        self.request(|reply| SessionCommand::StartScreenShare { reply })
            .await?
    }

    pub async fn stop_screen_share(&self) -> Result<()> {
        self.request(|reply| SessionCommand::StopScreenShare { reply })
            .await?
    }

    pub async fn report_audio_level(&self, slot: ParticipantSlot, level: f32) -> Result<()> {
        self.commands
            .send(SessionCommand::ReportAudioLevel { slot, level })
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}
