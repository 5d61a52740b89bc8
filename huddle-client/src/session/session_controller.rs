use crate::clock::now_ms;
use crate::config::SessionConfig;
use crate::error::{DeviceError, Result, SessionError};
use crate::event::SessionEvent;
use crate::media::{LocalTrack, MediaCaptureManager, MediaDevices, MediaEvent, TrackEndedAction};
use crate::peer::{LinkEvent, PeerLinkRegistry, PeerTransportFactory};
use crate::roster::{Participant, ParticipantSlot, Roster};
use crate::session::{
    ConnectionState, SessionCommand, SessionHandle, SessionPhase, SessionSnapshot,
    SpeakingDetector,
};
use crate::signaling::{SignalingChannel, SignalingConnector, SignalingEvent, SignalingHandle};
use huddle_core::{
    ChatMessage, ClientMessage, ConnectionHealth, NetworkQuality, ParticipantId, ServerMessage,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const COMMAND_BUFFER: usize = 64;

/// The meeting client: owns signaling, local media, peer links and the
/// roster, and mutates them only from [`Session::handle_event`] and the
/// public actions, all on one task.
pub struct Session {
    config: SessionConfig,
    connector: Arc<dyn SignalingConnector>,
    phase: SessionPhase,
    reconnecting: bool,
    room_id: Option<String>,
    roster: Roster,
    links: PeerLinkRegistry,
    media: MediaCaptureManager,
    signaling: Option<SignalingHandle>,
    next_channel_id: u64,
    health: ConnectionHealth,
    error: Option<String>,
    chat: Vec<ChatMessage>,
    chat_ids: HashSet<String>,
    speaking: SpeakingDetector,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn SignalingConnector>,
        factory: Arc<dyn PeerTransportFactory>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let roster = Roster::new(config.reaction_ttl, events_tx.clone());
        let links = PeerLinkRegistry::new(factory, events_tx.clone());
        let media =
            MediaCaptureManager::new(devices, events_tx.clone(), config.device_recovery_delay);
        let speaking = SpeakingDetector::new(config.speaking);

        let session = Self {
            config,
            connector,
            phase: SessionPhase::Idle,
            reconnecting: false,
            room_id: None,
            roster,
            links,
            media,
            signaling: None,
            next_channel_id: 1,
            health: ConnectionHealth::default(),
            error: None,
            chat: Vec::new(),
            chat_ids: HashSet::new(),
            speaking,
            events_tx,
            events_rx,
            snapshot: watch::channel(Self::empty_snapshot()).0,
        };
        session.publish();
        session
    }

    /// Moves the session onto its own task and returns a handle to it.
    /// Dropping every handle leaves the room and stops the task.
    pub fn spawn(self) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SessionHandle::new(commands_tx, self.subscribe());
        tokio::spawn(self.run(commands_rx));
        handle
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Session event loop started");

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All session handles dropped. Leaving.");
                            self.leave().await;
                            break;
                        }
                    }
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                }
            }
        }

        info!("Session event loop finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::JoinRoom {
                room_id,
                user_name,
                reply,
            } => {
                let _ = reply.send(self.join(&room_id, &user_name).await);
            }
            SessionCommand::LeaveRoom { reply } => {
                self.leave().await;
                let _ = reply.send(());
            }
            SessionCommand::ToggleMute { reply } => {
                let _ = reply.send(self.toggle_mute());
            }
            SessionCommand::ToggleVideo { reply } => {
                let _ = reply.send(self.toggle_video());
            }
            SessionCommand::ToggleRaiseHand { reply } => {
                let _ = reply.send(self.toggle_raise_hand());
            }
            SessionCommand::SendReaction { emoji, reply } => {
                let _ = reply.send(self.send_reaction(&emoji));
            }
            SessionCommand::SendMessage { text, reply } => {
                let _ = reply.send(self.send_message(&text));
            }
            SessionCommand::StartScreenShare { reply } => {
                self.request_screen_share(Some(reply));
            }
            SessionCommand::StopScreenShare { reply } => {
                let _ = reply.send(self.stop_screen_share());
            }
            SessionCommand::ReportAudioLevel { slot, level } => {
                self.report_audio_level(slot, level);
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn links(&self) -> &PeerLinkRegistry {
        &self.links
    }

    pub fn media(&self) -> &MediaCaptureManager {
        &self.media
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Acquires local media and starts connecting. The session turns
    /// `Active` once the signaling channel is up and has joined the room.
    pub async fn join(&mut self, room_id: &str, user_name: &str) -> Result<()> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::invalid_state("join", self.phase));
        }

        info!("Joining room {} as {}", room_id, user_name);
        self.phase = SessionPhase::Joining;
        self.error = None;
        self.roster.reset_local(user_name);
        self.publish();

        if let Err(e) = self.media.acquire(self.config.constraints).await {
            error!("Could not acquire local media: {}", e);
            self.phase = SessionPhase::Idle;
            self.error = Some(e.to_string());
            self.publish();
            return Err(e.into());
        }

        let local = self.roster.local_mut();
        local.is_muted = self.media.is_muted();
        local.is_video_off = self.media.is_video_off();

        let channel_id = self.next_channel_id;
        self.next_channel_id += 1;
        let channel = SignalingChannel {
            connector: self.connector.clone(),
            endpoint: self.config.signaling_url.clone(),
            room_id: room_id.to_owned(),
            user_name: user_name.to_owned(),
            reconnect: self.config.reconnect,
            heartbeat: self.config.heartbeat,
        };
        self.signaling = Some(channel.connect(channel_id, self.events_tx.clone()));
        self.room_id = Some(room_id.to_owned());
        self.publish();
        Ok(())
    }

    /// Tears everything down. Safe to call in any phase and any number of times.
    pub async fn leave(&mut self) {
        self.teardown(None).await;
    }

    async fn teardown(&mut self, error: Option<String>) {
        let forced = error.is_some();
        if self.phase != SessionPhase::Idle {
            info!("Leaving room (forced: {})", forced);
        }
        self.phase = SessionPhase::Leaving;
        self.publish();

        if let Some(signaling) = self.signaling.take() {
            if !forced && let Some(room_id) = self.room_id.clone() {
                signaling.send(ClientMessage::LeaveRoom { room_id });
            }
            signaling.disconnect().await;
        }
        self.links.close_all().await;
        self.media.release();
        self.roster.clear();
        self.speaking.clear();
        self.chat.clear();
        self.chat_ids.clear();
        self.health = ConnectionHealth::default();
        self.reconnecting = false;
        self.room_id = None;
        self.error = error;
        self.phase = SessionPhase::Idle;
        self.publish();
    }

    /// Returns the new muted state.
    pub fn toggle_mute(&mut self) -> Result<bool> {
        self.require_joined("toggle mute")?;
        let muted = self.media.toggle_mute();
        self.roster.local_mut().is_muted = muted;
        if let Some(id) = self.roster.local_id().cloned() {
            self.send(ClientMessage::UserMuted {
                participant_id: id,
                is_muted: muted,
            });
        }
        self.publish();
        Ok(muted)
    }

    pub fn toggle_video(&mut self) -> Result<bool> {
        self.require_joined("toggle video")?;
        let video_off = self.media.toggle_video();
        self.roster.local_mut().is_video_off = video_off;
        if let Some(id) = self.roster.local_id().cloned() {
            self.send(ClientMessage::UserVideoToggled {
                participant_id: id,
                is_video_off: video_off,
            });
        }
        self.publish();
        Ok(video_off)
    }

    pub fn toggle_raise_hand(&mut self) -> Result<bool> {
        self.require_joined("raise hand")?;
        let local = self.roster.local_mut();
        local.is_raise_hand = !local.is_raise_hand;
        let raised = local.is_raise_hand;
        if let Some(id) = self.roster.local_id().cloned() {
            self.send(ClientMessage::RaiseHandToggled {
                participant_id: id,
                is_raise_hand: raised,
            });
        }
        self.publish();
        Ok(raised)
    }

    pub fn send_reaction(&mut self, emoji: &str) -> Result<()> {
        self.require_active("send a reaction")?;
        self.roster.show_reaction(ParticipantSlot::Local, emoji);
        if let Some(id) = self.roster.local_id().cloned() {
            self.send(ClientMessage::Reaction {
                emoji: emoji.to_owned(),
                sender_id: id,
                timestamp: now_ms(),
            });
        }
        self.publish();
        Ok(())
    }

    pub fn send_message(&mut self, text: &str) -> Result<()> {
        self.require_active("send a message")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::Protocol("message is empty".to_owned()));
        }

        let id = Uuid::new_v4().to_string();
        self.send(ClientMessage::SendMessage {
            id: id.clone(),
            text: text.to_owned(),
        });
        if let Some(sender_id) = self.roster.local_id().cloned() {
            let sender_name = self.roster.local().name.clone();
            self.push_chat(ChatMessage {
                id,
                sender_id,
                sender_name,
                text: text.to_owned(),
                timestamp: now_ms(),
            });
        }
        self.publish();
        Ok(())
    }

    /// Starts display capture; the share goes live when capture completes.
    pub fn start_screen_share(&mut self) -> Result<()> {
        self.require_active("share the screen")?;
        self.request_screen_share(None);
        Ok(())
    }

    fn request_screen_share(&mut self, reply: Option<oneshot::Sender<Result<()>>>) {
        if let Err(e) = self.require_active("share the screen") {
            if let Some(reply) = reply {
                let _ = reply.send(Err(e));
            }
            return;
        }
        if self.media.is_screen_sharing() {
            if let Some(reply) = reply {
                let _ = reply.send(Ok(()));
            }
            return;
        }
        self.media.begin_screen_share(reply);
    }

    pub fn stop_screen_share(&mut self) -> Result<()> {
        if !self.media.is_screen_sharing() {
            return Ok(());
        }
        for (kind, track) in self.media.stop_screen_share() {
            self.links.replace_track_all(kind, track);
        }
        self.publish();
        Ok(())
    }

    pub fn report_audio_level(&mut self, slot: ParticipantSlot, level: f32) {
        let speaking = self.speaking.observe(&slot, level, Instant::now());
        if self.roster.set_speaking(&slot, speaking) {
            self.publish();
        }
    }

    /// Waits for the next thing that happened to the session.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Signaling { channel, event } => {
                let current = self.signaling.as_ref().map(SignalingHandle::channel_id);
                if current != Some(channel) {
                    debug!("Dropping event from stale signaling channel {}", channel);
                    return;
                }
                self.handle_signaling_event(event).await;
            }

            SessionEvent::Link {
                participant,
                link_id,
                event,
            } => {
                if !self.links.is_current(&participant, link_id) {
                    debug!("Dropping event from stale link {} to {}", link_id, participant);
                    return;
                }
                self.handle_link_event(participant, event);
            }

            SessionEvent::Media(event) => self.handle_media_event(event),

            SessionEvent::ReactionExpired { slot, generation } => {
                if self.roster.expire_reaction(&slot, generation) {
                    self.publish();
                }
            }
        }
    }

    async fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected {
                reconnected,
                health,
            } => {
                self.health = health;
                self.reconnecting = false;
                if reconnected {
                    info!("Signaling reconnected, waiting for room snapshot");
                    self.error = None;
                }
                if self.phase == SessionPhase::Joining {
                    self.phase = SessionPhase::Active;
                }
            }

            SignalingEvent::Message(message) => {
                if let Some(reason) = self.handle_server_message(message) {
                    warn!("Server ended the session: {}", reason);
                    self.teardown(Some(reason)).await;
                    return;
                }
            }

            SignalingEvent::Health(health) => {
                self.health = health;
            }

            SignalingEvent::Reconnecting { attempt, error } => {
                self.health.is_healthy = false;
                self.reconnecting = self.phase == SessionPhase::Active;
                warn!("Signaling reconnect attempt {}: {}", attempt, error);
                self.error = Some(SessionError::from(error).to_string());
            }

            SignalingEvent::Failed(error) => {
                let message = format!("Failed to reconnect: {}", SessionError::from(error));
                error!("{}", message);
                self.teardown(Some(message)).await;
                return;
            }

            SignalingEvent::Closed => {
                debug!("Signaling channel closed");
            }
        }
        self.publish();
    }

    /// Applies one server frame. Returns a reason when the server ended the
    /// session and a forced leave has to follow.
    fn handle_server_message(&mut self, message: ServerMessage) -> Option<String> {
        match message {
            ServerMessage::Welcome { participant_id } => {
                info!("Server assigned participant id {}", participant_id);
                self.roster.set_local_id(participant_id);
                self.announce_local_state();
            }

            ServerMessage::UserJoined { participant } => {
                if self.roster.is_local(&participant.id) {
                    return None;
                }
                let id = participant.id.clone();
                info!("{} ({}) joined", participant.user_name, id);
                self.roster.upsert(participant);
                self.connect_to(&id);
            }

            ServerMessage::CurrentParticipants(snapshot) => {
                if let Some(me) = self
                    .roster
                    .local_id()
                    .and_then(|id| snapshot.iter().find(|p| &p.id == id))
                {
                    let is_host = me.is_host;
                    self.roster.local_mut().is_host = is_host;
                }

                let outcome = self.roster.reconcile(&snapshot);
                for id in &outcome.removed {
                    self.links.close(id);
                    self.speaking.forget(&ParticipantSlot::Remote(id.clone()));
                }
                for participant in &snapshot {
                    if !self.roster.is_local(&participant.id) {
                        self.connect_to(&participant.id);
                    }
                }
                info!(
                    "Room snapshot applied: {} present, {} added, {} removed",
                    self.roster.participants().len(),
                    outcome.added.len(),
                    outcome.removed.len()
                );
            }

            ServerMessage::UserLeft {
                participant_id,
                user_name,
            } => {
                info!("{} ({}) left", user_name, participant_id);
                self.roster.remove(&participant_id);
                self.links.close(&participant_id);
                self.speaking
                    .forget(&ParticipantSlot::Remote(participant_id));
            }

            ServerMessage::Offer {
                offer,
                target_id,
                sender_id,
            } => {
                if !self.is_for_me(&target_id, &sender_id, "offer") {
                    return None;
                }
                self.roster.ensure(&sender_id);
                let polite = self
                    .roster
                    .local_id()
                    .is_some_and(|local| local < &sender_id);
                let stream = self.media.local_stream().clone();
                self.links
                    .get_or_create(&sender_id, &stream)
                    .apply_remote_offer(offer, polite);
            }

            ServerMessage::Answer {
                answer,
                target_id,
                sender_id,
            } => {
                if !self.is_for_me(&target_id, &sender_id, "answer") {
                    return None;
                }
                match self.links.get(&sender_id) {
                    Some(link) => link.apply_remote_answer(answer),
                    None => warn!("Answer from {} without a link, discarding", sender_id),
                }
            }

            ServerMessage::IceCandidate {
                candidate,
                target_id,
                sender_id,
            } => {
                if !self.is_for_me(&target_id, &sender_id, "ice-candidate") {
                    return None;
                }
                match self.links.get(&sender_id) {
                    Some(link) => link.add_remote_candidate(candidate),
                    None => warn!("Candidate from {} without a link, discarding", sender_id),
                }
            }

            ServerMessage::UserMuted {
                participant_id,
                is_muted,
            } => {
                if !self.roster.is_local(&participant_id) {
                    self.roster.set_muted(&participant_id, is_muted);
                }
            }

            ServerMessage::UserVideoToggled {
                participant_id,
                is_video_off,
            } => {
                if !self.roster.is_local(&participant_id) {
                    self.roster.set_video_off(&participant_id, is_video_off);
                }
            }

            ServerMessage::RaiseHandToggled {
                participant_id,
                is_raise_hand,
            } => {
                if !self.roster.is_local(&participant_id) {
                    self.roster.set_raise_hand(&participant_id, is_raise_hand);
                }
            }

            ServerMessage::Reaction {
                emoji, sender_id, ..
            } => {
                if !self.roster.is_local(&sender_id) {
                    self.roster
                        .show_reaction(ParticipantSlot::Remote(sender_id), emoji);
                }
            }

            ServerMessage::NewMessage(message) => {
                self.push_chat(message);
            }

            ServerMessage::BufferedMessages(batch) => {
                debug!("Replaying {} buffered messages", batch.len());
                for message in batch.into_iter().filter(ServerMessage::is_replayable) {
                    self.handle_server_message(message);
                }
            }

            ServerMessage::HostChanged {
                new_host_id,
                new_host_name,
            } => {
                info!("{} ({}) is now host", new_host_name, new_host_id);
                self.roster.set_host(&new_host_id);
            }

            ServerMessage::Pong { .. } => {}

            ServerMessage::ServerShutdown { message } => {
                return Some(if message.is_empty() {
                    "Server is shutting down".to_owned()
                } else {
                    message
                });
            }

            ServerMessage::ForceDisconnect { reason } => {
                return Some(if reason.is_empty() {
                    "Disconnected by the server".to_owned()
                } else {
                    reason
                });
            }

            ServerMessage::Error { message } => {
                warn!("Server error: {}", message);
                self.error = Some(message);
            }
        }
        None
    }

    fn handle_link_event(&mut self, participant: ParticipantId, event: LinkEvent) {
        match event {
            LinkEvent::LocalOffer(offer) => {
                if let Some(sender_id) = self.roster.local_id().cloned() {
                    self.send(ClientMessage::Offer {
                        offer,
                        target_id: participant,
                        sender_id,
                    });
                } else {
                    debug!("No local id yet, dropping offer for {}", participant);
                }
            }

            LinkEvent::LocalAnswer(answer) => {
                if let Some(sender_id) = self.roster.local_id().cloned() {
                    self.send(ClientMessage::Answer {
                        answer,
                        target_id: participant,
                        sender_id,
                    });
                } else {
                    debug!("No local id yet, dropping answer for {}", participant);
                }
            }

            LinkEvent::LocalCandidate(candidate) => {
                if let Some(sender_id) = self.roster.local_id().cloned() {
                    self.send(ClientMessage::IceCandidate {
                        candidate,
                        target_id: participant,
                        sender_id,
                    });
                } else {
                    debug!("No local id yet, dropping candidate for {}", participant);
                }
            }

            LinkEvent::TrackAdded(track) => {
                debug!("{} track from {}", track.kind(), participant);
                self.roster.attach_track(&participant, track);
                self.publish();
            }

            LinkEvent::StateChanged(state) => {
                debug!(
                    "Link to {}: {} / {:?}",
                    participant, state.negotiation, state.connection
                );
            }

            LinkEvent::Terminated { reason } => {
                warn!("Link to {} terminated: {}", participant, reason);
                self.links.close(&participant);
                self.roster.mark_offline(&participant);
                self.error = Some(
                    SessionError::Negotiation {
                        participant,
                        reason,
                    }
                    .to_string(),
                );
                self.publish();
            }

            LinkEvent::NegotiationFailed(reason) => {
                self.error = Some(
                    SessionError::Negotiation {
                        participant,
                        reason,
                    }
                    .to_string(),
                );
                self.publish();
            }
        }
    }

    fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TrackEnded { track_id, source } => {
                match self.media.handle_track_ended(&track_id, source) {
                    TrackEndedAction::Ignored => return,
                    TrackEndedAction::StopScreenShare => {
                        info!("Screen capture ended by the platform");
                        let _ = self.stop_screen_share();
                    }
                    TrackEndedAction::Recovering { kind, detach } => {
                        if detach {
                            self.links.replace_track_all(kind, None);
                        }
                    }
                }
            }

            MediaEvent::Recovered { source, track } => {
                if self.phase == SessionPhase::Idle {
                    track.stop();
                    return;
                }
                if let Some(track) = self.media.apply_recovered(source, track) {
                    self.links.replace_track_all(track.kind(), Some(track));
                }
            }

            MediaEvent::RecoveryFailed { source, error } => {
                if !self.media.recovery_failed(source) || self.phase == SessionPhase::Idle {
                    return;
                }
                warn!("Could not recover {:?}: {}", source, error);
                self.error = Some(error.to_string());
            }

            MediaEvent::DeviceError(error) => {
                warn!("Device error: {}", error);
                self.error = Some(error.to_string());
            }

            MediaEvent::ScreenCaptured { result, reply } => {
                let outcome = self.finish_screen_share(result);
                if let Err(e) = &outcome {
                    self.error = Some(e.to_string());
                }
                self.publish();
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
                return;
            }
        }
        self.publish();
    }

    fn finish_screen_share(
        &mut self,
        result: std::result::Result<Vec<LocalTrack>, DeviceError>,
    ) -> Result<()> {
        let tracks = result?;
        if self.phase != SessionPhase::Active || self.media.is_screen_sharing() {
            for track in tracks {
                track.stop();
            }
            if self.phase != SessionPhase::Active {
                return Err(SessionError::invalid_state("share the screen", self.phase));
            }
            return Ok(());
        }
        for (kind, track) in self.media.install_screen_share(tracks)? {
            self.links.replace_track_all(kind, track);
        }
        info!("Screen share started");
        Ok(())
    }

    fn connect_to(&mut self, participant: &ParticipantId) {
        if self.links.contains(participant) {
            return;
        }
        let stream = self.media.local_stream().clone();
        self.links.get_or_create(participant, &stream).start_offer();
    }

    fn is_for_me(&self, target: &ParticipantId, sender: &ParticipantId, what: &str) -> bool {
        if self.roster.is_local(sender) {
            return false;
        }
        if !self.roster.is_local(target) {
            debug!("Ignoring {} addressed to {}", what, target);
            return false;
        }
        true
    }

    /// The server only knows defaults for a fresh id, so anything the user
    /// toggled before this connection is sent again.
    fn announce_local_state(&self) {
        let local = self.roster.local();
        let id = local.id.clone();
        if local.is_muted {
            self.send(ClientMessage::UserMuted {
                participant_id: id.clone(),
                is_muted: true,
            });
        }
        if local.is_video_off {
            self.send(ClientMessage::UserVideoToggled {
                participant_id: id.clone(),
                is_video_off: true,
            });
        }
        if local.is_raise_hand {
            self.send(ClientMessage::RaiseHandToggled {
                participant_id: id,
                is_raise_hand: true,
            });
        }
    }

    fn push_chat(&mut self, message: ChatMessage) {
        if self.chat_ids.insert(message.id.clone()) {
            self.chat.push(message);
        }
    }

    fn send(&self, message: ClientMessage) {
        match &self.signaling {
            Some(signaling) => {
                if !signaling.send(message) {
                    warn!("Signaling channel is gone, message dropped");
                }
            }
            None => debug!("Not connected, dropping {}", message.event_name()),
        }
    }

    fn require_joined(&self, action: &'static str) -> Result<()> {
        match self.phase {
            SessionPhase::Joining | SessionPhase::Active => Ok(()),
            phase => Err(SessionError::invalid_state(action, phase)),
        }
    }

    fn require_active(&self, action: &'static str) -> Result<()> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            phase => Err(SessionError::invalid_state(action, phase)),
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            phase: self.phase,
            reconnecting: self.reconnecting,
            local: self.roster.local().clone(),
            participants: self.roster.participants().to_vec(),
            local_stream: self.media.local_stream().clone(),
            is_connected: self.phase == SessionPhase::Active && !self.reconnecting,
            connection_state: ConnectionState::derive(self.phase, self.reconnecting),
            network_quality: self.health.network_quality(),
            health: self.health.clone(),
            error: self.error.clone(),
            chat: self.chat.clone(),
            is_screen_sharing: self.media.is_screen_sharing(),
        };
        self.snapshot.send_replace(snapshot);
    }

    fn empty_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            phase: SessionPhase::Idle,
            reconnecting: false,
            local: Participant::local(""),
            participants: Vec::new(),
            local_stream: Default::default(),
            is_connected: false,
            connection_state: ConnectionState::Disconnected,
            network_quality: NetworkQuality::Disconnected,
            health: ConnectionHealth::default(),
            error: None,
            chat: Vec::new(),
            is_screen_sharing: false,
        }
    }
}
