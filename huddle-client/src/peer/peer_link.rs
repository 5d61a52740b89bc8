use crate::event::SessionEvent;
use crate::media::{LocalStream, LocalTrack};
use crate::peer::{
    IceState, LinkCommand, LinkConnectionState, LinkEvent, LinkState, NegotiationState,
    PeerTransport, PeerTransportFactory, TransportEvent,
};
use huddle_core::{IceCandidate, ParticipantId, SessionDescription, TrackKind};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// ICE failures in a row after which a link gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 2;

/// Handle to one peer link task.
///
/// Every call is fire-and-forget: once the task is gone the command is
/// silently dropped, so a link that is mid-teardown turns into a no-op.
pub struct PeerLink {
    participant: ParticipantId,
    link_id: u64,
    commands: mpsc::UnboundedSender<LinkCommand>,
    state: watch::Receiver<LinkState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PeerLink {
    pub(crate) fn spawn(
        participant: ParticipantId,
        link_id: u64,
        factory: Arc<dyn PeerTransportFactory>,
        local: LocalStream,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = LinkWorker {
            participant: participant.clone(),
            link_id,
            factory,
            local,
            events,
            state: state_tx,
            pending_candidates: Vec::new(),
            has_remote_description: false,
            consecutive_failures: 0,
            failure_latched: false,
            renegotiate_when_stable: false,
        };
        let task = tokio::spawn(worker.run(commands_rx, shutdown_rx));

        Self {
            participant,
            link_id,
            commands: commands_tx,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn link_id(&self) -> u64 {
        self.link_id
    }

    pub fn start_offer(&self) {
        self.send(LinkCommand::StartOffer);
    }

    pub fn apply_remote_offer(&self, offer: SessionDescription, polite: bool) {
        self.send(LinkCommand::RemoteOffer { offer, polite });
    }

    pub fn apply_remote_answer(&self, answer: SessionDescription) {
        self.send(LinkCommand::RemoteAnswer(answer));
    }

    pub fn add_remote_candidate(&self, candidate: IceCandidate) {
        self.send(LinkCommand::RemoteCandidate(candidate));
    }

    pub fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) {
        self.send(LinkCommand::ReplaceTrack { kind, track });
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Abandons whatever step is in flight and closes the transport.
    /// The returned handle resolves once the transport is closed.
    pub(crate) fn close(mut self) -> JoinHandle<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task
    }

    fn send(&self, command: LinkCommand) {
        if self.commands.send(command).is_err() {
            debug!("Link to {} is gone, dropping command", self.participant);
        }
    }
}

struct LinkWorker {
    participant: ParticipantId,
    link_id: u64,
    factory: Arc<dyn PeerTransportFactory>,
    local: LocalStream,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Sender<LinkState>,
    pending_candidates: Vec<IceCandidate>,
    has_remote_description: bool,
    consecutive_failures: u32,
    /// Set on entering a failed state so the connection and ICE callbacks
    /// reporting the same failure count it once.
    failure_latched: bool,
    /// A sender was added mid-negotiation; offer again once stable.
    renegotiate_when_stable: bool,
}

struct Transport {
    inner: Box<dyn PeerTransport>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl LinkWorker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<LinkCommand>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut transport = tokio::select! {
            biased;
            _ = &mut shutdown => {
                self.set_negotiation(NegotiationState::Closed, LinkConnectionState::Closed);
                return;
            }
            transport = self.build_transport() => match transport {
                Ok(transport) => transport,
                Err(e) => {
                    error!("Failed to create transport for {}: {:?}", self.participant, e);
                    self.emit(LinkEvent::Terminated {
                        reason: format!("transport setup failed: {e}"),
                    });
                    self.set_negotiation(NegotiationState::Closed, LinkConnectionState::Closed);
                    return;
                }
            },
        };

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!("Link to {} shut down", self.participant);
                    break;
                }

                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => {
                            debug!("Link to {} shut down mid-negotiation", self.participant);
                            break;
                        }
                        flow = self.handle_command(&mut transport, cmd) => {
                            if flow.is_break() {
                                break;
                            }
                        }
                    }
                }

                Some(event) = transport.events.recv() => {
                    if self.handle_transport_event(&transport, event).await.is_break() {
                        break;
                    }
                }
            }
        }

        if let Err(e) = transport.inner.close().await {
            warn!("Failed to close transport for {}: {:?}", self.participant, e);
        }
        self.set_negotiation(NegotiationState::Closed, LinkConnectionState::Closed);
        info!("Peer link to {} closed", self.participant);
    }

    async fn build_transport(&self) -> anyhow::Result<Transport> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = self.factory.create(&self.participant, tx).await?;
        for track in self.local.tracks() {
            if let Err(e) = inner.add_track(&track).await {
                warn!(
                    "Failed to attach local {} track for {}: {:?}",
                    track.kind(),
                    self.participant,
                    e
                );
            }
        }
        Ok(Transport { inner, events: rx })
    }

    async fn handle_command(
        &mut self,
        transport: &mut Transport,
        cmd: LinkCommand,
    ) -> ControlFlow<()> {
        match cmd {
            LinkCommand::StartOffer => {
                self.offer(transport, false).await;
            }

            LinkCommand::RemoteOffer { offer, polite } => {
                return self.accept_offer(transport, offer, polite).await;
            }

            LinkCommand::RemoteAnswer(answer) => {
                let negotiation = self.state.borrow().negotiation;
                if negotiation != NegotiationState::HaveLocalOffer {
                    warn!(
                        "Discarding answer from {} received in state {}",
                        self.participant, negotiation
                    );
                    return ControlFlow::Continue(());
                }
                if let Err(e) = transport.inner.set_remote_description(answer).await {
                    self.negotiation_failed("apply answer", e);
                    return ControlFlow::Continue(());
                }
                self.has_remote_description = true;
                self.flush_candidates(transport).await;
                self.advance(NegotiationState::Stable);
                self.renegotiate_if_pending(transport).await;
            }

            LinkCommand::RemoteCandidate(candidate) => {
                if !self.has_remote_description {
                    warn!(
                        "Candidate from {} arrived before the remote description, queueing",
                        self.participant
                    );
                    self.pending_candidates.push(candidate);
                    return ControlFlow::Continue(());
                }
                if let Err(e) = transport.inner.add_ice_candidate(candidate).await {
                    warn!("Failed to add ICE candidate for {}: {:?}", self.participant, e);
                }
            }

            LinkCommand::ReplaceTrack { kind, track } => {
                self.local.set(kind, track.clone());
                match transport.inner.replace_track(kind, track.as_ref()).await {
                    Ok(true) => {
                        let negotiation = self.state.borrow().negotiation;
                        if matches!(negotiation, NegotiationState::Stable | NegotiationState::New) {
                            self.offer(transport, false).await;
                        } else {
                            debug!(
                                "New {} sender for {} while {}, offering once stable",
                                kind, self.participant, negotiation
                            );
                            self.renegotiate_when_stable = true;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => warn!(
                        "Failed to replace {} track for {}: {:?}",
                        kind, self.participant, e
                    ),
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn accept_offer(
        &mut self,
        transport: &mut Transport,
        offer: SessionDescription,
        polite: bool,
    ) -> ControlFlow<()> {
        let negotiation = self.state.borrow().negotiation;
        if negotiation == NegotiationState::HaveLocalOffer {
            if !polite {
                info!("Offer collision with {}, keeping our own offer", self.participant);
                return ControlFlow::Continue(());
            }
            info!("Offer collision with {}, rolling back", self.participant);
            if let Err(e) = transport.inner.rollback().await {
                warn!(
                    "Rollback failed for {}, rebuilding transport: {:?}",
                    self.participant, e
                );
                let _ = transport.inner.close().await;
                match self.build_transport().await {
                    Ok(fresh) => *transport = fresh,
                    Err(e) => {
                        self.emit(LinkEvent::Terminated {
                            reason: format!("transport rebuild failed: {e}"),
                        });
                        return ControlFlow::Break(());
                    }
                }
                self.has_remote_description = false;
            }
            self.advance(NegotiationState::Stable);
        }

        if let Err(e) = transport.inner.set_remote_description(offer).await {
            self.negotiation_failed("apply offer", e);
            return ControlFlow::Continue(());
        }
        self.has_remote_description = true;
        self.flush_candidates(transport).await;
        self.advance(NegotiationState::HaveRemoteOffer);

        let answer = match transport.inner.create_answer().await {
            Ok(answer) => answer,
            Err(e) => {
                self.negotiation_failed("create answer", e);
                return ControlFlow::Continue(());
            }
        };
        if let Err(e) = transport.inner.set_local_description(answer.clone()).await {
            self.negotiation_failed("set local answer", e);
            return ControlFlow::Continue(());
        }
        self.advance(NegotiationState::Stable);
        self.emit(LinkEvent::LocalAnswer(answer));
        self.renegotiate_if_pending(transport).await;
        ControlFlow::Continue(())
    }

    async fn renegotiate_if_pending(&mut self, transport: &Transport) {
        if std::mem::take(&mut self.renegotiate_when_stable) {
            self.offer(transport, false).await;
        }
    }

    async fn offer(&mut self, transport: &Transport, ice_restart: bool) {
        let offer = match transport.inner.create_offer(ice_restart).await {
            Ok(offer) => offer,
            Err(e) => {
                self.negotiation_failed("create offer", e);
                return;
            }
        };
        if let Err(e) = transport.inner.set_local_description(offer.clone()).await {
            self.negotiation_failed("set local offer", e);
            return;
        }
        self.advance(NegotiationState::HaveLocalOffer);
        self.emit(LinkEvent::LocalOffer(offer));
    }

    async fn flush_candidates(&mut self, transport: &Transport) {
        if self.pending_candidates.is_empty() {
            return;
        }
        debug!(
            "Flushing {} queued candidates for {}",
            self.pending_candidates.len(),
            self.participant
        );
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = transport.inner.add_ice_candidate(candidate).await {
                warn!("Failed to add queued ICE candidate for {}: {:?}", self.participant, e);
            }
        }
    }

    async fn handle_transport_event(
        &mut self,
        transport: &Transport,
        event: TransportEvent,
    ) -> ControlFlow<()> {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.emit(LinkEvent::LocalCandidate(candidate));
            }

            TransportEvent::TrackAdded(track) => {
                self.emit(LinkEvent::TrackAdded(track));
            }

            TransportEvent::ConnectionStateChanged(connection) => {
                let negotiation = self.state.borrow().negotiation;
                self.set_negotiation(negotiation, connection);
                match connection {
                    LinkConnectionState::Connected => self.recovered(),
                    LinkConnectionState::Connecting => self.failure_latched = false,
                    LinkConnectionState::Failed => return self.failed(transport).await,
                    _ => {}
                }
            }

            TransportEvent::IceStateChanged(ice) => match ice {
                IceState::Connected | IceState::Completed => self.recovered(),
                IceState::Checking => self.failure_latched = false,
                IceState::Failed => return self.failed(transport).await,
                _ => {}
            },
        }
        ControlFlow::Continue(())
    }

    fn recovered(&mut self) {
        self.failure_latched = false;
        self.consecutive_failures = 0;
    }

    async fn failed(&mut self, transport: &Transport) -> ControlFlow<()> {
        if self.failure_latched {
            return ControlFlow::Continue(());
        }
        self.failure_latched = true;
        self.consecutive_failures += 1;

        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            error!("Link to {} failed again after ICE restart, closing", self.participant);
            self.emit(LinkEvent::Terminated {
                reason: "connection failed after ICE restart".to_owned(),
            });
            return ControlFlow::Break(());
        }

        warn!("Link to {} failed, restarting ICE", self.participant);
        self.offer(transport, true).await;
        ControlFlow::Continue(())
    }

    fn advance(&self, negotiation: NegotiationState) {
        let connection = self.state.borrow().connection;
        self.set_negotiation(negotiation, connection);
    }

    fn set_negotiation(&self, negotiation: NegotiationState, connection: LinkConnectionState) {
        let next = LinkState {
            negotiation,
            connection,
        };
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            self.emit(LinkEvent::StateChanged(next));
        }
    }

    fn negotiation_failed(&self, step: &str, err: anyhow::Error) {
        warn!("Failed to {} for {}: {:?}", step, self.participant, err);
        self.emit(LinkEvent::NegotiationFailed(format!("{step}: {err}")));
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(SessionEvent::Link {
            participant: self.participant.clone(),
            link_id: self.link_id,
            event,
        });
    }
}
