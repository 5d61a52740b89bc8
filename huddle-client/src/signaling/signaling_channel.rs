use crate::clock::now_ms;
use crate::config::{HeartbeatConfig, ReconnectPolicy};
use crate::error::TransportError;
use crate::event::SessionEvent;
use crate::signaling::{SignalingConnector, SignalingEvent, SignalingSocket};
use huddle_core::{ClientMessage, ConnectionHealth, ServerMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Where and as whom to join; everything needed to (re)build the connection.
#[derive(Clone)]
pub struct SignalingChannel {
    pub connector: Arc<dyn SignalingConnector>,
    pub endpoint: String,
    pub room_id: String,
    pub user_name: String,
    pub reconnect: ReconnectPolicy,
    pub heartbeat: HeartbeatConfig,
}

/// Owner side of a running channel. Dropping it stops the channel as well.
pub struct SignalingHandle {
    channel_id: u64,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SignalingHandle {
    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    /// Queues a frame. Returns `false` once the channel has stopped.
    pub fn send(&self, message: ClientMessage) -> bool {
        debug!("Signaling -> {}", message.event_name());
        self.outbound.send(message).is_ok()
    }

    /// Flushes what is already queued, then closes the socket.
    pub async fn disconnect(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SignalingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Outcome {
    Shutdown,
    Dropped(TransportError),
}

impl SignalingChannel {
    /// Starts connecting in the background. Progress is reported as
    /// [`SessionEvent::Signaling`] tagged with `channel_id`.
    pub fn connect(
        self,
        channel_id: u64,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> SignalingHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = ChannelWorker {
            config: self,
            channel_id,
            events,
            health: ConnectionHealth::default(),
            last_ping_ts: 0,
        };
        let task = tokio::spawn(worker.run(outbound_rx, shutdown_rx));

        SignalingHandle {
            channel_id,
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

struct ChannelWorker {
    config: SignalingChannel,
    channel_id: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
    health: ConnectionHealth,
    last_ping_ts: i64,
}

impl ChannelWorker {
    async fn run(
        mut self,
        mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut attempt: u32 = 0;
        let mut connected_before = false;

        loop {
            let connected = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.config.connector.connect(&self.config.endpoint) => result,
            };

            let error = match connected {
                Ok(socket) => {
                    attempt = 0;
                    let reconnected = connected_before;
                    connected_before = true;
                    match self
                        .serve(socket, reconnected, &mut outbound, &mut shutdown)
                        .await
                    {
                        Outcome::Shutdown => break,
                        Outcome::Dropped(error) => {
                            warn!("Signaling connection lost: {}", error);
                            error
                        }
                    }
                }
                Err(error) => {
                    warn!("Signaling connect failed: {}", error);
                    error
                }
            };

            self.health.is_healthy = false;
            self.emit(SignalingEvent::Health(self.health.clone()));

            attempt += 1;
            if attempt > self.config.reconnect.max_attempts {
                error!(
                    "Giving up on signaling after {} attempts",
                    self.config.reconnect.max_attempts
                );
                self.emit(SignalingEvent::Failed(error));
                return;
            }

            let delay = self.config.reconnect.delay_for(attempt);
            info!("Reconnecting signaling in {:?} (attempt {})", delay, attempt);
            self.emit(SignalingEvent::Reconnecting { attempt, error });

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.emit(SignalingEvent::Closed);
    }

    async fn serve(
        &mut self,
        mut socket: SignalingSocket,
        reconnected: bool,
        outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Outcome {
        if reconnected {
            self.health.reconnect_count += 1;
        }
        self.health.connected_at = Some(now_ms());
        self.health.is_healthy = true;
        self.health.latency_ms = None;

        // The server only knows who is in the room once we (re)join.
        let join = ClientMessage::JoinRoom {
            room_id: self.config.room_id.clone(),
            user_name: self.config.user_name.clone(),
        };
        if let Err(e) = write(&socket, &join) {
            return Outcome::Dropped(e);
        }
        info!(
            "Joined room {} as {} (reconnected: {})",
            self.config.room_id, self.config.user_name, reconnected
        );
        self.emit(SignalingEvent::Connected {
            reconnected,
            health: self.health.clone(),
        });

        let period = self.config.heartbeat.interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut outstanding: Option<(i64, Instant)> = None;
        let mut missed: u32 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut *shutdown => {
                    while let Ok(message) = outbound.try_recv() {
                        let _ = write(&socket, &message);
                    }
                    return Outcome::Shutdown;
                }

                message = outbound.recv() => {
                    let Some(message) = message else {
                        return Outcome::Shutdown;
                    };
                    if let Err(e) = write(&socket, &message) {
                        return Outcome::Dropped(e);
                    }
                }

                text = socket.inbound.recv() => {
                    let Some(text) = text else {
                        return Outcome::Dropped(TransportError::closed());
                    };
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::Pong { timestamp, .. }) => {
                            missed = 0;
                            if let Some((sent, at)) = outstanding
                                && sent == timestamp
                            {
                                let latency = at.elapsed();
                                self.health.latency_ms = Some(latency.as_millis() as u64);
                                outstanding = None;
                            }
                            self.health.is_healthy = true;
                            self.emit(SignalingEvent::Health(self.health.clone()));
                        }
                        Ok(message) => {
                            debug!("Signaling <- {}", message.event_name());
                            self.emit(SignalingEvent::Message(message));
                        }
                        Err(e) => warn!("Invalid signaling frame: {:?}", e),
                    }
                }

                _ = heartbeat.tick() => {
                    if outstanding.is_some() {
                        missed += 1;
                        if missed >= self.config.heartbeat.max_missed && self.health.is_healthy {
                            warn!("{} heartbeats unanswered, marking connection unhealthy", missed);
                            self.health.is_healthy = false;
                            self.emit(SignalingEvent::Health(self.health.clone()));
                        }
                    }

                    let timestamp = now_ms().max(self.last_ping_ts + 1);
                    self.last_ping_ts = timestamp;
                    self.health.last_ping = Some(timestamp);
                    self.health.ping_count += 1;
                    outstanding = Some((timestamp, Instant::now()));

                    if let Err(e) = write(&socket, &ClientMessage::Ping { timestamp }) {
                        return Outcome::Dropped(e);
                    }
                }
            }
        }
    }

    fn emit(&self, event: SignalingEvent) {
        let _ = self.events.send(SessionEvent::Signaling {
            channel: self.channel_id,
            event,
        });
    }
}

fn write(socket: &SignalingSocket, message: &ClientMessage) -> Result<(), TransportError> {
    let text = serde_json::to_string(message).map_err(|e| {
        TransportError::new(
            crate::error::TransportErrorKind::Transport,
            format!("failed to encode {}: {e}", message.event_name()),
        )
    })?;
    socket
        .outbound
        .send(text)
        .map_err(|_| TransportError::closed())
}
