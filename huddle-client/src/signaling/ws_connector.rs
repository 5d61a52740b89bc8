use crate::error::{TransportError, TransportErrorKind};
use crate::signaling::{SignalingConnector, SignalingSocket};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket transport: JSON text frames, one send pump and one receive
/// pump per connection.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl WsConnector {
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<SignalingSocket, TransportError> {
        let connect = tokio_tungstenite::connect_async(endpoint);
        let (stream, _) = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(classify_ws_error(&e)),
            Err(_) => {
                return Err(TransportError::new(
                    TransportErrorKind::Timeout,
                    format!("no answer from {endpoint} within {:?}", self.connect_timeout),
                ));
            }
        };
        info!("Signaling socket connected to {}", endpoint);

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let mut send_task = tokio::spawn(async move {
                while let Some(text) = outbound_rx.recv().await {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = sink.close().await;
            });

            let mut recv_task = tokio::spawn(async move {
                while let Some(Ok(msg)) = source.next().await {
                    match msg {
                        Message::Text(text) => {
                            if inbound_tx.send(text).is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });

            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            debug!("Signaling socket pumps stopped");
        });

        Ok(SignalingSocket {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

pub fn classify_ws_error(err: &WsError) -> TransportError {
    let kind = match err {
        WsError::Io(io) => match io.kind() {
            ErrorKind::ConnectionRefused => TransportErrorKind::Refused,
            ErrorKind::TimedOut => TransportErrorKind::Timeout,
            ErrorKind::PermissionDenied => TransportErrorKind::Permission,
            _ => TransportErrorKind::Transport,
        },
        WsError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
            TransportErrorKind::Permission
        }
        _ => TransportErrorKind::Transport,
    };
    TransportError::new(kind, err.to_string())
}
