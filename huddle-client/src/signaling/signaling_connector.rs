use crate::error::TransportError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One live connection to the rendezvous server as a pair of text-frame
/// channels. `inbound` yielding `None` means the transport dropped.
pub struct SignalingSocket {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
pub trait SignalingConnector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<SignalingSocket, TransportError>;
}
