use crate::config::DEFAULT_STUN_ADDR;
use crate::media::LocalTrack;
use crate::peer::{
    IceState, LinkConnectionState, PeerTransport, PeerTransportFactory, RemoteTrack,
    TransportEvent,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{IceCandidate, IceServerConfig, ParticipantId, SdpKind, SessionDescription, TrackKind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// ICE servers handed to every new peer connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerTransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        participant: &ParticipantId,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let transport = RtcPeerTransport::new(participant.clone(), &self.config, events).await?;
        Ok(Box::new(transport))
    }
}

/// A `webrtc` peer connection carrying our local tracks to one participant.
pub struct RtcPeerTransport {
    participant: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: DashMap<TrackKind, Arc<RTCRtpSender>>,
}

impl RtcPeerTransport {
    pub async fn new(
        participant: ParticipantId,
        config: &TransportConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        let pid_state = participant.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!("Peer connection state for {}: {:?}", pid_state, s);
                let state = match s {
                    RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => {
                        LinkConnectionState::New
                    }
                    RTCPeerConnectionState::Connecting => LinkConnectionState::Connecting,
                    RTCPeerConnectionState::Connected => LinkConnectionState::Connected,
                    RTCPeerConnectionState::Disconnected => LinkConnectionState::Disconnected,
                    RTCPeerConnectionState::Failed => LinkConnectionState::Failed,
                    RTCPeerConnectionState::Closed => LinkConnectionState::Closed,
                };
                let _ = state_tx.send(TransportEvent::ConnectionStateChanged(state));
                Box::pin(async {})
            },
        ));

        let ice_state_tx = events.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let state = match s {
                    RTCIceConnectionState::Checking => Some(IceState::Checking),
                    RTCIceConnectionState::Connected => Some(IceState::Connected),
                    RTCIceConnectionState::Completed => Some(IceState::Completed),
                    RTCIceConnectionState::Disconnected => Some(IceState::Disconnected),
                    RTCIceConnectionState::Failed => Some(IceState::Failed),
                    RTCIceConnectionState::Closed => Some(IceState::Closed),
                    RTCIceConnectionState::New => Some(IceState::New),
                    RTCIceConnectionState::Unspecified => None,
                };
                if let Some(state) = state {
                    let _ = ice_state_tx.send(TransportEvent::IceStateChanged(state));
                }
                Box::pin(async {})
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_tx = events;
        let pid_track = participant.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                if let Some(remote) = RemoteTrack::from_rtc(track) {
                    debug!("Remote {} track {} from {}", remote.kind(), remote.id(), pid_track);
                    let _ = track_tx.send(TransportEvent::TrackAdded(remote));
                }
                Box::pin(async {})
            },
        ));

        Ok(Self {
            participant,
            peer_connection,
            senders: DashMap::new(),
        })
    }

    fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
        let rtc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        Ok(rtc)
    }

    fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription> {
        match desc.sdp_type {
            RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp.clone())),
            RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp.clone())),
            other => anyhow::bail!("Unexpected local description type {other}"),
        }
    }

    /// Outgoing RTCP has to be read or the interceptors stall.
    fn drain_rtcp(sender: Arc<RTCRtpSender>) {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
    }
}

#[async_trait]
impl PeerTransport for RtcPeerTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription> {
        let options = RTCOfferOptions {
            ice_restart,
            ..Default::default()
        };
        let offer = self
            .peer_connection
            .create_offer(Some(options))
            .await
            .context("Failed to create offer")?;
        Self::from_rtc(&offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        Self::from_rtc(&answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(Self::to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(Self::to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let rollback: RTCSessionDescription =
            serde_json::from_str(r#"{"type":"rollback","sdp":""}"#)
                .context("Failed to build rollback description")?;
        self.peer_connection.set_local_description(rollback).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(track.rtp_track())
            .await
            .with_context(|| format!("Failed to add {} track for {}", track.kind(), self.participant))?;
        Self::drain_rtcp(sender.clone());
        self.senders.insert(track.kind(), sender);
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<&LocalTrack>) -> Result<bool> {
        let sender = self.senders.get(&kind).map(|entry| entry.value().clone());
        match (sender, track) {
            (Some(sender), track) => {
                sender.replace_track(track.map(LocalTrack::rtp_track)).await?;
                Ok(false)
            }
            (None, Some(track)) => {
                self.add_track(track).await?;
                Ok(true)
            }
            (None, None) => Ok(false),
        }
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
