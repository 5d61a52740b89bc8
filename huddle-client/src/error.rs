use crate::session::SessionPhase;
use huddle_core::{ParticipantId, TrackKind};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Why the signaling transport could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Permission,
    Transport,
    Timeout,
    Refused,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Permission => "permission",
            TransportErrorKind::Transport => "transport",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Refused => "refused",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn closed() -> Self {
        Self::new(TransportErrorKind::Transport, "signaling connection closed")
    }
}

/// Capture failures. Never fatal once a session already holds a device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Permission to use the {0} was denied")]
    PermissionDenied(TrackKind),

    #[error("No {0} device was found")]
    NotFound(TrackKind),

    #[error("The {0} device is busy")]
    Busy(TrackKind),

    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("Screen capture unavailable: {0}")]
    DisplayUnavailable(String),
}

impl DeviceError {
    pub fn unavailable(kind: TrackKind, reason: impl Into<String>) -> Self {
        match kind {
            TrackKind::Audio => DeviceError::MicrophoneUnavailable(reason.into()),
            TrackKind::Video => DeviceError::CameraUnavailable(reason.into()),
        }
    }

    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied(_) => "permission-denied",
            DeviceError::NotFound(_) => "device-not-found",
            DeviceError::Busy(_) => "device-busy",
            DeviceError::CameraUnavailable(_) => "camera-unavailable",
            DeviceError::MicrophoneUnavailable(_) => "microphone-unavailable",
            DeviceError::DisplayUnavailable(_) => "display-unavailable",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Negotiation with {participant} failed: {reason}")]
    Negotiation {
        participant: ParticipantId,
        reason: String,
    },

    #[error("Connection error ({0})")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Protocol(String),

    #[error("Cannot {action} while the session is {phase}")]
    InvalidState {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error("Session is no longer running")]
    Closed,
}

impl SessionError {
    pub(crate) fn invalid_state(action: &'static str, phase: SessionPhase) -> Self {
        SessionError::InvalidState { action, phase }
    }
}
