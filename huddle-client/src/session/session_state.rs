use std::fmt;

/// Lifecycle of the whole session. Reconnecting is tracked separately and
/// only ever set while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Joining,
    Active,
    Leaving,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Joining => "joining",
            SessionPhase::Active => "active",
            SessionPhase::Leaving => "leaving",
        };
        f.write_str(name)
    }
}

/// What the UI shows as the signaling connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub(crate) fn derive(phase: SessionPhase, reconnecting: bool) -> Self {
        match phase {
            SessionPhase::Active if reconnecting => ConnectionState::Reconnecting,
            SessionPhase::Active => ConnectionState::Connected,
            SessionPhase::Joining => ConnectionState::Connecting,
            SessionPhase::Idle | SessionPhase::Leaving => ConnectionState::Disconnected,
        }
    }
}
