mod clock;
mod config;
mod error;
mod event;

pub mod media;
pub mod peer;
pub mod roster;
pub mod session;
pub mod signaling;

pub use config::*;
pub use error::*;
pub use event::*;
pub use media::*;
pub use peer::*;
pub use roster::*;
pub use session::*;
pub use signaling::*;

pub use huddle_core::model;
