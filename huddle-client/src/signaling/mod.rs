mod signaling_channel;
mod signaling_connector;
mod signaling_event;
mod ws_connector;

pub use signaling_channel::*;
pub use signaling_connector::*;
pub use signaling_event::*;
pub use ws_connector::*;
