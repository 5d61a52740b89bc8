mod link_command;
mod link_event;
mod link_registry;
mod peer_link;
mod peer_transport;
mod remote_track;
mod rtc_transport;

pub use link_command::*;
pub use link_event::*;
pub use link_registry::*;
pub use peer_link::*;
pub use peer_transport::*;
pub use remote_track::*;
pub use rtc_transport::*;
