mod capture_manager;
mod local_stream;
mod local_track;
mod media_devices;
mod media_event;
mod synthetic_devices;

pub use capture_manager::*;
pub use local_stream::*;
pub use local_track::*;
pub use media_devices::*;
pub use media_event::*;
pub use synthetic_devices::*;
