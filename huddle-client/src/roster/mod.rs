mod participant;
mod roster;

pub use participant::*;
pub use roster::*;
