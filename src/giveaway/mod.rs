pub mod announcer;
pub mod controller;
pub mod selection;

pub use announcer::Announcer;
pub use controller::{ControllerHandle, GiveawayController};
