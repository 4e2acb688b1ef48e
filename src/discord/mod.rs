pub mod announcer;
pub mod commands;
pub mod handler;

pub use announcer::DiscordAnnouncer;
pub use handler::Handler;
