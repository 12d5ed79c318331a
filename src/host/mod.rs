pub mod bridge;
pub mod handler;
pub mod protocol;

pub use bridge::{spawn_writer, CommandSink};
pub use handler::HostService;
