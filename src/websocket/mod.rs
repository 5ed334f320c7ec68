pub mod engine;
pub mod handler;
pub mod msg_command_handler;
pub mod relay;

pub use engine::{Admission, SessionEngine};
