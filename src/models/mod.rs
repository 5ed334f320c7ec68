pub mod command;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod session;
pub mod session_api;

pub use command::*;
pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use session::*;
pub use session_api::*;
