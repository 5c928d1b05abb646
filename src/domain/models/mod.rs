mod message;
mod provider;
mod requirement;
mod session;
mod slash_commands;

pub use message::*;
pub use provider::*;
pub use requirement::*;
pub use session::*;
pub use slash_commands::*;
