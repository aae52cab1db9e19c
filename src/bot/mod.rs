//! Chat-facing side of rssbot: command grammar, transports and dispatch.

pub mod command;
pub mod dispatcher;
pub mod transport;

pub use command::{command_catalog, parse_command, BotCommand, CommandInfo};
pub use dispatcher::{execute, Dispatcher};
pub use transport::{is_team_channel, ChatTransport, ConsoleTransport, InboundMessage};
