//! Bot command parser.
//!
//! Commands are whitespace-separated tokens: the configured prefix, a verb
//! and the verb's arguments. Verbs are case-sensitive and extra arguments
//! are ignored.

use crate::{BotError, Result};

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Subscribe the channel to a feed.
    Subscribe {
        /// Feed URL.
        url: String,
    },
    /// Show a stored item record.
    Get {
        /// Item identifier.
        id: String,
    },
    /// Show the channel subscription.
    Status,
    /// Refresh the channel feed.
    Refresh,
    /// Drop the subscription and every item record.
    Unsubscribe,
}

impl BotCommand {
    /// Get the command verb.
    pub fn verb(&self) -> &'static str {
        match self {
            BotCommand::Subscribe { .. } => "subscribe",
            BotCommand::Get { .. } => "get",
            BotCommand::Status => "status",
            BotCommand::Refresh => "refresh",
            BotCommand::Unsubscribe => "unsubscribe",
        }
    }
}

impl std::fmt::Display for BotCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotCommand::Subscribe { url } => write!(f, "subscribe {url}"),
            BotCommand::Get { id } => write!(f, "get {id}"),
            other => write!(f, "{}", other.verb()),
        }
    }
}

/// Parse a message body.
///
/// Returns `Ok(None)` when the message is not addressed to the bot, which
/// includes the bare prefix with no verb.
pub fn parse_command(prefix: &str, text: &str) -> Result<Option<BotCommand>> {
    let mut tokens = text.split_whitespace();

    if tokens.next() != Some(prefix) {
        return Ok(None);
    }
    let Some(verb) = tokens.next() else {
        return Ok(None);
    };

    let command = match verb {
        "subscribe" => BotCommand::Subscribe {
            url: required_arg(tokens.next(), verb, "<url>")?,
        },
        "get" => BotCommand::Get {
            id: required_arg(tokens.next(), verb, "<id>")?,
        },
        "status" => BotCommand::Status,
        "refresh" => BotCommand::Refresh,
        "unsubscribe" => BotCommand::Unsubscribe,
        unknown => {
            return Err(BotError::MalformedCommand(format!(
                "unrecognized command {unknown}"
            )));
        }
    };

    Ok(Some(command))
}

fn required_arg(arg: Option<&str>, verb: &str, name: &str) -> Result<String> {
    arg.map(str::to_string)
        .ok_or_else(|| BotError::MalformedCommand(format!("{verb} requires {name}")))
}

/// Command information for advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command verb.
    pub name: &'static str,
    /// Usage line shown to users.
    pub usage: String,
    /// Command description.
    pub description: &'static str,
}

/// List every command for the given prefix.
///
/// Usage lines drop the leading `!` of the prefix, so `!rss` advertises
/// `rss subscribe <url>`.
pub fn command_catalog(prefix: &str) -> Vec<CommandInfo> {
    const COMMANDS: &[(&str, &str, &str)] = &[
        ("subscribe", " <url>", "Subscribe to an RSS Feed by URL"),
        ("get", " <id>", "Get message by ID"),
        ("status", "", "Get RSS Feed Status"),
        ("refresh", "", "Refresh RSS Feed"),
        ("unsubscribe", "", "Unsubscribe from RSS Feed by URL"),
    ];

    let trigger = prefix.trim_start_matches('!');
    COMMANDS
        .iter()
        .map(|&(name, args, description)| CommandInfo {
            name,
            usage: format!("{trigger} {name}{args}"),
            description,
        })
        .collect()
}
