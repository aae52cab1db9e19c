//! Chat transports.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::bot::command::CommandInfo;
use crate::notify::Notifier;
use crate::{BotError, Result};

/// A message received from the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the message was posted in.
    pub channel: String,
    /// User who sent it.
    pub sender: String,
    /// Whether the channel is a team channel.
    pub is_team: bool,
    /// Message body. `None` for anything that is not a text message.
    pub text: Option<String>,
}

impl InboundMessage {
    /// Create a text message.
    pub fn text(
        channel: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let channel = channel.into();
        Self {
            is_team: is_team_channel(&channel),
            channel,
            sender: sender.into(),
            text: Some(text.into()),
        }
    }
}

/// Team channels are named `team#channel`.
pub fn is_team_channel(channel: &str) -> bool {
    channel.contains('#')
}

/// Connection to a chat service.
#[async_trait]
pub trait ChatTransport: Notifier {
    /// Publish the bot's command list.
    async fn advertise_commands(&self, commands: &[CommandInfo]) -> Result<()>;

    /// Withdraw any published command list.
    async fn clear_commands(&self) -> Result<()>;

    /// Wait for the next inbound message. `None` once the chat is closed.
    async fn next_message(&self) -> Result<Option<InboundMessage>>;
}

/// Line-oriented transport for running the bot from a terminal.
///
/// Each input line is `<channel> <sender> <text...>`. A line holding only a
/// channel and a sender stands for a non-text message. Outgoing messages are
/// written as `[<channel>] <message>`.
pub struct ConsoleTransport<R, W> {
    lines: Mutex<Lines<R>>,
    writer: Mutex<W>,
}

impl ConsoleTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Create a transport on stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport over any line reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            writer: Mutex::new(writer),
        }
    }

    /// Consume the transport and return the writer.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| BotError::Notify(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| BotError::Notify(e.to_string()))
    }
}

/// Parse one console input line. Blank lines yield `None`.
fn parse_line(line: &str) -> Option<InboundMessage> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let channel = parts.next().filter(|c| !c.is_empty())?;
    let sender = parts.next().unwrap_or_default();
    let text = parts.next().map(str::trim).filter(|t| !t.is_empty());

    Some(InboundMessage {
        channel: channel.to_string(),
        sender: sender.to_string(),
        is_team: is_team_channel(channel),
        text: text.map(str::to_string),
    })
}

#[async_trait]
impl<R, W> Notifier for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, channel: &str, message: &str) -> Result<()> {
        self.write_line(&format!("[{channel}] {message}")).await
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn advertise_commands(&self, commands: &[CommandInfo]) -> Result<()> {
        for command in commands {
            self.write_line(&format!(
                "[commands] {} - {}",
                command.usage, command.description
            ))
            .await?;
        }
        Ok(())
    }

    async fn clear_commands(&self) -> Result<()> {
        self.write_line("[commands] cleared").await
    }

    async fn next_message(&self) -> Result<Option<InboundMessage>> {
        let mut lines = self.lines.lock().await;
        while let Some(line) = lines.next_line().await? {
            if let Some(message) = parse_line(&line) {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }
}
