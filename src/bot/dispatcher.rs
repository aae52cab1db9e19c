//! Command dispatcher.
//!
//! Every recognised command runs as its own task. A semaphore bounds how
//! many run at once; when the pool is full, [`Dispatcher::dispatch`] waits
//! for a free slot before returning to the inbound loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::bot::command::{parse_command, BotCommand};
use crate::bot::transport::InboundMessage;
use crate::config::BotConfig;
use crate::notify::{format_record_reply, format_status_reply, Notifier};
use crate::rss::{RssService, SubscribeRequest};
use crate::Result;

/// Runs inbound commands on a bounded pool of tasks.
pub struct Dispatcher {
    prefix: String,
    service: Arc<RssService>,
    notifier: Arc<dyn Notifier>,
    semaphore: Arc<Semaphore>,
    max_tasks: usize,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    /// Create a dispatcher using the `[bot]` configuration section.
    pub fn new(service: Arc<RssService>, notifier: Arc<dyn Notifier>, config: &BotConfig) -> Self {
        let max_tasks = config.max_concurrent_tasks.max(1);
        Self {
            prefix: config.command_prefix.clone(),
            service,
            notifier,
            semaphore: Arc::new(Semaphore::new(max_tasks)),
            max_tasks,
            tasks: JoinSet::new(),
        }
    }

    /// Get the number of commands currently running.
    pub fn in_flight(&self) -> usize {
        self.max_tasks - self.semaphore.available_permits()
    }

    /// Handle an inbound message.
    ///
    /// Returns true if a command task was started. Messages without text,
    /// messages not addressed to the bot and malformed commands are dropped.
    pub async fn dispatch(&mut self, message: InboundMessage) -> bool {
        self.reap();

        let Some(text) = message.text.as_deref() else {
            debug!("Ignoring non-text message in {}", message.channel);
            return false;
        };

        let command = match parse_command(&self.prefix, text) {
            Ok(Some(command)) => command,
            Ok(None) => return false,
            Err(e) => {
                warn!("Ignoring command from {} in {}: {}", message.sender, message.channel, e);
                return false;
            }
        };

        info!(
            "Command '{}' from {} in {}",
            command, message.sender, message.channel
        );

        if self.semaphore.available_permits() == 0 {
            info!("All {} command slots busy, waiting", self.max_tasks);
        }
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!("Command pool closed, dropping '{}'", command);
                return false;
            }
        };

        let service = self.service.clone();
        let notifier = self.notifier.clone();
        self.tasks.spawn(async move {
            let _permit = permit;
            let verb = command.verb();
            let channel = message.channel.clone();

            match execute(&service, notifier.as_ref(), &message, command).await {
                Ok(()) => debug!("Command '{}' in {} finished", verb, channel),
                Err(e) if e.is_absence() => {
                    info!("Command '{}' in {}: {}", verb, channel, e)
                }
                Err(e) => error!("Command '{}' in {} failed: {}", verb, channel, e),
            }
        });

        true
    }

    /// Handle an inbound message unless `stop` completes first.
    ///
    /// Returns `None` when `stop` won, which drops the message even if it was
    /// still waiting for a command slot.
    pub async fn dispatch_until<F>(&mut self, message: InboundMessage, stop: F) -> Option<bool>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = stop => None,
            started = self.dispatch(message) => Some(started),
        }
    }

    /// Wait for every running command to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join_result(result);
        }
    }

    /// Wait up to `grace` for running commands, then abort the rest.
    pub async fn shutdown(mut self, grace: Duration) {
        let running = self.tasks.len();
        if running > 0 {
            info!("Waiting for {} running commands", running);
        }

        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            warn!(
                "Aborting {} commands still running after {:?}",
                self.tasks.len(),
                grace
            );
            self.tasks.shutdown().await;
        }
        self.semaphore.close();
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join_result(result);
        }
    }
}

fn log_join_result(result: std::result::Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Command task panicked: {}", e);
        } else {
            debug!("Command task cancelled: {}", e);
        }
    }
}

/// Run one command for the channel the message came from.
///
/// `get` and `status` reply in the channel; the other commands are silent.
pub async fn execute(
    service: &RssService,
    notifier: &dyn Notifier,
    message: &InboundMessage,
    command: BotCommand,
) -> Result<()> {
    let channel = message.channel.as_str();

    match command {
        BotCommand::Subscribe { url } => {
            let request = SubscribeRequest::new(channel, &message.sender, url)
                .in_team(message.is_team);
            service.subscribe(&request).await?;
        }
        BotCommand::Get { id } => {
            let raw = service.get_by_id(channel, &id).await?;
            notifier.send(channel, &format_record_reply(&raw)).await?;
        }
        BotCommand::Status => {
            let raw = service.status(channel).await?;
            notifier.send(channel, &format_status_reply(&raw)).await?;
        }
        BotCommand::Refresh => {
            service.refresh(channel).await?;
        }
        BotCommand::Unsubscribe => {
            service.unsubscribe(channel).await?;
        }
    }

    Ok(())
}
