//! # Notifier Module
//!
//! Best-effort side channel for the pipeline: alerts about problems, and delivery of the
//! finished files. Failures here are logged and counted but never change what the core
//! produced.
//!
//! - [`NoopNotifier`] only logs what it would send; it is the default.
//! - [`TelegramNotifier`] sends files to the report chat and alerts to the error chat, with
//!   timeouts, retries with jittered exponential back-off, and a shared [`CircuitBreaker`].

use rand::Rng;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Recipient};
use tracing::{error, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{RecoveryConfig, TelegramConfig};
use crate::errors::PipelineError;

/// Prefix of every alert, so operators can tell which job is complaining
pub const ALERT_PREFIX: &str = "ERROR phone_buckets: ";

/// Side channel receiving alerts and finished files
pub trait Notifier {
    /// Send a short problem report
    fn alert(&self, message: &str) -> impl Future<Output = Result<(), PipelineError>> + Send;

    /// Deliver a finished file
    fn deliver(&self, path: &Path) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    async fn alert(&self, message: &str) -> Result<(), PipelineError> {
        warn!(alert = %message, "Notifier not configured, alert not sent");
        Ok(())
    }

    async fn deliver(&self, path: &Path) -> Result<(), PipelineError> {
        info!(file = %path.display(), "Notifier not configured, file not delivered");
        Ok(())
    }
}

/// Delay before retry number `attempt` (0-based): exponential, capped, plus random jitter
pub fn retry_delay(config: &RecoveryConfig, attempt: u32) -> Duration {
    let exponential = config
        .base_retry_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    let capped = exponential.min(config.max_retry_delay_ms);

    let jitter_range = capped / 4;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped.saturating_add(jitter).min(config.max_retry_delay_ms))
}

/// Parse a chat reference: a numeric chat id or an `@channel` username
pub fn parse_recipient(value: &str) -> Result<Recipient, PipelineError> {
    let value = value.trim();
    if let Ok(id) = value.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if value.starts_with('@') && value.len() > 1 {
        return Ok(Recipient::ChannelUsername(value.to_string()));
    }
    Err(PipelineError::Config(format!(
        "invalid chat id '{value}' (expected a number or @channel)"
    )))
}

/// Notifier backed by Telegram bots
pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
    error_bot: Bot,
    error_chat: Recipient,
    recovery: RecoveryConfig,
    breaker: CircuitBreaker,
}

impl TelegramNotifier {
    /// Build the notifier; the error bot and chat fall back to the main ones when unset
    pub fn new(config: &TelegramConfig, recovery: &RecoveryConfig) -> Result<Self, PipelineError> {
        let bot = Bot::new(&config.bot_token);
        let chat = parse_recipient(&config.chat_id)?;

        let error_bot = match &config.error_bot_token {
            Some(token) => Bot::new(token),
            None => bot.clone(),
        };
        let error_chat = match &config.error_chat_id {
            Some(chat_id) => parse_recipient(chat_id)?,
            None => chat.clone(),
        };

        Ok(Self {
            bot,
            chat,
            error_bot,
            error_chat,
            recovery: recovery.clone(),
            breaker: CircuitBreaker::new(recovery),
        })
    }

    async fn send_text(&self, bot: &Bot, chat: &Recipient, text: &str) -> Result<(), PipelineError> {
        self.with_retries("sendMessage", || {
            let request = bot.send_message(chat.clone(), text.to_string());
            async move { request.await.map(|_| ()) }
        })
        .await
    }

    async fn with_retries<F, Fut>(&self, operation: &str, mut call: F) -> Result<(), PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), teloxide::RequestError>>,
    {
        let timeout = Duration::from_secs(self.recovery.operation_timeout_secs);
        let mut attempt = 0;

        loop {
            if self.breaker.is_open() {
                warn!(operation, "Circuit breaker open, skipping Telegram call");
                return Err(PipelineError::Notification(format!(
                    "{operation}: circuit breaker open"
                )));
            }

            let failure = match tokio::time::timeout(timeout, call()).await {
                Ok(Ok(())) => {
                    self.breaker.record_success();
                    return Ok(());
                }
                Ok(Err(e)) => PipelineError::Notification(format!("{operation}: {e}")),
                Err(_) => PipelineError::Timeout(format!(
                    "{operation} took longer than {}s",
                    timeout.as_secs()
                )),
            };

            self.breaker.record_failure();
            if attempt >= self.recovery.max_retries {
                error!(operation, attempts = attempt + 1, error = %failure, "Telegram call failed");
                return Err(failure);
            }

            let delay = retry_delay(&self.recovery, attempt);
            warn!(
                operation,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Telegram call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Notifier for TelegramNotifier {
    async fn alert(&self, message: &str) -> Result<(), PipelineError> {
        let text = format!("{ALERT_PREFIX}{message}");

        match self.send_text(&self.error_bot, &self.error_chat, &text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Last resort: the report chat through the main bot
                warn!(error = %e, "Alert delivery failed, falling back to the report chat");
                self.send_text(&self.bot, &self.chat, &text).await
            }
        }
    }

    async fn deliver(&self, path: &Path) -> Result<(), PipelineError> {
        let bot = &self.bot;
        let chat = &self.chat;
        let file = InputFile::file(path.to_path_buf());

        self.with_retries("sendDocument", || {
            let request = bot.send_document(chat.clone(), file.clone());
            async move { request.await.map(|_| ()) }
        })
        .await?;

        info!(file = %path.display(), "File delivered to Telegram");
        Ok(())
    }
}
