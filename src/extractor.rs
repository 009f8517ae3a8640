use log::{debug, error, info, warn};
use std::time::Duration;

use crate::mail_api::{MailApi, MailConnector};
use crate::recipients::RecipientSet;
use crate::run_context::{RunContext, RunPhase};
use crate::step_logger::StepStatus;

pub const AUTH_STEP: &str = "Checking OAuth Tokens";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("aborted by user")]
    Cancelled,

    #[error("not authenticated: call authenticate() before fetching")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl ExtractError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExtractError::Cancelled)
    }
}

/// Delay between authentication attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        RetryPolicy { delay }
    }

    pub fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(2))
    }
}

/// Authenticates against a mail service and collects the distinct
/// recipients of every message sent by one sender.
pub struct RecipientExtractor<'r, C: MailConnector> {
    connector: C,
    api: Option<C::Api>,
    ctx: &'r mut RunContext,
    retry: RetryPolicy,
}

impl<'r, C: MailConnector> RecipientExtractor<'r, C> {
    pub fn new(connector: C, ctx: &'r mut RunContext, retry: RetryPolicy) -> Self {
        RecipientExtractor {
            connector,
            api: None,
            ctx,
            retry,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.is_some()
    }

    pub fn context(&self) -> &RunContext {
        &*self.ctx
    }

    /// Try to connect up to `max_retries` times (at least once).
    ///
    /// Every failure is logged as RETRIED, except the last one which is
    /// logged as FAILED. Errors never escape: the result is only the bool.
    pub async fn authenticate(&mut self, max_retries: u32) -> bool {
        let attempts = max_retries.max(1);
        let tool = self.connector.auth_label().to_string();
        self.ctx.set_phase(RunPhase::Authenticating);

        for attempt in 1..=attempts {
            self.ctx.log(AUTH_STEP, &tool, StepStatus::Started);

            match self.connector.connect().await {
                Ok(api) => {
                    info!("✅ Authenticated on attempt {}/{}", attempt, attempts);
                    self.api = Some(api);
                    self.ctx.log(AUTH_STEP, &tool, StepStatus::Success);
                    return true;
                }
                Err(e) if attempt < attempts => {
                    warn!("⚠️  Authentication attempt {}/{} failed: {:#}", attempt, attempts, e);
                    self.ctx.log(AUTH_STEP, &tool, StepStatus::Retried);
                    if !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(e) => {
                    error!("❌ Authentication failed after {} attempt(s): {:#}", attempts, e);
                    self.ctx.log(AUTH_STEP, &tool, StepStatus::Failed);
                }
            }
        }

        self.ctx.set_phase(RunPhase::FailedAuth);
        false
    }

    /// Scan every message from `sender` (at most `limit`) and return the
    /// sorted, duplicate-free recipient list.
    ///
    /// The pause/abort signal is honored before listing and before each
    /// message. An abort yields [`ExtractError::Cancelled`] and drops the
    /// partial result.
    pub async fn fetch_distinct_recipients(
        &mut self,
        sender: &str,
        limit: u32,
    ) -> Result<Vec<String>, ExtractError> {
        let api = self.api.as_ref().ok_or(ExtractError::NotAuthenticated)?;
        let tool = self.connector.api_label().to_string();
        let search_step = format!("Searching emails from {}", sender);

        self.ctx.set_phase(RunPhase::Fetching);
        self.ctx.log(&search_step, &tool, StepStatus::Started);

        let mut recipients = RecipientSet::new();
        let result = scan_messages(
            api,
            self.ctx,
            &mut recipients,
            &format!("from:{}", sender),
            limit,
            &tool,
        )
        .await;

        match result {
            Ok(scanned) => {
                self.ctx.log(&search_step, &tool, StepStatus::Success);
                self.ctx.log(
                    &format!("Extracted {} distinct IDs", recipients.len()),
                    &tool,
                    StepStatus::Success,
                );
                info!(
                    "✅ {} message(s) scanned, {} distinct recipient(s) for {}",
                    scanned,
                    recipients.len(),
                    sender
                );
                self.ctx.set_phase(RunPhase::Done);
                Ok(recipients.into_sorted_vec())
            }
            Err(ExtractError::Cancelled) => {
                warn!("🛑 Extraction aborted by user");
                self.ctx
                    .log(&search_step, &tool, StepStatus::Other("ABORTED".to_string()));
                self.ctx.set_phase(RunPhase::Aborted);
                Err(ExtractError::Cancelled)
            }
            Err(e) => {
                error!("❌ Fetch failed: {:#}", e);
                self.ctx.log(&search_step, &tool, StepStatus::Failed);
                self.ctx
                    .log(&format!("Fetch failed: {:#}", e), &tool, StepStatus::Failed);
                self.ctx.set_phase(RunPhase::FailedFetch);
                Err(e)
            }
        }
    }
}

async fn scan_messages<A: MailApi>(
    api: &A,
    ctx: &mut RunContext,
    recipients: &mut RecipientSet,
    query: &str,
    limit: u32,
    tool: &str,
) -> Result<usize, ExtractError> {
    ctx.checkpoint().await.map_err(|_| ExtractError::Cancelled)?;

    debug!("Search criteria: {} (limit {})", query, limit);
    let message_ids = api.list_message_ids(query, limit).await?;
    info!("Found {} message(s) matching '{}'", message_ids.len(), query);

    let mut scanned = 0;
    for message_id in message_ids.iter().take(limit as usize) {
        ctx.checkpoint().await.map_err(|_| ExtractError::Cancelled)?;

        let step = format!("Processing Msg ID: {}", message_id);
        ctx.log(&step, tool, StepStatus::Started);

        match api.message_headers(message_id).await {
            Ok(headers) => {
                let added = recipients.add_headers(&headers);
                debug!("Message {}: {} header(s), {} new recipient(s)", message_id, headers.len(), added);
                ctx.log(&step, tool, StepStatus::Success);
                scanned += 1;
            }
            Err(e) => {
                ctx.log(&step, tool, StepStatus::Failed);
                return Err(ExtractError::Api(
                    e.context(format!("Unable to read headers of message {}", message_id)),
                ));
            }
        }
    }

    Ok(scanned)
}
