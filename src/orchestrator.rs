use anyhow::Result;
use log::{info, warn};
use std::path::PathBuf;

use crate::export::{export_recipients, SpreadsheetWriter};
use crate::extractor::{ExtractError, RecipientExtractor, RetryPolicy};
use crate::mail_api::MailConnector;
use crate::run_context::RunContext;
use crate::step_logger::StepStatus;

/// User input for one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub sender: String,
    pub limit: u32,
    pub output_dir: PathBuf,
    pub max_retries: u32,
    pub retry: RetryPolicy,
}

/// How a run ended, short of a hard failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Exported { path: PathBuf, count: usize },
    NoRecipients,
    AuthFailed,
    Cancelled,
}

/// Authenticate, fetch and export for a single sender.
///
/// Cancellation and authentication failure are outcomes, not errors. Any
/// other failure is logged as a `System` step and returned.
pub async fn run_extraction<C, W>(
    connector: C,
    ctx: &mut RunContext,
    writer: &W,
    request: &RunRequest,
) -> Result<RunOutcome>
where
    C: MailConnector,
    W: SpreadsheetWriter + ?Sized,
{
    ctx.reset();
    info!("🚀 Starting extraction for sender {}", request.sender);

    let fetched = {
        let mut extractor = RecipientExtractor::new(connector, ctx, request.retry);

        if !extractor.authenticate(request.max_retries).await {
            warn!("Authentication failed after {} attempt(s)", request.max_retries.max(1));
            return Ok(RunOutcome::AuthFailed);
        }

        extractor
            .fetch_distinct_recipients(&request.sender, request.limit)
            .await
    };

    let recipients = match fetched {
        Ok(recipients) => recipients,
        Err(ExtractError::Cancelled) => return Ok(RunOutcome::Cancelled),
        Err(e) => {
            ctx.log(&format!("Failure: {:#}", e), "System", StepStatus::Failed);
            return Err(e.into());
        }
    };

    if recipients.is_empty() {
        info!("No recipients found for sender {}", request.sender);
        return Ok(RunOutcome::NoRecipients);
    }

    let step = "Saving to spreadsheet";
    ctx.log(step, writer.label(), StepStatus::Started);
    match export_recipients(writer, &request.output_dir, &recipients) {
        Ok(path) => {
            ctx.log(step, writer.label(), StepStatus::Success);
            Ok(RunOutcome::Exported {
                path,
                count: recipients.len(),
            })
        }
        Err(e) => {
            ctx.log(step, writer.label(), StepStatus::Failed);
            ctx.log(&format!("Failure: {:#}", e), "System", StepStatus::Failed);
            Err(e)
        }
    }
}
