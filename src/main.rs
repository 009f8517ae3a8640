use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use recipient_export::config::Config;
use recipient_export::export::CsvSpreadsheetWriter;
use recipient_export::extractor::RetryPolicy;
use recipient_export::gmail_client::GmailConnector;
use recipient_export::orchestrator::{run_extraction, RunOutcome, RunRequest};
use recipient_export::run_context::RunContext;
use recipient_export::step_logger::StepLogger;
use recipient_export::ui::{spawn_control_listener, TerminalView};

const APP_TITLE: &str = "Gmail Recipient Extractor";

#[derive(Parser)]
#[command(name = "recipient-export")]
#[command(about = "Extract the distinct recipients of every email sent by a sender and export them to a spreadsheet")]
#[command(version = "0.1.0")]
struct Args {
    /// Sender email address to search for (default: DEFAULT_SENDER)
    #[arg(short, long)]
    sender: Option<String>,

    /// Maximum number of messages to scan (default: MESSAGE_LIMIT or 500)
    #[arg(short = 'l', long)]
    limit: Option<u32>,

    /// Folder where the spreadsheet is saved (default: EXPORT_DIR or .)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Authentication attempts before giving up (default: AUTH_MAX_RETRIES or 3)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Disable status colors in the log table
    #[arg(long)]
    no_color: bool,

    /// Check the configuration without connecting
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Charger le fichier .env s'il existe
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("❌ Error during execution: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = Config::new()?;

    let sender = args
        .sender
        .or_else(|| config.extraction.default_sender.clone())
        .ok_or_else(|| anyhow::anyhow!("No sender given: use --sender or set DEFAULT_SENDER"))?;

    let request = RunRequest {
        sender,
        limit: args.limit.unwrap_or(config.extraction.message_limit),
        output_dir: args
            .output_dir
            .unwrap_or_else(|| PathBuf::from(&config.export_dir)),
        max_retries: args.max_retries.unwrap_or(config.extraction.auth_max_retries),
        retry: RetryPolicy::fixed(config.extraction.auth_retry_delay()),
    };

    if args.check_config {
        println!("✅ Configuration valide !");
        println!("📧 Gmail API OAuth2");
        println!("🔑 Credentials: {}", config.gmail.credentials_path);
        println!("💾 Token cache: {}", config.gmail.token_cache_path);
        println!("📨 Sender: {}", request.sender);
        println!("🔢 Message limit: {}", request.limit);
        println!("📁 Export folder: {}", request.output_dir.display());
        println!("🔁 Auth attempts: {} ({}s apart)", request.max_retries, request.retry.delay.as_secs());
        return Ok(ExitCode::SUCCESS);
    }

    info!("🚀 Starting recipient extraction for {}", request.sender);

    let view = TerminalView::new(APP_TITLE, !args.no_color);
    let mut ctx = RunContext::new(StepLogger::new(Box::new(view)));
    let mut listener = spawn_control_listener(ctx.control());

    let connector = GmailConnector::new(config.gmail.clone());
    let result = tokio::select! {
        result = run_extraction(connector, &mut ctx, &CsvSpreadsheetWriter, &request) => result,
        // The listener only finishes on a second Ctrl+C
        _ = &mut listener => {
            println!("🛑 Interrupted, exiting.");
            return Ok(ExitCode::from(130));
        }
    };
    listener.abort();

    match result? {
        RunOutcome::Exported { path, count } => {
            println!("✅ Done! {} unique IDs saved to: {}", count, path.display());
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::NoRecipients => {
            println!("⚠️  No emails found from that sender.");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Cancelled => {
            println!("⚠️  Extraction aborted by user.");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::AuthFailed => {
            println!(
                "⚠️  Authentication failed after {} attempt(s). Check {}.",
                request.max_retries.max(1),
                config.gmail.credentials_path
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
