use log::{debug, info, warn};
use std::future::Future;
use std::io::{self, BufRead, IsTerminal, Write};
use std::thread;
use tokio::task::JoinHandle;

use crate::run_context::RunControl;
use crate::step_logger::{LogEntry, LogView, StepStatus};
use super::table::{render_row, render_table};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Step table on stdout.
///
/// On a terminal the whole table is redrawn after every change. When stdout
/// is redirected, each new or updated row is printed once as its own line.
pub struct TerminalView {
    title: String,
    colored: bool,
    redraw: bool,
    printed: Vec<StepStatus>,
}

impl TerminalView {
    pub fn new(title: impl Into<String>, colored: bool) -> Self {
        let is_tty = io::stdout().is_terminal();
        Self::with_mode(title, colored && is_tty, is_tty)
    }

    fn with_mode(title: impl Into<String>, colored: bool, redraw: bool) -> Self {
        TerminalView {
            title: title.into(),
            colored,
            redraw,
            printed: Vec::new(),
        }
    }

    fn full_table(&self, entries: &[LogEntry]) -> String {
        let mut out = String::from(CLEAR_SCREEN);
        out.push_str(&format!("📧 {}\n\n", self.title));
        out.push_str("Live Execution Logs\n");
        out.push_str(&render_table(entries, self.colored));
        out.push_str("\n[p + Enter] pause/resume   [a + Enter] abort   [Ctrl+C] abort\n");
        out
    }

    /// Rows appended or updated since the previous call
    fn changed_rows(&mut self, entries: &[LogEntry]) -> String {
        let mut out = String::new();
        if entries.len() < self.printed.len() {
            // log was reset for a new run
            self.printed.clear();
        }
        if self.printed.is_empty() && !entries.is_empty() {
            out.push_str(&format!("📧 {}\n", self.title));
        }

        for (i, entry) in entries.iter().enumerate() {
            let changed = self.printed.get(i).map_or(true, |status| *status != entry.status);
            if changed {
                out.push_str(&render_row(entry, self.colored));
                out.push('\n');
            }
        }
        self.printed = entries.iter().map(|entry| entry.status.clone()).collect();
        out
    }
}

impl LogView for TerminalView {
    fn render(&mut self, entries: &[LogEntry]) {
        let out = if self.redraw {
            self.full_table(entries)
        } else {
            self.changed_rows(entries)
        };
        if out.is_empty() {
            return;
        }

        let mut stdout = io::stdout().lock();
        // A closed stdout must not take the run down with it
        if let Err(e) = stdout.write_all(out.as_bytes()).and_then(|_| stdout.flush()) {
            debug!("Unable to draw log table: {}", e);
        }
    }
}

/// Translate keyboard input and Ctrl+C into run control signals.
///
/// The listener only flips signals; the extraction itself keeps running on
/// the caller's task. Stdin is read on a detached thread so a pending read
/// never holds the runtime open at exit. The returned task finishes only
/// when a second Ctrl+C asks to quit.
pub fn spawn_control_listener(control: RunControl) -> JoinHandle<()> {
    let keyboard = control.clone();
    let spawned = thread::Builder::new()
        .name("keyboard-controls".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => apply_command(&keyboard, line.trim()),
                    Err(e) => {
                        warn!("Unable to read keyboard input: {}", e);
                        return;
                    }
                }
            }
            debug!("stdin closed, keyboard controls disabled");
        });
    if let Err(e) = spawned {
        warn!("Keyboard controls unavailable: {}", e);
    }

    tokio::spawn(handle_interrupts(control, tokio::signal::ctrl_c))
}

/// First interrupt aborts the run, the second one returns.
///
/// If interrupts cannot be received this never returns.
async fn handle_interrupts<F, Fut>(control: RunControl, mut next_interrupt: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!("Ctrl+C handling unavailable: {}", e);
        return futures::future::pending().await;
    }
    info!("🛑 Ctrl+C received, aborting run");
    control.abort();

    // Abort is only observed between messages; the second Ctrl+C lets the
    // caller quit even while blocked in the browser authorization flow
    if let Err(e) = next_interrupt().await {
        warn!("Ctrl+C handling unavailable: {}", e);
        return futures::future::pending().await;
    }
    warn!("Second Ctrl+C received, quitting");
}

fn apply_command(control: &RunControl, command: &str) {
    match command.to_lowercase().as_str() {
        "p" | "pause" | "r" | "resume" => control.toggle_pause(),
        "a" | "abort" | "q" | "quit" => control.abort(),
        "" => {}
        other => debug!("Unknown command '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_context::{ControlSignal, RunContext};
    use crate::step_logger::StepLogger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// View shim that keeps what a redirected stdout would receive
    struct Captured {
        view: TerminalView,
        output: Arc<Mutex<String>>,
    }

    impl LogView for Captured {
        fn render(&mut self, entries: &[LogEntry]) {
            let out = self.view.changed_rows(entries);
            self.output.lock().unwrap().push_str(&out);
        }
    }

    fn redirected_logger() -> (StepLogger, Arc<Mutex<String>>) {
        let output = Arc::new(Mutex::new(String::new()));
        let view = Captured {
            view: TerminalView::with_mode("Recipient Export", false, false),
            output: Arc::clone(&output),
        };
        (StepLogger::new(Box::new(view)), output)
    }

    #[test]
    fn test_redirected_output_prints_each_change_once() {
        let (mut logger, output) = redirected_logger();

        logger.log("Checking OAuth Tokens", "Google Auth", StepStatus::Started);
        logger.log("Checking OAuth Tokens", "Google Auth", StepStatus::Success);
        logger.log("Processing Msg ID: 1", "Gmail API", StepStatus::Started);

        let output = output.lock().unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "📧 Recipient Export");
        assert!(lines[1].starts_with("1 | ") && lines[1].ends_with("| STARTED"));
        assert!(lines[2].starts_with("1 | ") && lines[2].ends_with("| SUCCESS"));
        assert!(lines[3].starts_with("2 | "));
        assert!(lines[3].ends_with("| Processing Msg ID: 1 | Gmail API | STARTED"));
        assert!(!output.contains(CLEAR_SCREEN));
    }

    #[test]
    fn test_redirected_output_grows_linearly() {
        let (mut logger, output) = redirected_logger();

        for i in 0..500 {
            let step = format!("Processing Msg ID: {}", i);
            logger.log(&step, "Gmail API", StepStatus::Started);
            logger.log(&step, "Gmail API", StepStatus::Success);
        }

        let output = output.lock().unwrap();
        assert_eq!(output.lines().count(), 1 + 1000);
        assert!(output.len() < 100_000);
    }

    #[test]
    fn test_redirected_output_restarts_after_reset() {
        let (logger, output) = redirected_logger();
        let mut ctx = RunContext::new(logger);

        ctx.log("a", "tool", StepStatus::Started);
        ctx.log("b", "tool", StepStatus::Started);
        ctx.reset();
        ctx.log("c", "tool", StepStatus::Started);

        let output = output.lock().unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], "📧 Recipient Export");
        assert!(lines[4].starts_with("1 | ") && lines[4].contains("| c |"));
    }

    #[test]
    fn test_terminal_redraw_contains_whole_table() {
        let mut view = TerminalView::with_mode("Recipient Export", false, true);
        let mut logger = StepLogger::headless();
        logger.log("a", "tool", StepStatus::Started);
        logger.log("b", "tool", StepStatus::Started);

        let out = view.full_table(logger.entries());
        assert!(out.starts_with(CLEAR_SCREEN));
        assert_eq!(out.matches("| STARTED").count(), 2);
    }

    #[tokio::test]
    async fn test_first_interrupt_aborts_second_returns() {
        let ctx = RunContext::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        handle_interrupts(ctx.control(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.signal(), ControlSignal::Aborted);
    }

    #[tokio::test]
    async fn test_interrupt_failure_leaves_run_alone() {
        let ctx = RunContext::default();
        let listener = handle_interrupts(ctx.control(), || {
            futures::future::ready(Err(io::Error::new(io::ErrorKind::Other, "no signals")))
        });

        let finished = tokio::time::timeout(Duration::from_millis(50), listener).await;
        assert!(finished.is_err());
        assert_eq!(ctx.signal(), ControlSignal::Running);
    }

    #[test]
    fn test_commands() {
        let ctx = RunContext::default();
        let control = ctx.control();

        apply_command(&control, "p");
        assert_eq!(ctx.signal(), ControlSignal::Paused);
        apply_command(&control, "P");
        assert_eq!(ctx.signal(), ControlSignal::Running);
        apply_command(&control, "hello");
        assert_eq!(ctx.signal(), ControlSignal::Running);
        apply_command(&control, "a");
        assert_eq!(ctx.signal(), ControlSignal::Aborted);
        apply_command(&control, "p");
        assert_eq!(ctx.signal(), ControlSignal::Aborted);
    }
}
