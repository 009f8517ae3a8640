use chrono::{DateTime, Local};
use log::{info, warn};
use std::fmt;

/// Lifecycle state of a logged step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Started,
    Success,
    Failed,
    Retried,
    /// Any other label (e.g. "ABORTED", "PAUSED"), rendered in the default color
    Other(String),
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Started => "STARTED",
            StepStatus::Success => "SUCCESS",
            StepStatus::Failed => "FAILED",
            StepStatus::Retried => "RETRIED",
            StepStatus::Other(label) => label.as_str(),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, StepStatus::Started)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StepStatus {
    fn from(value: &str) -> Self {
        match value {
            "STARTED" => StepStatus::Started,
            "SUCCESS" => StepStatus::Success,
            "FAILED" => StepStatus::Failed,
            "RETRIED" => StepStatus::Retried,
            other => StepStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    /// 1-based position in the run, never reused
    pub order: usize,
    pub timestamp: DateTime<Local>,
    pub step: String,
    pub tool: String,
    pub status: StepStatus,
}

/// Display collaborator that receives the full entry list after every change
pub trait LogView: Send {
    fn render(&mut self, entries: &[LogEntry]);
}

/// View that draws nothing, for headless runs
pub struct NullView;

impl LogView for NullView {
    fn render(&mut self, _entries: &[LogEntry]) {}
}

/// Ordered step log for a single run.
///
/// A `Started` call always appends. Any other status closes the most recent
/// open entry with the same step name, or appends a new row when none is open.
pub struct StepLogger {
    entries: Vec<LogEntry>,
    view: Box<dyn LogView>,
}

impl StepLogger {
    pub fn new(view: Box<dyn LogView>) -> Self {
        StepLogger {
            entries: Vec::new(),
            view,
        }
    }

    pub fn headless() -> Self {
        Self::new(Box::new(NullView))
    }

    pub fn log(&mut self, step: &str, tool: &str, status: StepStatus) {
        let now = Local::now();

        match &status {
            StepStatus::Failed => warn!("[{}] {} - {}", tool, step, status),
            _ => info!("[{}] {} - {}", tool, step, status),
        }

        if status.is_started() || !self.close_open_step(step, &status, now) {
            let order = self.entries.len() + 1;
            self.entries.push(LogEntry {
                order,
                timestamp: now,
                step: step.to_string(),
                tool: tool.to_string(),
                status,
            });
        }

        self.view.render(&self.entries);
    }

    fn close_open_step(&mut self, step: &str, status: &StepStatus, now: DateTime<Local>) -> bool {
        match self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.step == step && entry.status.is_started())
        {
            Some(entry) => {
                entry.status = status.clone();
                entry.timestamp = now;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `step` currently has an unresolved `Started` entry
    pub fn is_open(&self, step: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.step == step && entry.status.is_started())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.view.render(&self.entries);
    }
}

impl Default for StepLogger {
    fn default() -> Self {
        Self::headless()
    }
}
