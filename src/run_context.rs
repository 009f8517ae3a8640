use log::{debug, info};
use std::sync::Arc;
use tokio::sync::watch;

use crate::step_logger::{StepLogger, StepStatus};

const PAUSE_STEP: &str = "Paused by user";
const PAUSE_TOOL: &str = "User";

/// Control signal written by the UI and read by the extractor at checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Running,
    Paused,
    Aborted,
}

/// Overall state of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Authenticating,
    FailedAuth,
    Fetching,
    Aborted,
    FailedFetch,
    Done,
}

/// Cloneable handle used by the UI to pause, resume or abort a run
#[derive(Clone)]
pub struct RunControl {
    tx: Arc<watch::Sender<ControlSignal>>,
}

impl RunControl {
    pub fn pause(&self) {
        self.tx.send_modify(|signal| {
            if *signal == ControlSignal::Running {
                *signal = ControlSignal::Paused;
            }
        });
    }

    pub fn resume(&self) {
        self.tx.send_modify(|signal| {
            if *signal == ControlSignal::Paused {
                *signal = ControlSignal::Running;
            }
        });
    }

    pub fn toggle_pause(&self) {
        self.tx.send_modify(|signal| {
            *signal = match *signal {
                ControlSignal::Running => ControlSignal::Paused,
                ControlSignal::Paused => ControlSignal::Running,
                ControlSignal::Aborted => ControlSignal::Aborted,
            };
        });
    }

    /// Abort wins over pause and cannot be undone within a run
    pub fn abort(&self) {
        self.tx.send_replace(ControlSignal::Aborted);
    }

    pub fn current(&self) -> ControlSignal {
        *self.tx.borrow()
    }
}

/// Returned by [`RunContext::checkpoint`] when the run was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

/// All mutable state owned by the current run: the step log, the
/// pause/abort signal and the run phase.
pub struct RunContext {
    logger: StepLogger,
    tx: Arc<watch::Sender<ControlSignal>>,
    rx: watch::Receiver<ControlSignal>,
    phase: RunPhase,
}

impl RunContext {
    pub fn new(logger: StepLogger) -> Self {
        let (tx, rx) = watch::channel(ControlSignal::Running);
        RunContext {
            logger,
            tx: Arc::new(tx),
            rx,
            phase: RunPhase::Idle,
        }
    }

    pub fn control(&self) -> RunControl {
        RunControl {
            tx: Arc::clone(&self.tx),
        }
    }

    /// Clear the log and signals before a new run
    pub fn reset(&mut self) {
        debug!("Resetting run context");
        self.logger.clear();
        self.tx.send_replace(ControlSignal::Running);
        let _ = self.rx.borrow_and_update();
        self.phase = RunPhase::Idle;
    }

    pub fn logger(&self) -> &StepLogger {
        &self.logger
    }

    pub fn log(&mut self, step: &str, tool: &str, status: StepStatus) {
        self.logger.log(step, tool, status);
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: RunPhase) {
        debug!("Run phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub fn signal(&self) -> ControlSignal {
        *self.rx.borrow()
    }

    /// Wait here while paused; fail if an abort is observed.
    ///
    /// Pausing is logged as its own step so the table shows the idle gap.
    pub async fn checkpoint(&mut self) -> Result<(), Aborted> {
        let mut paused = false;

        loop {
            let signal = *self.rx.borrow_and_update();
            match signal {
                ControlSignal::Running => {
                    if paused {
                        info!("▶️  Run resumed");
                        self.logger.log(PAUSE_STEP, PAUSE_TOOL, StepStatus::Success);
                    }
                    return Ok(());
                }
                ControlSignal::Aborted => {
                    if paused {
                        self.logger
                            .log(PAUSE_STEP, PAUSE_TOOL, StepStatus::Other("ABORTED".to_string()));
                    }
                    return Err(Aborted);
                }
                ControlSignal::Paused => {
                    if !paused {
                        info!("⏸️  Run paused");
                        self.logger.log(PAUSE_STEP, PAUSE_TOOL, StepStatus::Started);
                        paused = true;
                    }
                    // tx is owned by self, so changed() only errs during teardown
                    if self.rx.changed().await.is_err() {
                        return Err(Aborted);
                    }
                }
            }
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(StepLogger::headless())
    }
}
