use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use regex::Regex;

use crate::error::RunError;
use crate::probe::{self, Tools};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RunStatus::Running,
            2 => RunStatus::Completed,
            3 => RunStatus::Failed,
            4 => RunStatus::Cancelled,
            _ => RunStatus::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            RunStatus::Idle => 0,
            RunStatus::Running => 1,
            RunStatus::Completed => 2,
            RunStatus::Failed => 3,
            RunStatus::Cancelled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

struct RunShared {
    status: AtomicU8,
    // Percent as f64 bits; written whole so readers never see a torn value.
    progress: AtomicU64,
    cancel_requested: AtomicBool,
    child_pid: AtomicU32,
    log: Mutex<String>,
    exit_desc: Mutex<Option<String>>,
}

impl RunShared {
    fn new() -> Self {
        Self {
            status: AtomicU8::new(RunStatus::Idle.as_u8()),
            progress: AtomicU64::new(0f64.to_bits()),
            cancel_requested: AtomicBool::new(false),
            child_pid: AtomicU32::new(0),
            log: Mutex::new(String::new()),
            exit_desc: Mutex::new(None),
        }
    }

    fn reset(&self) {
        self.status.store(RunStatus::Idle.as_u8(), Ordering::SeqCst);
        self.progress.store(0f64.to_bits(), Ordering::SeqCst);
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.child_pid.store(0, Ordering::SeqCst);
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
        *self.exit_desc.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn status(&self) -> RunStatus {
        RunStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    fn set_status(&self, status: RunStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }

    fn append_log(&self, line: &str) {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.push_str(line);
        log.push('\n');
    }

    fn log_snapshot(&self) -> String {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Cloneable view for whatever drives the interactive surface: progress
/// polling, status polling and cancellation.
#[derive(Clone)]
pub struct RunHandle {
    shared: Arc<RunShared>,
}

impl RunHandle {
    pub fn status(&self) -> RunStatus {
        self.shared.status()
    }

    pub fn progress(&self) -> f64 {
        f64::from_bits(self.shared.progress.load(Ordering::SeqCst))
    }

    pub fn log(&self) -> String {
        self.shared.log_snapshot()
    }

    /// Cooperative cancellation: request termination and let the process
    /// confirm by exiting. Any exit after this call counts as cancelled.
    pub fn cancel(&self) {
        if self.shared.status() != RunStatus::Running {
            return;
        }
        self.shared.cancel_requested.store(true, Ordering::SeqCst);
        let pid = self.shared.child_pid.load(Ordering::SeqCst);
        if pid != 0 {
            terminate(pid);
        }
    }
}

/// Owns the single active ffmpeg subprocess and its output-reader thread.
/// The reader thread is the only writer of terminal state transitions.
pub struct TranscodeRunner {
    shared: Arc<RunShared>,
    worker: Option<JoinHandle<()>>,
}

impl Default for TranscodeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeRunner {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RunShared::new()),
            worker: None,
        }
    }

    pub fn handle(&self) -> RunHandle {
        RunHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start a run. Only legal from `Idle` or a terminal state.
    pub fn start(&mut self, tools: &Tools, input: &Path, args: Vec<String>) -> Result<(), RunError> {
        if self.shared.status() == RunStatus::Running {
            return Err(RunError::Busy);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.shared.reset();

        // Denominator for the percentage; without it progress stays at 0.
        let total = probe::probe_duration_seconds(tools, input)
            .ok()
            .filter(|t| *t > 0.0);

        let mut child = Command::new(&tools.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(RunError::Launch)?;

        self.shared.child_pid.store(child.id(), Ordering::SeqCst);
        self.shared.set_status(RunStatus::Running);

        let stderr = child.stderr.take();
        let shared = Arc::clone(&self.shared);
        let worker = thread::spawn(move || {
            if let Some(stderr) = stderr {
                let re = time_marker_regex();
                for line in BufReader::new(stderr).lines() {
                    let Ok(line) = line else { break };
                    shared.append_log(&line);
                    if let (Some(elapsed), Some(total)) =
                        (extract_elapsed_seconds(&re, &line), total)
                    {
                        let percent = (elapsed / total).min(1.0) * 100.0;
                        shared.progress.store(percent.to_bits(), Ordering::SeqCst);
                    }
                }
            }
            match child.wait() {
                Ok(status) => {
                    let cancelled = shared.cancel_requested.load(Ordering::SeqCst);
                    let outcome = classify_exit(status, cancelled);
                    *shared.exit_desc.lock().unwrap_or_else(|e| e.into_inner()) =
                        Some(status.to_string());
                    if outcome == RunStatus::Completed {
                        shared.progress.store(100f64.to_bits(), Ordering::SeqCst);
                    }
                    shared.set_status(outcome);
                }
                Err(err) => {
                    shared.append_log(&format!("error waiting for ffmpeg: {err}"));
                    shared.set_status(RunStatus::Failed);
                }
            }
        });
        self.worker = Some(worker);
        Ok(())
    }

    /// Block until the run reaches a terminal state.
    pub fn wait(&mut self) -> Result<RunOutcome, RunError> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        match self.shared.status() {
            RunStatus::Completed => Ok(RunOutcome::Completed),
            RunStatus::Cancelled => Ok(RunOutcome::Cancelled),
            _ => {
                let status = self
                    .shared
                    .exit_desc
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone()
                    .unwrap_or_else(|| "unknown status".to_string());
                Err(RunError::Failure {
                    status,
                    log: self.shared.log_snapshot(),
                })
            }
        }
    }
}

const TERMINATION_SIGNAL: i32 = 15; // SIGTERM

fn classify_exit(status: ExitStatus, cancel_requested: bool) -> RunStatus {
    if cancel_requested {
        return RunStatus::Cancelled;
    }
    if status.success() {
        return RunStatus::Completed;
    }
    if terminated_by_signal(status) {
        return RunStatus::Cancelled;
    }
    RunStatus::Failed
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(TERMINATION_SIGNAL)
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> bool {
    false
}

#[cfg(unix)]
fn terminate(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn terminate(_pid: u32) {}

fn time_marker_regex() -> Regex {
    Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap()
}

/// Pull the elapsed `time=HH:MM:SS[.ms]` marker out of a diagnostic line.
/// Lines without a well-formed marker yield `None` and are simply skipped.
fn extract_elapsed_seconds(re: &Regex, line: &str) -> Option<f64> {
    let caps = re.captures(line)?;
    let h: f64 = caps[1].parse().ok()?;
    let m: f64 = caps[2].parse().ok()?;
    let s: f64 = caps[3].parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elapsed(line: &str) -> Option<f64> {
        extract_elapsed_seconds(&time_marker_regex(), line)
    }

    #[test]
    fn test_extracts_time_marker() {
        let line = "frame= 120 fps= 30 q=28.0 size= 512KiB time=00:01:01.50 bitrate= 68.7kbits/s";
        assert_eq!(elapsed(line), Some(61.5));
    }

    #[test]
    fn test_extracts_hours() {
        assert_eq!(elapsed("time=01:01:01"), Some(3661.0));
    }

    #[test]
    fn test_absent_or_malformed_markers_are_ignored() {
        assert_eq!(elapsed("Stream mapping:"), None);
        assert_eq!(elapsed("time=N/A bitrate=N/A"), None);
        assert_eq!(elapsed(""), None);
    }

    #[cfg(unix)]
    mod exit_classification {
        use super::super::*;
        use std::os::unix::process::ExitStatusExt;

        #[test]
        fn test_zero_exit_is_completed() {
            let status = ExitStatus::from_raw(0);
            assert_eq!(classify_exit(status, false), RunStatus::Completed);
        }

        #[test]
        fn test_nonzero_exit_is_failed() {
            let status = ExitStatus::from_raw(1 << 8);
            assert_eq!(classify_exit(status, false), RunStatus::Failed);
        }

        #[test]
        fn test_sigterm_is_cancelled_even_without_request() {
            let status = ExitStatus::from_raw(TERMINATION_SIGNAL);
            assert_eq!(classify_exit(status, true), RunStatus::Cancelled);
            assert_eq!(classify_exit(status, false), RunStatus::Cancelled);
        }

        #[test]
        fn test_any_exit_after_cancel_request_is_cancelled() {
            // The process may win the race and exit with its own code
            // before the signal lands.
            let status = ExitStatus::from_raw(255 << 8);
            assert_eq!(classify_exit(status, true), RunStatus::Cancelled);
            let status = ExitStatus::from_raw(0);
            assert_eq!(classify_exit(status, true), RunStatus::Cancelled);
        }
    }

    #[test]
    fn test_start_rejected_while_running() {
        let mut runner = TranscodeRunner::new();
        runner.shared.set_status(RunStatus::Running);
        let tools = Tools {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
        };
        let err = runner
            .start(&tools, Path::new("in.mkv"), vec![])
            .unwrap_err();
        assert!(matches!(err, RunError::Busy));
    }

    #[test]
    fn test_handle_reads_atomic_progress() {
        let runner = TranscodeRunner::new();
        let handle = runner.handle();
        runner.shared.progress.store(42.5f64.to_bits(), Ordering::SeqCst);
        assert_eq!(handle.progress(), 42.5);
        assert_eq!(handle.status(), RunStatus::Idle);
    }

    #[test]
    fn test_cancel_outside_running_is_a_noop() {
        let runner = TranscodeRunner::new();
        let handle = runner.handle();
        handle.cancel();
        assert!(!runner.shared.cancel_requested.load(Ordering::SeqCst));
    }
}
