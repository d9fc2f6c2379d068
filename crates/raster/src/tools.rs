//! Blocking invocation of external conversion tools with a time bound.

use deck_core::{Error, Result};
use std::ffi::OsStr;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Diagnostic output kept in error messages, in characters.
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args`, waiting at most `timeout`.
///
/// `tool` is the human-readable name used in errors. A program that cannot be
/// found maps to [`Error::ExternalToolMissing`]; a non-zero exit maps to
/// [`Error::ExternalToolFailed`] carrying the captured diagnostics; an overrun
/// kills the process and maps to [`Error::ExternalToolTimeout`].
///
/// The deadline also bounds collecting output: a helper the tool forked
/// that keeps the pipes open past the deadline is a timeout too.
pub fn run_tool(tool: &str, program: &Path, args: &[&OsStr], timeout: Duration) -> Result<ToolOutput> {
    log::debug!("Running {} ({}) with {:?}", tool, program.display(), args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::ExternalToolMissing {
                    tool: tool.to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

    // Drain pipes concurrently so a chatty tool cannot block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let deadline = started + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                log::warn!("{} timed out after {:?} - killing", tool, timeout);
                kill_and_reap(&mut child);
                return Err(timed_out(tool, timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(e.into());
            }
        }
    };

    let (Some(stdout), Some(stderr)) = (collect(&stdout, deadline), collect(&stderr, deadline)) else {
        log::warn!(
            "{} exited but its output pipes stayed open past {:?}",
            tool,
            timeout
        );
        return Err(timed_out(tool, timeout));
    };
    let output = ToolOutput { stdout, stderr };

    if !status.success() {
        let diagnostic = if output.stderr.trim().is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        return Err(Error::ExternalToolFailed {
            tool: tool.to_string(),
            status: describe_status(status),
            output: tail(diagnostic.trim(), MAX_DIAGNOSTIC_CHARS),
        });
    }

    log::debug!("{} finished in {:?}", tool, started.elapsed());
    Ok(output)
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait(); // Reap zombie
}

fn timed_out(tool: &str, timeout: Duration) -> Error {
    Error::ExternalToolTimeout {
        tool: tool.to_string(),
        seconds: timeout.as_secs(),
    }
}

/// Read a pipe to the end on a helper thread, delivering the text once.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = sender.send(String::from_utf8_lossy(&buf).into_owned());
        });
    }
    receiver
}

/// Drained text, or `None` if the pipe is still open at `deadline`.
fn collect(receiver: &Receiver<String>, deadline: Instant) -> Option<String> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match receiver.recv_timeout(remaining) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Last `max` characters of `text`.
fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_string()
    } else {
        text.chars().skip(count - max).collect()
    }
}
