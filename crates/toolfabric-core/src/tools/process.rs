//! Process-backed tools
//!
//! The backend owns one child process. Its output is drained into the
//! logger so the child never blocks on a full pipe. Stopping asks the child
//! to terminate and kills it if it is still running after the shutdown
//! timeout.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::error::{HealthError, HealthResult, ToolError, ToolResult};
use crate::connection::Connection;
use crate::logging::SharedLogger;
use crate::types::{Invocable, ToolKind};
use crate::{log_debug, log_info, log_warn};

/// Poll interval while waiting for a terminated child to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Backend of a process-backed tool
pub struct ProcessBackend {
    tool: String,
    command: Vec<String>,
    shutdown_timeout: Duration,
    child: Mutex<Option<Child>>,
    logger: SharedLogger,
    label: String,
}

impl ProcessBackend {
    pub fn new(
        tool: impl Into<String>,
        command: Vec<String>,
        shutdown_timeout: Duration,
        logger: SharedLogger,
    ) -> Self {
        let tool = tool.into();
        let label = format!("[ProcessTool:{}]", tool);
        Self {
            tool,
            command,
            shutdown_timeout,
            child: Mutex::new(None),
            logger,
            label,
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// OS process id while the child is alive
    pub fn pid(&self) -> Option<u32> {
        self.child.lock().as_ref().map(Child::id)
    }

    pub fn is_running(&self) -> bool {
        self.health_check().is_ok()
    }

    /// Launch the child process
    pub fn start(&self) -> ToolResult<()> {
        let mut slot = self.child.lock();
        if slot.is_some() {
            return Ok(());
        }

        let Some((program, args)) = self.command.split_first() else {
            return Err(crate::config::ConfigError::EmptyCommand {
                tool: self.tool.clone(),
            }
            .into());
        };

        log_info!(self.logger, "{} Starting process: {}", self.label, self.command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;

        if let Some(stdout) = child.stdout.take() {
            self.drain(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            self.drain(stderr, "stderr");
        }

        log_debug!(self.logger, "{} Process started with pid {}", self.label, child.id());
        *slot = Some(child);
        Ok(())
    }

    /// Forward one output stream to the logger, line by line
    ///
    /// The thread is detached: it ends at EOF, which may come later than the
    /// child's exit if a grandchild inherited the pipe.
    fn drain<R: Read + Send + 'static>(&self, stream: R, channel: &'static str) {
        let logger = self.logger.clone();
        let label = self.label.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}:{}", channel, self.tool))
            .spawn(move || {
                for line in BufReader::new(stream).lines().map_while(Result::ok) {
                    log_debug!(logger, "{} {}: {}", label, channel, line);
                }
            });
        if let Err(e) = spawned {
            log_warn!(self.logger, "{} Cannot capture {}: {}", self.label, channel, e);
        }
    }

    /// Fails once the process has exited
    pub fn health_check(&self) -> HealthResult<()> {
        let mut slot = self.child.lock();
        let child = slot.as_mut().ok_or(HealthError::NotStarted)?;
        match child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => Err(HealthError::ProcessExited {
                status: status.to_string(),
            }),
            Err(e) => Err(HealthError::Probe(e.to_string())),
        }
    }

    /// Terminate the child: graceful first, forced after the shutdown timeout
    ///
    /// A no-op when the process was never started or is already stopped.
    pub fn stop(&self) -> ToolResult<()> {
        let Some(mut child) = self.child.lock().take() else {
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            log_info!(self.logger, "{} Process already exited ({})", self.label, status);
            return Ok(());
        }

        log_info!(self.logger, "{} Terminating process {}", self.label, child.id());
        if let Err(e) = request_termination(&mut child) {
            log_warn!(self.logger, "{} Terminate request failed: {}", self.label, e);
        }

        if let Some(status) = self.wait_for_exit(&mut child, self.shutdown_timeout) {
            log_info!(self.logger, "{} Process exited ({})", self.label, status);
            return Ok(());
        }

        log_warn!(
            self.logger,
            "{} Process did not exit within {:?}, killing",
            self.label,
            self.shutdown_timeout
        );
        // Fails only if the child exited after the last poll; `wait` reaps either way
        let _ = child.kill();
        let status = child.wait().map_err(|e| ToolError::Shutdown {
            tool: self.tool.clone(),
            message: e.to_string(),
        })?;
        log_info!(self.logger, "{} Process killed ({})", self.label, status);
        Ok(())
    }

    fn wait_for_exit(&self, child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
        // No deadline when the grace period is beyond what `Instant` can represent
        let deadline = Instant::now().checked_add(timeout);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if deadline.map_or(true, |d| Instant::now() < d) => {
                    thread::sleep(EXIT_POLL_INTERVAL)
                }
                Ok(None) => return None,
                Err(e) => {
                    log_warn!(self.logger, "{} Cannot poll process: {}", self.label, e);
                    return None;
                }
            }
        }
    }

    /// `(action, payload)` callable that forwards to every connection
    ///
    /// Returns an acknowledgement string; connections that could not take
    /// the message are listed in it rather than raised.
    pub fn invocable(&self, connections: Vec<Arc<Connection>>, logger: SharedLogger) -> Invocable {
        let tool = self.tool.clone();
        let label = self.label.clone();

        Invocable::new(self.tool.clone(), ToolKind::Process, move |args| {
            let (action, payload) = args.action_parts();
            let message = json!({ "action": action, "payload": payload });

            let failed: Vec<&str> = connections
                .iter()
                .filter(|conn| conn.send(&message).is_none())
                .map(|conn| conn.name())
                .collect();

            if failed.is_empty() {
                Value::String(format!("[{}] {} executed", tool, action))
            } else {
                log_warn!(logger, "{} {} not delivered to: {}", label, action, failed.join(", "));
                Value::String(format!(
                    "[{}] {} executed (not delivered to: {})",
                    tool,
                    action,
                    failed.join(", ")
                ))
            }
        })
    }
}

impl std::fmt::Debug for ProcessBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessBackend")
            .field("tool", &self.tool)
            .field("command", &self.command)
            .field("pid", &self.pid())
            .finish()
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}
