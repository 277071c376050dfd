//! # RAII Stop Guard
//!
//! Keeps the target process stopped while its memory is being read, so the
//! engine can't rehash a table or free an object halfway through a render.
//!
//! The guard sends `SIGSTOP`, waits for `/proc/<pid>/stat` to report the
//! stopped state and sends `SIGCONT` when dropped. A process that is already
//! stopped (by a debugger, or by job control) is left alone: the guard does
//! nothing on either end.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zvaldump_core::platform::linux::guards::StopGuard;
//! use zvaldump_core::types::ProcessId;
//!
//! let guard = StopGuard::new(ProcessId::from(12345))?;
//! // ... read memory ...
//! guard.resume()?;
//! # Ok::<(), zvaldump_core::InspectError>(())
//! ```

use std::fs;
use std::io::{self, ErrorKind};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{InspectError, Result};
use crate::types::ProcessId;

/// How often the stat file is polled while waiting for the stop
const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Polls before giving up, about one second
const POLL_ATTEMPTS: u32 = 200;

/// RAII guard that stops a process and continues it when dropped
#[derive(Debug)]
pub struct StopGuard
{
    pid: ProcessId,
    active: bool,
}

impl StopGuard
{
    /// Stop `pid` unless it is already stopped
    ///
    /// ## Errors
    ///
    /// - `ProcessNotFound`: no such process
    /// - `PermissionDenied`: not allowed to signal the process
    /// - `SuspendFailed`: the process didn't reach the stopped state in time
    pub fn new(pid: ProcessId) -> Result<Self>
    {
        if is_stopped(process_state(pid)?) {
            debug!(%pid, "process already stopped");
            return Ok(StopGuard { pid, active: false });
        }

        signal(pid, libc::SIGSTOP).map_err(|err| signal_error(pid, err, InspectError::SuspendFailed))?;
        // From here on the drop sends SIGCONT, even if the wait below fails.
        let guard = StopGuard { pid, active: true };

        for _ in 0..POLL_ATTEMPTS {
            if is_stopped(process_state(pid)?) {
                debug!(%pid, "process stopped");
                return Ok(guard);
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(InspectError::SuspendFailed(format!("PID {pid} did not stop")))
    }

    /// Whether this guard stopped the process and will continue it
    pub fn is_active(&self) -> bool
    {
        self.active
    }

    /// Continue the process now instead of on drop
    pub fn resume(mut self) -> Result<()>
    {
        if self.active {
            self.active = false;
            signal(self.pid, libc::SIGCONT).map_err(|err| signal_error(self.pid, err, InspectError::ResumeFailed))?;
            debug!(pid = %self.pid, "process continued");
        }
        Ok(())
    }
}

impl Drop for StopGuard
{
    fn drop(&mut self)
    {
        if self.active {
            if let Err(err) = signal(self.pid, libc::SIGCONT) {
                warn!(pid = %self.pid, error = %err, "failed to continue process");
            }
        }
    }
}

/// The state letter from `/proc/<pid>/stat` (`R`, `S`, `T`, `t`, …)
pub fn process_state(pid: ProcessId) -> Result<char>
{
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).map_err(|err| match err.kind() {
        ErrorKind::NotFound => InspectError::ProcessNotFound(pid.0),
        _ => InspectError::Io(err),
    })?;
    parse_state(&stat).ok_or_else(|| InspectError::InvalidArgument(format!("malformed /proc/{pid}/stat")))
}

/// The command name may contain spaces and parentheses, so the state is the
/// first field after the last `)`.
fn parse_state(stat: &str) -> Option<char>
{
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.trim_start().chars().next()
}

/// `T` is a signal stop, `t` a tracing stop
fn is_stopped(state: char) -> bool
{
    matches!(state, 'T' | 't')
}

fn signal(pid: ProcessId, signal: libc::c_int) -> io::Result<()>
{
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let result = unsafe { libc::kill(pid.0 as libc::pid_t, signal) };
    if result == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
}

fn signal_error(pid: ProcessId, err: io::Error, otherwise: fn(String) -> InspectError) -> InspectError
{
    match err.raw_os_error() {
        Some(libc::ESRCH) => InspectError::ProcessNotFound(pid.0),
        Some(libc::EPERM) => InspectError::PermissionDenied(format!("signal PID {pid}")),
        _ => otherwise(format!("PID {pid}: {err}")),
    }
}
