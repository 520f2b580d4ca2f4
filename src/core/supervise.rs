//! Supervision of the primary client process.
//!
//! The client inherits the write end of a pipe. When it exits, the write end
//! closes and the read end reports a hangup, which the loop polls without
//! ever blocking on the child.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus};

use anyhow::{bail, Context, Result};

use crate::util::logging;
use crate::wlog;

pub struct ClientProcess {
    child: Child,
    hangup: OwnedFd,
}

impl ClientProcess {
    /// Start `argv[0]` with the remaining arguments.
    pub fn spawn(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("no client command given");
        };

        let (read_end, write_end) = hangup_pipe().context("Failed to create client pipe")?;
        let child = Command::new(program)
            .args(args)
            .spawn()
            .with_context(|| format!("Failed to spawn client {program}"))?;
        // Only the child may hold the write end, or the hangup never comes.
        drop(write_end);

        wlog!(logging::CLIENT, "Spawned client {} (pid {})", program, child.id());
        Ok(Self { child, hangup: read_end })
    }

    /// Wait up to `timeout_ms` for the client's end of the pipe to close.
    pub fn poll_hangup(&self, timeout_ms: i32) -> io::Result<bool> {
        let mut pfd = libc::pollfd { fd: self.hangup.as_raw_fd(), events: 0, revents: 0 };
        // SAFETY: `pfd` points to one valid pollfd for the duration of the call.
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ret > 0 && pfd.revents & (libc::POLLHUP | libc::POLLERR) != 0)
    }

    /// Reap the client, terminating it first if it is still running.
    pub fn finish(mut self) -> Result<i32> {
        if self.child.try_wait()?.is_none() {
            wlog!(logging::CLIENT, "Stopping client (pid {})", self.child.id());
            // SAFETY: plain kill(2) on the pid of a child we have not reaped yet.
            let ret = unsafe { libc::kill(self.child.id() as libc::pid_t, libc::SIGTERM) };
            if ret != 0 {
                tracing::warn!(target: logging::CLIENT, "Failed to signal client: {}", io::Error::last_os_error());
            }
        }
        let status = self.child.wait().context("Failed to wait for client")?;
        let code = exit_code(status);
        wlog!(logging::CLIENT, "Client exited with status {}", code);
        Ok(code)
    }
}

/// Process exit status for a finished client: its exit code, or 128 plus
/// the number of the signal that killed it.
pub fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

/// A pipe whose read end is close-on-exec and whose write end is inherited.
fn hangup_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: both descriptors were just created and are owned by nobody else.
    let (read_end, write_end) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    // SAFETY: fcntl on a descriptor we own.
    if unsafe { libc::fcntl(read_end.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((read_end, write_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        // Killed by SIGKILL.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }

    #[test]
    fn test_hangup_after_client_exit() {
        let client = ClientProcess::spawn(&["true".to_string()]).expect("spawn true");
        let mut hung_up = false;
        for _ in 0..50 {
            if client.poll_hangup(100).expect("poll") {
                hung_up = true;
                break;
            }
        }
        assert!(hung_up);
        assert_eq!(client.finish().expect("reap"), 0);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(ClientProcess::spawn(&[]).is_err());
    }
}
