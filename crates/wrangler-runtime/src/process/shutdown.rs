//! Signal delivery by PID.

use std::io;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

#[cfg(unix)]
fn nix_pid(pid: u32) -> io::Result<Pid> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))
}

/// Ask a process to stop (SIGTERM).
///
/// Returns `Ok(())` if the signal was delivered or the process is already gone.
/// On platforms without a graceful stop signal this returns `Unsupported` and
/// callers fall back to a forced kill.
#[cfg(unix)]
pub fn request_stop(pid: u32) -> io::Result<()> {
    match signal::kill(nix_pid(pid)?, Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
pub fn request_stop(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful stop is not available on this platform",
    ))
}
