// Suspend / resume of a running encoder process

use std::io;

/// Pause and continue an OS process by pid.
///
/// Implementations report failures as `io::Error`; the runner logs them to
/// the task and leaves the task status untouched.
pub trait ProcessControl: Send + Sync {
    fn suspend(&self, pid: u32) -> io::Result<()>;
    fn resume(&self, pid: u32) -> io::Result<()>;
}

/// SIGSTOP / SIGCONT
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalControl;

#[cfg(unix)]
impl SignalControl {
    fn send(pid: u32, signal: libc::c_int) -> io::Result<()> {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(unix)]
impl ProcessControl for SignalControl {
    fn suspend(&self, pid: u32) -> io::Result<()> {
        Self::send(pid, libc::SIGSTOP)
    }

    fn resume(&self, pid: u32) -> io::Result<()> {
        Self::send(pid, libc::SIGCONT)
    }
}

/// Platforms without a suspend primitive wired up
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedControl;

impl ProcessControl for UnsupportedControl {
    fn suspend(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process suspend is not supported on this platform",
        ))
    }

    fn resume(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process resume is not supported on this platform",
        ))
    }
}

/// The best available implementation for the host
pub fn platform_control() -> Box<dyn ProcessControl> {
    #[cfg(unix)]
    {
        Box::new(SignalControl)
    }
    #[cfg(not(unix))]
    {
        Box::new(UnsupportedControl)
    }
}
