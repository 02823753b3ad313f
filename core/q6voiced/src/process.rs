//! Child process helpers shared by the hook runner and the loopback helpers.
//!
//! Children are optionally bound to the daemon's lifetime with
//! `PR_SET_PDEATHSIG`, so a crashed daemon never leaves a loopback holding
//! the codec open.

use crate::error::{Result, VoicedError};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};

#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub die_on_parent_exit: bool,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            die_on_parent_exit: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn die_on_parent_exit(mut self) -> Self {
        self.die_on_parent_exit = true;
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

pub fn spawn(spec: &ProcessSpec) -> Result<Child> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if spec.die_on_parent_exit {
        bind_to_parent_lifetime(&mut command);
    }

    let child = command.spawn().map_err(|source| VoicedError::Spawn {
        program: spec.program_name(),
        source,
    })?;
    tracing::debug!(program = %spec.program.display(), pid = child.id(), "Spawned child");
    Ok(child)
}

/// Spawns and blocks until the child exits.
pub fn run_to_completion(spec: &ProcessSpec) -> Result<ExitStatus> {
    let mut child = spawn(spec)?;
    child.wait().map_err(|source| VoicedError::Wait {
        program: spec.program_name(),
        source,
    })
}

/// Sends SIGTERM and reaps the child.
///
/// A child that already exited is not an error; it is still reaped.
pub fn terminate_and_wait(child: &mut Child) -> io::Result<ExitStatus> {
    if child.try_wait()?.is_none() {
        send_sigterm(child.id())?;
    }
    child.wait()
}

fn send_sigterm(pid: u32) -> io::Result<()> {
    // SAFETY: kill(2) with a pid we spawned and have not yet reaped.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err)
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn bind_to_parent_lifetime(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: prctl is async-signal-safe and touches no allocator state.
    unsafe {
        command.pre_exec(|| {
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM as libc::c_ulong) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(target_os = "linux"))]
fn bind_to_parent_lifetime(_command: &mut Command) {
    tracing::warn!("Parent-death signal is unsupported on this platform");
}
