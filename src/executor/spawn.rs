use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};

use crate::error::ShellError;

/// Where one standard stream of a pipeline stage comes from or goes to.
pub enum Stream {
    Inherit,
    Pipe(OwnedFd),
    File(File),
}

impl Stream {
    pub fn is_pipe(&self) -> bool {
        matches!(self, Stream::Pipe(_))
    }

    fn into_stdio(self) -> Stdio {
        match self {
            Stream::Inherit => Stdio::inherit(),
            Stream::Pipe(fd) => Stdio::from(fd),
            Stream::File(file) => Stdio::from(file),
        }
    }

    fn raw_fd(&self) -> Option<i32> {
        match self {
            Stream::Inherit => None,
            Stream::Pipe(fd) => Some(fd.as_raw_fd()),
            Stream::File(file) => Some(file.as_raw_fd()),
        }
    }
}

pub struct StageIo {
    pub stdin: Stream,
    pub stdout: Stream,
    pub stderr: Stream,
}

impl StageIo {
    pub fn inherit() -> Self {
        StageIo {
            stdin: Stream::Inherit,
            stdout: Stream::Inherit,
            stderr: Stream::Inherit,
        }
    }

    // In a forked child: move the streams onto fds 0/1/2 before running.
    fn redirect_in_child(&self) {
        if let Some(fd) = self.stdin.raw_fd() {
            unsafe { libc::dup2(fd, libc::STDIN_FILENO) };
        }
        if let Some(fd) = self.stdout.raw_fd() {
            unsafe { libc::dup2(fd, libc::STDOUT_FILENO) };
        }
        if let Some(fd) = self.stderr.raw_fd() {
            unsafe { libc::dup2(fd, libc::STDERR_FILENO) };
        }
    }
}

/// Process-creation capability. The engine's pipeline construction only
/// talks to this interface, so tests can inject a recording fake and
/// observe the spawn topology without real OS processes.
pub trait Launcher {
    type Handle;

    /// Launches an external program with its stdio wired up.
    fn spawn(
        &mut self,
        program: &Path,
        args: &[String],
        io: StageIo,
    ) -> Result<Self::Handle, ShellError>;

    /// Runs a builtin as a pipeline stage, in a context where its stdout
    /// participates in the pipe chain exactly like an external program.
    fn spawn_builtin(
        &mut self,
        argv: &[String],
        io: StageIo,
        run: Box<dyn FnOnce() -> i32 + '_>,
    ) -> Result<Self::Handle, ShellError>;

    fn wait(&mut self, handle: Self::Handle) -> Result<i32, ShellError>;
}

pub enum OsHandle {
    Spawned(Child),
    Forked(Pid),
}

/// The real thing: `std::process` for externals, `fork` for builtins that
/// must feed a pipe.
pub struct OsLauncher;

fn nix_io_error(e: nix::Error) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}

impl Launcher for OsLauncher {
    type Handle = OsHandle;

    fn spawn(
        &mut self,
        program: &Path,
        args: &[String],
        io: StageIo,
    ) -> Result<Self::Handle, ShellError> {
        let mut command = Command::new(program);
        command.args(args);
        command.stdin(io.stdin.into_stdio());
        command.stdout(io.stdout.into_stdio());
        command.stderr(io.stderr.into_stdio());
        let child = command.spawn().map_err(ShellError::ChildProcess)?;
        Ok(OsHandle::Spawned(child))
    }

    fn spawn_builtin(
        &mut self,
        _argv: &[String],
        io: StageIo,
        run: Box<dyn FnOnce() -> i32 + '_>,
    ) -> Result<Self::Handle, ShellError> {
        match unsafe { fork() }.map_err(|e| ShellError::ChildProcess(nix_io_error(e)))? {
            ForkResult::Child => {
                io.redirect_in_child();
                let status = run();
                std::process::exit(status);
            }
            ForkResult::Parent { child } => Ok(OsHandle::Forked(child)),
        }
    }

    fn wait(&mut self, handle: Self::Handle) -> Result<i32, ShellError> {
        match handle {
            OsHandle::Spawned(mut child) => {
                let status = child.wait().map_err(ShellError::ChildProcess)?;
                Ok(status.code().unwrap_or(1))
            }
            OsHandle::Forked(pid) => {
                match waitpid(pid, None).map_err(|e| ShellError::ChildProcess(nix_io_error(e)))? {
                    WaitStatus::Exited(_, code) => Ok(code),
                    _ => Ok(1),
                }
            }
        }
    }
}

/// One pipe between adjacent pipeline stages.
pub fn os_pipe() -> Result<(OwnedFd, OwnedFd), ShellError> {
    nix::unistd::pipe().map_err(|e| ShellError::ChildProcess(nix_io_error(e)))
}
