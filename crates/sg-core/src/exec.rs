//! External command execution.
//!
//! Every diagnostic command runs as an argv vector through
//! [`std::process::Command`], never through a shell, so discovered
//! identifiers (volume names, SP addresses) cannot splice extra commands
//! no matter what characters they contain.
//!
//! Non-zero exit is data, not an error: plugins inspect the captured
//! status where it matters. Spawn failure and timeout are errors, but
//! battery runners treat them as soft failures and continue.

use std::cell::RefCell;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Cap on captured output per stream. Anything beyond is discarded and
/// the output is marked truncated.
pub const MAX_CAPTURE_BYTES: usize = 8 * 1024 * 1024;

/// Poll interval while waiting for a child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A command as an argv vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Cmd {
    /// Space-joined rendering used for logs and output file names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of one command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration_ms: u128,
    /// Output exceeded [`MAX_CAPTURE_BYTES`] and was cut off.
    pub truncated: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Trait for executing external commands (real or scripted for tests).
pub trait CommandRunner {
    fn run(&self, cmd: &Cmd, timeout: Duration) -> Result<CommandOutput, ExecError>;
}

/// The real command runner.
#[derive(Debug, Default)]
pub struct ExecRunner;

impl CommandRunner for ExecRunner {
    fn run(&self, cmd: &Cmd, timeout: Duration) -> Result<CommandOutput, ExecError> {
        let start = Instant::now();
        let mut child = Command::new(cmd.program())
            .args(cmd.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn {
                program: cmd.program().to_string(),
                source: e,
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        #[cfg(unix)]
        {
            if let Some(p) = stdout_pipe.as_ref() {
                set_nonblocking(p)?;
            }
            if let Some(p) = stderr_pipe.as_ref() {
                set_nonblocking(p)?;
            }
        }

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut truncated = false;

        let status = loop {
            truncated |= drain(&mut stdout_pipe, &mut stdout, cmd.program())?;
            truncated |= drain(&mut stderr_pipe, &mut stderr, cmd.program())?;

            match child.try_wait().map_err(|e| ExecError::Io {
                program: cmd.program().to_string(),
                source: e,
            })? {
                Some(status) => break status,
                None => {
                    if start.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ExecError::Timeout {
                            program: cmd.program().to_string(),
                            timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        // The writer side is closed now; pull whatever is left in the pipes.
        truncated |= drain(&mut stdout_pipe, &mut stdout, cmd.program())?;
        truncated |= drain(&mut stderr_pipe, &mut stderr, cmd.program())?;

        Ok(CommandOutput {
            status: status.code(),
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis(),
            truncated,
        })
    }
}

#[cfg(unix)]
fn set_nonblocking<F: std::os::unix::io::AsRawFd>(pipe: &F) -> Result<(), ExecError> {
    let fd = pipe.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if flags < 0 || rc < 0 {
        return Err(ExecError::Io {
            program: String::new(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Read whatever is currently available from a pipe. Returns whether the
/// capture cap was hit.
fn drain<R: Read>(
    pipe: &mut Option<R>,
    buf: &mut Vec<u8>,
    program: &str,
) -> Result<bool, ExecError> {
    let mut truncated = false;
    if let Some(reader) = pipe.as_mut() {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    *pipe = None;
                    break;
                }
                Ok(n) => {
                    if buf.len() + n <= MAX_CAPTURE_BYTES {
                        buf.extend_from_slice(&chunk[..n]);
                    } else {
                        let room = MAX_CAPTURE_BYTES.saturating_sub(buf.len());
                        buf.extend_from_slice(&chunk[..room]);
                        truncated = true;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ExecError::Io {
                        program: program.to_string(),
                        source: e,
                    })
                }
            }
        }
    }
    Ok(truncated)
}

/// Resolve `name` on the search path. Cheap existence check only; never
/// executes anything.
pub fn is_executable(name: &str) -> bool {
    if name.contains('/') {
        return is_executable_file(Path::new(name));
    }
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable_file(&dir.join(name)))
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Scripted command runner for tests and scaffolding.
///
/// Responses are matched against the rendered command by prefix, first
/// match wins. Unmatched commands succeed with empty output. Every
/// invocation is recorded.
#[derive(Debug, Default)]
pub struct StaticRunner {
    responses: Vec<(String, i32, Vec<u8>)>,
    spawn_failures: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl StaticRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to commands starting with `prefix` with the given exit
    /// code and stdout.
    pub fn with_output(mut self, prefix: &str, status: i32, stdout: &str) -> Self {
        self.responses
            .push((prefix.to_string(), status, stdout.as_bytes().to_vec()));
        self
    }

    /// Fail to spawn commands starting with `prefix`.
    pub fn with_spawn_failure(mut self, prefix: &str) -> Self {
        self.spawn_failures.push(prefix.to_string());
        self
    }

    /// Rendered commands in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for StaticRunner {
    fn run(&self, cmd: &Cmd, _timeout: Duration) -> Result<CommandOutput, ExecError> {
        let rendered = cmd.to_string();
        self.calls.borrow_mut().push(rendered.clone());

        if let Some(prefix) = self.spawn_failures.iter().find(|p| rendered.starts_with(*p)) {
            return Err(ExecError::Spawn {
                program: prefix.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
            });
        }

        let (status, stdout) = self
            .responses
            .iter()
            .find(|(p, _, _)| rendered.starts_with(p))
            .map(|(_, status, stdout)| (*status, stdout.clone()))
            .unwrap_or((0, Vec::new()));

        Ok(CommandOutput {
            status: Some(status),
            stdout,
            stderr: Vec::new(),
            duration_ms: 0,
            truncated: false,
        })
    }
}
