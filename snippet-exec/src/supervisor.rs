//! Runs one toolchain command as a child process under a deadline.

use async_trait::async_trait;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::Signal;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::{
    error::Error,
    process_tree::{pipe_identity, ProcessTree},
    types::ResourceLimits,
};

/// Appended to a stream that hit the capture ceiling
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Search path handed to children, after the toolchain's own directory
const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// How long stream readers may lag behind process exit
const DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

/// Program plus arguments; file arguments are relative to the working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
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
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What one supervised process produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when killed by a signal, including the deadline kill
    pub exit_code: Option<i32>,
    /// Deadline elapsed, or the CPU time limit ran out
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// Seam between orchestration and real processes
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` in `cwd`, killing it if `timeout` elapses first.
    /// `Err` means the process never started (or could not be waited on).
    async fn run(
        &self,
        command: &CommandLine,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<ProcessOutput, Error>;
}

/// Spawns real child processes with resource limits and bounded capture
#[derive(Debug, Clone)]
pub struct Supervisor {
    limits: ResourceLimits,
    max_output_bytes: usize,
}

impl Supervisor {
    pub fn new(limits: ResourceLimits, max_output_bytes: usize) -> Self {
        Self {
            limits,
            max_output_bytes,
        }
    }

    fn build_command(&self, program: &Path, args: &[String], cwd: &Path) -> Command {
        let search_path = match program.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && dir != cwd => {
                format!("{}:{}", dir.display(), DEFAULT_PATH)
            }
            _ => DEFAULT_PATH.to_string(),
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .env("PATH", search_path)
            .env("HOME", cwd)
            .env("TMPDIR", cwd)
            .env("LANG", "C.UTF-8")
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            // Own process group, so the whole tree can be killed at once
            .process_group(0);

        let file_size = self.limits.file_size_bytes;
        let cpu_time = self.limits.cpu_time_secs;

        unsafe {
            command.pre_exec(move || {
                setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size)
                    .map_err(std::io::Error::from)?;
                // SIGXCPU at the soft limit, SIGKILL one second later
                setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time.saturating_add(1))
                    .map_err(std::io::Error::from)?;
                // No core dumps of user programs in the workspace
                setrlimit(Resource::RLIMIT_CORE, 0, 0).map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        command
    }
}

#[async_trait]
impl ProcessRunner for Supervisor {
    async fn run(
        &self,
        command: &CommandLine,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<ProcessOutput, Error> {
        let program = resolve_program(&command.program, cwd)?;
        let mut child = self
            .build_command(&program, &command.args, cwd)
            .spawn()
            .map_err(|e| Error::Launch {
                program: command.program.clone(),
                reason: e.to_string(),
            })?;

        let started = Instant::now();
        let pipes = [
            pipe_identity(child.stdout.as_ref()),
            pipe_identity(child.stderr.as_ref()),
        ]
        .into_iter()
        .flatten()
        .collect();
        let mut tree = TreeGuard::new(ProcessTree::new(child.id(), pipes));
        debug!(command = %command, pid = ?child.id(), "Spawned process");

        let stdout = Reader::spawn(child.stdout.take(), self.max_output_bytes);
        let stderr = Reader::spawn(child.stderr.take(), self.max_output_bytes);

        let status = match time::timeout(timeout, child.wait()).await {
            Ok(status) => {
                Some(status.map_err(|e| Error::Process(format!("Failed to wait: {}", e)))?)
            }
            Err(_) => None,
        };
        let mut timed_out = status.is_none();

        // On timeout this enforces the deadline; otherwise it removes
        // descendants that outlived the main process.
        if timed_out {
            warn!(command = %command, timeout_ms = timeout.as_millis() as u64, "Process timed out");
            tree.kill();
            let _ = child.wait().await;
        } else {
            tree.root_reaped();
            tree.kill();
        }
        tree.disarm();

        let stdout = stdout.collect(DRAIN_GRACE).await;
        let mut stderr = stderr.collect(DRAIN_GRACE).await;
        let elapsed = started.elapsed();

        let exit_code = status.and_then(|s| s.code());
        match status.and_then(termination_signal) {
            Some(signal) if signal == Signal::SIGXCPU as i32 => {
                warn!(command = %command, "CPU time limit exhausted");
                timed_out = true;
            }
            Some(signal) => {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!("Process terminated by signal {}", signal));
            }
            None => {}
        }

        debug!(
            command = %command,
            exit_code = ?exit_code,
            timed_out,
            elapsed_ms = elapsed.as_millis() as u64,
            "Process finished"
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code,
            timed_out,
            elapsed,
        })
    }
}

/// Absolute path of the program; `./name` means a workspace artifact
fn resolve_program(program: &str, cwd: &Path) -> Result<PathBuf, Error> {
    if let Some(relative) = program.strip_prefix("./") {
        let path = cwd.join(relative);
        if path.is_file() {
            return Ok(path);
        }
        return Err(Error::Launch {
            program: program.to_string(),
            reason: "artifact not found".to_string(),
        });
    }

    which::which(program).map_err(|e| Error::Launch {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(unix)]
fn termination_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: ExitStatus) -> Option<i32> {
    None
}

/// Kills the run's process tree when dropped while armed, which covers
/// cancellation of the enclosing future.
struct TreeGuard {
    tree: ProcessTree,
    armed: bool,
}

impl TreeGuard {
    fn new(tree: ProcessTree) -> Self {
        Self { tree, armed: true }
    }

    fn kill(&self) {
        self.tree.kill();
    }

    fn root_reaped(&mut self) {
        self.tree.root_reaped();
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TreeGuard {
    fn drop(&mut self) {
        if self.armed {
            self.tree.kill();
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Background capture of one output stream
struct Reader {
    handle: JoinHandle<Captured>,
    stop: oneshot::Sender<()>,
}

impl Reader {
    fn spawn<R>(stream: Option<R>, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (stop, stopped) = oneshot::channel();
        Self {
            handle: tokio::spawn(capture(stream, limit, stopped)),
            stop,
        }
    }

    /// Text read so far. A stream still open after `grace` is cut off
    /// and marked truncated.
    async fn collect(self, grace: Duration) -> String {
        let Reader { mut handle, stop } = self;
        let joined = match time::timeout(grace, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("Output stream still open after process exit");
                let _ = stop.send(());
                handle.await
            }
        };

        match joined {
            Ok(captured) => captured.into_text(),
            Err(e) => {
                warn!("Output reader failed: {}", e);
                String::new()
            }
        }
    }
}

/// Read a stream to EOF or until `stop` fires, keeping at most `limit`
/// bytes. Reading continues past the limit so the writer never blocks on a
/// full pipe.
async fn capture<R>(stream: Option<R>, limit: usize, mut stop: oneshot::Receiver<()>) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(mut stream) = stream else {
        return captured;
    };

    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = tokio::select! {
            read = stream.read(&mut chunk) => read,
            _ = &mut stop => {
                captured.truncated = true;
                break;
            }
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Stream read ended: {}", e);
                break;
            }
        };
        let room = limit.saturating_sub(captured.bytes.len());
        if n > room {
            captured.truncated = true;
        }
        captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
    captured
}
