//! Renderer process control
//!
//! The renderer is `tascar_cli` running a scene file, either natively or
//! inside WSL. Stopping prefers a signal sent by the renderer-side pid
//! (`kill <pid>`), which lets TASCAR shut its audio down cleanly; the local
//! process handle is only force-terminated if it is still around afterwards.

use crate::config::{LaunchMode, RendererConfig};
use crate::error::{Result, SeatError};
use crate::paths::{shell_quote, PathTranslator};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Output captured from a diagnostic renderer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for CapturedOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A spawned renderer process as seen from this host
pub trait RendererProcess {
    /// Whether the process has not yet exited
    fn is_alive(&mut self) -> Result<bool>;

    /// Forcibly terminate the process
    fn terminate(&mut self) -> Result<()>;

    /// Wait for the process to exit and collect whatever it printed.
    /// Only diagnostic spawns capture output; others return it empty.
    fn collect_output(self: Box<Self>) -> Result<CapturedOutput>;
}

/// Starts and signals the external renderer
pub trait RendererLauncher {
    /// Spawn the renderer on `scene` (a path in the renderer's filesystem).
    /// `diagnostic` spawns capture stdout and stderr.
    fn spawn(&self, scene: &str, diagnostic: bool) -> Result<Box<dyn RendererProcess>>;

    /// Renderer-side pid of the running renderer
    fn find_pid(&self) -> Result<u32>;

    /// Ask the renderer to exit by pid
    fn signal_stop(&self, pid: u32) -> Result<()>;

    /// How long to wait after spawning before checking liveness
    fn startup_grace(&self) -> Duration;

    /// Map a path on this host to the path the renderer sees
    fn translate_path(&self, path: &Path) -> Result<String>;
}

/// A local child process.
///
/// Piped output is drained on reader threads for as long as the process
/// lives, so a diagnostic spawn that stays up never blocks on a full pipe.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
}

impl ChildProcess {
    pub fn new(mut child: Child) -> Self {
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        Self {
            child,
            stdout,
            stderr,
        }
    }
}

/// Read a pipe to the end on its own thread
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut bytes) {
            tracing::warn!(error = %e, "Error reading renderer output");
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

impl RendererProcess for ChildProcess {
    fn is_alive(&mut self) -> Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    fn terminate(&mut self) -> Result<()> {
        self.child.kill()?;
        let _ = self.child.wait();
        Ok(())
    }

    fn collect_output(mut self: Box<Self>) -> Result<CapturedOutput> {
        self.child.wait()?;
        Ok(CapturedOutput {
            stdout: join_output(self.stdout.take()),
            stderr: join_output(self.stderr.take()),
        })
    }
}

/// Launches `tascar_cli` according to [`RendererConfig`]
#[derive(Debug, Clone)]
pub struct TascarLauncher {
    mode: LaunchMode,
    command: String,
    startup_grace: Duration,
}

impl TascarLauncher {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            mode: config.launch,
            command: config.command.clone(),
            startup_grace: config.startup_grace(),
        }
    }

    /// File name of the renderer executable, as `pidof` wants it
    fn binary_name(&self) -> &str {
        Path::new(&self.command)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.command)
    }

    /// Build a command that runs `script` where the renderer lives
    fn renderer_shell(&self, script: &str) -> Command {
        match self.mode {
            LaunchMode::Wsl => {
                let mut cmd = Command::new("wsl");
                cmd.args(["-u", "root", "bash", "-c", script]);
                cmd
            }
            LaunchMode::Native => {
                let mut cmd = Command::new("sh");
                cmd.args(["-c", script]);
                cmd
            }
        }
    }
}

#[cfg(windows)]
fn new_console(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    cmd.creation_flags(CREATE_NEW_CONSOLE);
}

#[cfg(not(windows))]
fn new_console(_cmd: &mut Command) {}

impl RendererLauncher for TascarLauncher {
    fn spawn(&self, scene: &str, diagnostic: bool) -> Result<Box<dyn RendererProcess>> {
        let mut cmd = match self.mode {
            LaunchMode::Wsl => self.renderer_shell(&format!(
                "{} {}",
                shell_quote(&self.command),
                shell_quote(scene)
            )),
            LaunchMode::Native => {
                let mut cmd = Command::new(&self.command);
                cmd.arg(scene);
                cmd
            }
        };

        if diagnostic {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        } else {
            new_console(&mut cmd);
        }

        tracing::info!(command = ?cmd, diagnostic, "Spawning renderer");
        let child = cmd.spawn()?;
        Ok(Box::new(ChildProcess::new(child)))
    }

    fn find_pid(&self) -> Result<u32> {
        let output = self
            .renderer_shell(&format!("pidof {}", shell_quote(self.binary_name())))
            .output()?;
        if !output.status.success() {
            return Err(SeatError::RendererStart {
                reason: format!("couldn't get pid of {}", self.binary_name()),
                stdout: String::new(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        parse_pidof(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            SeatError::RendererStart {
                reason: format!("unexpected pidof output for {}", self.binary_name()),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::new(),
            }
        })
    }

    fn signal_stop(&self, pid: u32) -> Result<()> {
        let status = self.renderer_shell(&format!("kill {}", pid)).status()?;
        if !status.success() {
            tracing::warn!(pid, %status, "kill reported failure");
        }
        Ok(())
    }

    fn startup_grace(&self) -> Duration {
        self.startup_grace
    }

    fn translate_path(&self, path: &Path) -> Result<String> {
        PathTranslator::from(self.mode).translate(path)
    }
}

/// First pid printed by `pidof`
fn parse_pidof(stdout: &str) -> Option<u32> {
    stdout.split_whitespace().next()?.parse().ok()
}
