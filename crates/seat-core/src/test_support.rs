//! Recording fakes for the network and process seams

use crate::config::AppConfig;
use crate::error::{Result, SeatError};
use crate::net::endpoints::{EndpointOpener, NetworkEndpoints};
use crate::net::osc::{OscSink, OscType};
use crate::renderer::process::{CapturedOutput, RendererLauncher, RendererProcess};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub endpoint: &'static str,
    pub address: String,
    pub args: Vec<OscType>,
    pub at: Instant,
}

/// Shared, ordered log of every message sent through recording sinks
#[derive(Debug, Clone, Default)]
pub struct MessageLog(Rc<RefCell<Vec<Sent>>>);

impl MessageLog {
    pub fn messages(&self) -> Vec<Sent> {
        self.0.borrow().clone()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.0.borrow().iter().map(|s| s.address.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct RecordingSink {
    name: &'static str,
    log: MessageLog,
}

impl OscSink for RecordingSink {
    fn send(&self, address: &str, args: Vec<OscType>) -> Result<()> {
        self.log.0.borrow_mut().push(Sent {
            endpoint: self.name,
            address: address.to_string(),
            args,
            at: Instant::now(),
        });
        Ok(())
    }
}

pub fn recording_endpoints(log: &MessageLog) -> NetworkEndpoints {
    let sink = |name| -> Box<dyn OscSink> {
        Box::new(RecordingSink {
            name,
            log: log.clone(),
        })
    };
    NetworkEndpoints::new(
        sink("display"),
        sink("renderer"),
        [sink("source1"), sink("source2"), sink("source3")],
    )
}

/// Opens recording endpoints, or fails when `fail` is set
#[derive(Clone, Default)]
pub struct RecordingOpener {
    pub log: MessageLog,
    pub fail: Rc<Cell<bool>>,
}

impl EndpointOpener for RecordingOpener {
    fn open(&self, _config: &mut AppConfig) -> Result<NetworkEndpoints> {
        if self.fail.get() {
            return Err(SeatError::Configuration("simulated endpoint failure".to_string()));
        }
        Ok(recording_endpoints(&self.log))
    }
}

/// What a [`FakeLauncher`] was asked to do
#[derive(Debug, Default)]
pub struct LauncherCalls {
    pub spawns: Vec<(String, bool)>,
    pub signals: Vec<u32>,
    pub terminations: usize,
}

/// Launcher whose processes live or die as scripted
#[derive(Clone)]
pub struct FakeLauncher {
    pub calls: Rc<RefCell<LauncherCalls>>,
    /// Liveness of each successive spawn; missing entries are alive
    pub spawn_alive: Rc<RefCell<VecDeque<bool>>>,
    pub pid: Option<u32>,
    /// Whether a stop signal makes the process exit
    pub exits_on_signal: bool,
    last: Rc<RefCell<Option<Rc<Cell<bool>>>>>,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self {
            calls: Rc::default(),
            spawn_alive: Rc::default(),
            pid: Some(4242),
            exits_on_signal: true,
            last: Rc::default(),
        }
    }
}

impl FakeLauncher {
    pub fn with_spawns(alive: &[bool]) -> Self {
        let launcher = Self::default();
        launcher.spawn_alive.borrow_mut().extend(alive.iter().copied());
        launcher
    }

    /// Renderer whose pid can never be found
    pub fn without_pid() -> Self {
        Self {
            pid: None,
            ..Self::default()
        }
    }

    /// Renderer that keeps running after a stop signal
    pub fn ignoring_signals() -> Self {
        Self {
            exits_on_signal: false,
            ..Self::default()
        }
    }
}

struct FakeProcess {
    alive: Rc<Cell<bool>>,
    calls: Rc<RefCell<LauncherCalls>>,
}

impl RendererProcess for FakeProcess {
    fn is_alive(&mut self) -> Result<bool> {
        Ok(self.alive.get())
    }

    fn terminate(&mut self) -> Result<()> {
        self.calls.borrow_mut().terminations += 1;
        self.alive.set(false);
        Ok(())
    }

    fn collect_output(self: Box<Self>) -> Result<CapturedOutput> {
        Ok(CapturedOutput {
            stdout: String::new(),
            stderr: "could not open scene".to_string(),
        })
    }
}

impl RendererLauncher for FakeLauncher {
    fn spawn(&self, scene: &str, diagnostic: bool) -> Result<Box<dyn RendererProcess>> {
        self.calls
            .borrow_mut()
            .spawns
            .push((scene.to_string(), diagnostic));
        let alive = self.spawn_alive.borrow_mut().pop_front().unwrap_or(true);
        let flag = Rc::new(Cell::new(alive));
        *self.last.borrow_mut() = Some(flag.clone());
        Ok(Box::new(FakeProcess {
            alive: flag,
            calls: self.calls.clone(),
        }))
    }

    fn find_pid(&self) -> Result<u32> {
        self.pid.ok_or_else(|| SeatError::RendererStart {
            reason: "couldn't get pid".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn signal_stop(&self, pid: u32) -> Result<()> {
        self.calls.borrow_mut().signals.push(pid);
        if self.exits_on_signal {
            if let Some(flag) = self.last.borrow().as_ref() {
                flag.set(false);
            }
        }
        Ok(())
    }

    fn startup_grace(&self) -> Duration {
        Duration::ZERO
    }

    /// Marks translated paths so tests can tell them from host paths
    fn translate_path(&self, path: &Path) -> Result<String> {
        Ok(format!("/renderer{}", path.display()))
    }
}

/// Block directory with the files every scene needs
pub fn scene_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tascar_scene.tsc"), "<session/>").unwrap();
    std::fs::write(dir.path().join("skybox.mp4"), b"").unwrap();
    dir
}

/// App config that resolves without touching the environment
pub fn local_app_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.renderer.ipaddress = "127.0.0.1".to_string();
    config.sampler.ipaddress = "127.0.0.1".to_string();
    config.renderer.launch = crate::config::LaunchMode::Native;
    config
}
