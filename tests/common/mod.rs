//! Shared fixtures for the end-to-end tests: loopback OSC listeners standing
//! in for the display, renderer and sample players, plus a scripted launcher.

#![allow(dead_code)]

use rosc::{OscMessage, OscPacket};
use seat::error::{Result, SeatError};
use seat::renderer::process::{CapturedOutput, RendererLauncher, RendererProcess};
use seat::config::LaunchMode;
use seat::AppConfig;
use std::cell::{Cell, RefCell};
use std::net::UdpSocket;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// A bound UDP socket that decodes whatever OSC arrives
pub struct OscListener {
    socket: UdpSocket,
}

impl OscListener {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Self { socket }
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    pub fn recv(&self) -> OscMessage {
        let mut buf = [0u8; rosc::decoder::MTU];
        let (n, _) = self.socket.recv_from(&mut buf).unwrap();
        match rosc::decoder::decode_udp(&buf[..n]).unwrap().1 {
            OscPacket::Message(msg) => msg,
            OscPacket::Bundle(b) => panic!("unexpected bundle {:?}", b),
        }
    }

    /// Nothing arrives within `wait`
    pub fn assert_silent(&self, wait: Duration) {
        self.socket.set_read_timeout(Some(wait)).unwrap();
        let mut buf = [0u8; rosc::decoder::MTU];
        let got = self.socket.recv_from(&mut buf);
        self.socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        assert!(got.is_err(), "expected no message, got {} bytes", got.unwrap().0);
    }
}

/// One listener per endpoint of a session
pub struct Rig {
    pub display: OscListener,
    pub renderer: OscListener,
    pub samplers: [OscListener; 3],
}

impl Rig {
    pub fn new() -> Self {
        Self {
            display: OscListener::bind(),
            renderer: OscListener::bind(),
            samplers: [OscListener::bind(), OscListener::bind(), OscListener::bind()],
        }
    }

    /// App config pointing every endpoint at this rig
    pub fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.renderer.launch = LaunchMode::Native;
        config.display.ipaddress = "127.0.0.1".to_string();
        config.display.oscport = self.display.port();
        config.renderer.ipaddress = "127.0.0.1".to_string();
        config.renderer.oscport = self.renderer.port();
        config.sampler.ipaddress = "127.0.0.1".to_string();
        config.sampler.source_ports = [
            self.samplers[0].port(),
            self.samplers[1].port(),
            self.samplers[2].port(),
        ];
        config
    }
}

/// Launcher whose renderer stays up until signalled, or never comes up
#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    pub never_starts: bool,
    pub spawns: Rc<Cell<usize>>,
    pub stop_signals: Rc<RefCell<Vec<u32>>>,
    alive: Rc<Cell<bool>>,
}

impl ScriptedLauncher {
    pub fn dead_on_arrival() -> Self {
        Self {
            never_starts: true,
            ..Self::default()
        }
    }
}

struct ScriptedProcess {
    alive: Rc<Cell<bool>>,
}

impl RendererProcess for ScriptedProcess {
    fn is_alive(&mut self) -> Result<bool> {
        Ok(self.alive.get())
    }

    fn terminate(&mut self) -> Result<()> {
        self.alive.set(false);
        Ok(())
    }

    fn collect_output(self: Box<Self>) -> Result<CapturedOutput> {
        Ok(CapturedOutput {
            stdout: "TASCAR 0.230".to_string(),
            stderr: "jack server is not running".to_string(),
        })
    }
}

impl RendererLauncher for ScriptedLauncher {
    fn spawn(&self, _scene: &str, _diagnostic: bool) -> Result<Box<dyn RendererProcess>> {
        self.spawns.set(self.spawns.get() + 1);
        self.alive.set(!self.never_starts);
        Ok(Box::new(ScriptedProcess {
            alive: self.alive.clone(),
        }))
    }

    fn find_pid(&self) -> Result<u32> {
        if self.alive.get() {
            Ok(31337)
        } else {
            Err(SeatError::RendererStart {
                reason: "no renderer pid".to_string(),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn signal_stop(&self, pid: u32) -> Result<()> {
        self.stop_signals.borrow_mut().push(pid);
        self.alive.set(false);
        Ok(())
    }

    fn startup_grace(&self) -> Duration {
        Duration::from_millis(1)
    }

    fn translate_path(&self, path: &Path) -> Result<String> {
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Write the scene and skybox files every block directory needs
pub fn populate_block_dir(dir: &Path) {
    std::fs::write(dir.join("tascar_scene.tsc"), "<session/>").unwrap();
    std::fs::write(dir.join("skybox.mp4"), b"").unwrap();
}
