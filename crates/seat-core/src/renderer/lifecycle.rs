//! Renderer lifecycle state machine
//!
//! Guards renderer setup, start and stop against use in the wrong order and
//! owns the spawned renderer process from `start` to `stop`.
//!
//! ```text
//! Init --configure(ok)--> Configured
//! Configured --setup(ok)--> ReadyToStart
//! Configured --setup(fail)--> Init
//! ReadyToStart --start(ok)--> Active
//! Active --stop()--> Terminated
//! ```
//!
//! Every operation asks [`RendererState::transition`] whether its event is
//! legal before doing any work, so an illegal call has no side effects.

use crate::config::AppConfig;
use crate::error::{Result, SeatError};
use crate::net::endpoints::{EndpointOpener, NetworkEndpoints};
use crate::net::osc::OscType;
use crate::paths::check_path_is_file;
use crate::renderer::process::{RendererLauncher, RendererProcess};
use std::path::{Path, PathBuf};
use std::thread;

/// Scene file expected in every block directory
pub const SCENE_FILE_NAME: &str = "tascar_scene.tsc";

/// Background video expected in every block directory
pub const SKYBOX_FILE_NAME: &str = "skybox.mp4";

/// Video player id used for the one-shot skybox
pub const SKYBOX_PLAYER_ID: i32 = 0;

/// Renderer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// Nothing configured yet, or setup failed and configuration must be redone
    Init,
    /// Resource paths validated
    Configured,
    /// Endpoints open, renderer not yet running
    ReadyToStart,
    /// Renderer running, trials may be presented
    Active,
    /// Renderer stopped; terminal
    Terminated,
}

/// Something that happened to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Configured,
    SetupSucceeded,
    SetupFailed,
    Started,
    Stopped,
}

impl LifecycleEvent {
    /// Name of the operation that raises this event
    pub fn operation(self) -> &'static str {
        match self {
            LifecycleEvent::Configured => "configure",
            LifecycleEvent::SetupSucceeded | LifecycleEvent::SetupFailed => "setup",
            LifecycleEvent::Started => "start",
            LifecycleEvent::Stopped => "stop",
        }
    }
}

impl RendererState {
    /// The single place where lifecycle legality is decided
    pub fn transition(self, event: LifecycleEvent) -> Result<RendererState> {
        use LifecycleEvent as E;
        use RendererState as S;

        match (self, event) {
            (S::Init, E::Configured) => Ok(S::Configured),
            (S::Configured, E::SetupSucceeded) => Ok(S::ReadyToStart),
            (S::Configured, E::SetupFailed) => Ok(S::Init),
            (S::ReadyToStart, E::Started) => Ok(S::Active),
            (S::Active, E::Stopped) => Ok(S::Terminated),
            (state, event) => Err(SeatError::InvalidState {
                operation: event.operation(),
                state,
            }),
        }
    }
}

/// Result of [`RendererLifecycle::setup`]
#[derive(Debug)]
pub enum SetupOutcome {
    /// Endpoints are open; state is `ReadyToStart`
    Ready,
    /// Setup failed in a way that points at the configuration; state has
    /// regressed to `Init` and the caller may configure again
    Recoverable(SeatError),
}

impl SetupOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, SetupOutcome::Ready)
    }
}

/// Validated resources of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneResources {
    pub scene_file: PathBuf,
    /// `scene_file` as the renderer sees it
    pub renderer_scene_path: String,
    pub skybox: PathBuf,
}

/// The running renderer: local process handle plus renderer-side pid
pub struct SceneHandle {
    process: Box<dyn RendererProcess>,
    pid: u32,
}

impl SceneHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

/// Renderer lifecycle: state, endpoints and the running scene
pub struct RendererLifecycle {
    state: RendererState,
    config: AppConfig,
    launcher: Box<dyn RendererLauncher>,
    opener: Box<dyn EndpointOpener>,
    resources: Option<SceneResources>,
    endpoints: Option<NetworkEndpoints>,
    scene: Option<SceneHandle>,
}

impl RendererLifecycle {
    pub fn new(
        config: AppConfig,
        launcher: Box<dyn RendererLauncher>,
        opener: Box<dyn EndpointOpener>,
    ) -> Self {
        Self {
            state: RendererState::Init,
            config,
            launcher,
            opener,
            resources: None,
            endpoints: None,
            scene: None,
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Current configuration, including any addresses resolved during setup
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn resources(&self) -> Option<&SceneResources> {
        self.resources.as_ref()
    }

    pub fn endpoints(&self) -> Option<&NetworkEndpoints> {
        self.endpoints.as_ref()
    }

    /// Renderer-side pid while the scene is running
    pub fn renderer_pid(&self) -> Option<u32> {
        self.scene.as_ref().map(SceneHandle::pid)
    }

    /// Validate the block's scene and skybox files and translate the scene
    /// path for the renderer.
    pub fn configure(&mut self, root_dir: &Path) -> Result<RendererState> {
        let next = self.state.transition(LifecycleEvent::Configured)?;

        let scene_file = root_dir.join(SCENE_FILE_NAME);
        check_path_is_file(&scene_file)?;
        let skybox = root_dir.join(SKYBOX_FILE_NAME);
        check_path_is_file(&skybox)?;

        let renderer_scene_path = self.launcher.translate_path(&scene_file)?;

        tracing::info!(
            scene = %scene_file.display(),
            renderer_scene = %renderer_scene_path,
            "Renderer configured"
        );
        self.resources = Some(SceneResources {
            scene_file,
            renderer_scene_path,
            skybox,
        });
        self.state = next;
        Ok(self.state)
    }

    /// Open the network endpoints.
    ///
    /// Endpoint failures do not propagate: they are logged, the state
    /// regresses to `Init` and the error comes back inside
    /// [`SetupOutcome::Recoverable`].
    pub fn setup(&mut self) -> Result<SetupOutcome> {
        let ready = self.state.transition(LifecycleEvent::SetupSucceeded)?;

        match self.open_endpoints() {
            Ok(endpoints) => {
                self.endpoints = Some(endpoints);
                self.state = ready;
                tracing::info!("Renderer ready to start");
                Ok(SetupOutcome::Ready)
            }
            Err(err) => {
                tracing::error!(error = %err, "Setup failed; perhaps the configuration had errors, reload it");
                self.endpoints = None;
                self.state = self.state.transition(LifecycleEvent::SetupFailed)?;
                Ok(SetupOutcome::Recoverable(err))
            }
        }
    }

    fn open_endpoints(&mut self) -> Result<NetworkEndpoints> {
        let endpoints = self.opener.open(&mut self.config)?;

        // Tell the display where to forward head-tracking data
        endpoints.display.send(
            "/set_client_address",
            vec![
                OscType::String(self.config.renderer.ipaddress.clone()),
                OscType::Int(i32::from(self.config.renderer.oscport)),
            ],
        )?;
        Ok(endpoints)
    }

    /// Spawn the renderer, confirm it is alive, then roll transport and
    /// start the skybox video.
    ///
    /// A renderer that cannot be confirmed alive after one diagnostic retry
    /// is a fatal [`SeatError::RendererStart`].
    pub fn start(&mut self) -> Result<RendererState> {
        let active = self.state.transition(LifecycleEvent::Started)?;
        let (scene_path, skybox) = match (&self.resources, &self.endpoints) {
            (Some(res), Some(_)) => (res.renderer_scene_path.clone(), res.skybox.clone()),
            _ => {
                return Err(SeatError::InvalidState {
                    operation: "start",
                    state: self.state,
                })
            }
        };

        let handle = self.launch_renderer(&scene_path)?;
        tracing::info!(pid = handle.pid, "Renderer running");
        self.scene = Some(handle);
        // The renderer is running from here on, so stop() must see Active
        // even if a cue below fails to send.
        self.state = active;

        if let Some(endpoints) = &self.endpoints {
            endpoints.display.send(
                "/video/play",
                vec![
                    OscType::Int(SKYBOX_PLAYER_ID),
                    OscType::String(skybox.to_string_lossy().into_owned()),
                ],
            )?;
            endpoints
                .renderer
                .send("/transport/locate", vec![OscType::Float(0.0)])?;
            endpoints.renderer.send("/transport/start", vec![])?;
        }

        Ok(self.state)
    }

    fn launch_renderer(&self, scene_path: &str) -> Result<SceneHandle> {
        let grace = self.launcher.startup_grace();

        let mut process = self.launcher.spawn(scene_path, false).map_err(start_error)?;
        thread::sleep(grace);

        if !process.is_alive()? {
            tracing::warn!("Renderer exited during startup; retrying with output capture");
            let mut retry = self.launcher.spawn(scene_path, true).map_err(start_error)?;
            thread::sleep(grace);

            if !retry.is_alive()? {
                let output = retry.collect_output()?;
                tracing::error!(stdout = %output.stdout, stderr = %output.stderr, "Renderer failed to start");
                return Err(SeatError::RendererStart {
                    reason: "renderer exited during startup".to_string(),
                    stdout: output.stdout,
                    stderr: output.stderr,
                });
            }
            process = retry;
        }

        match self.launcher.find_pid() {
            Ok(pid) => Ok(SceneHandle { process, pid }),
            Err(err) => {
                tracing::error!(error = %err, "Probably the renderer failed to start");
                if let Err(e) = process.terminate() {
                    tracing::warn!(error = %e, "Failed to terminate orphaned renderer");
                }
                Err(start_error(err))
            }
        }
    }

    /// Stop the renderer. A no-op unless `Active`.
    ///
    /// Signals the renderer by pid first, then force-terminates the local
    /// handle if it has not exited. The state becomes `Terminated` once the
    /// attempt has been made, whatever its outcome.
    pub fn stop(&mut self) -> Result<RendererState> {
        let terminated = match self.state.transition(LifecycleEvent::Stopped) {
            Ok(next) => next,
            Err(_) => {
                tracing::debug!(state = ?self.state, "Stop ignored; renderer not active");
                return Ok(self.state);
            }
        };

        if let Some(mut scene) = self.scene.take() {
            if let Err(e) = self.launcher.signal_stop(scene.pid) {
                tracing::warn!(pid = scene.pid, error = %e, "Failed to signal renderer");
            }
            match scene.process.is_alive() {
                Ok(true) => {
                    tracing::info!(pid = scene.pid, "Renderer still running; terminating");
                    if let Err(e) = scene.process.terminate() {
                        tracing::warn!(error = %e, "Failed to terminate renderer");
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "Could not poll renderer"),
            }
        }

        self.state = terminated;
        tracing::info!("Renderer stopped");
        Ok(self.state)
    }

    /// Drop the endpoint sockets. Idempotent.
    pub fn close_endpoints(&mut self) {
        if self.endpoints.take().is_some() {
            tracing::info!("Closed OSC endpoints");
        }
    }
}

fn start_error(err: SeatError) -> SeatError {
    match err {
        SeatError::RendererStart { .. } => err,
        other => SeatError::RendererStart {
            reason: other.to_string(),
            stdout: String::new(),
            stderr: String::new(),
        },
    }
}
