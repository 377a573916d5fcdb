//! Scoped experiment session
//!
//! A [`Session`] ties a scene to the renderer lifecycle. Leaving the session,
//! by [`Session::close`] or by dropping it on any path including unwinding,
//! stops the renderer and then closes the endpoints, exactly once.

use crate::config::{AppConfig, BlockConfig};
use crate::error::{Result, SeatError};
use crate::net::endpoints::{EndpointOpener, UdpEndpointOpener};
use crate::renderer::lifecycle::{LifecycleEvent, RendererLifecycle, RendererState, SetupOutcome};
use crate::renderer::process::{RendererLauncher, TascarLauncher};
use crate::scene::Scene;
use crate::trial::probe::GainSetting;

pub struct Session {
    lifecycle: RendererLifecycle,
    scene: Option<Scene>,
    closed: bool,
}

impl Session {
    pub fn new(
        config: AppConfig,
        launcher: Box<dyn RendererLauncher>,
        opener: Box<dyn EndpointOpener>,
    ) -> Self {
        Self {
            lifecycle: RendererLifecycle::new(config, launcher, opener),
            scene: None,
            closed: false,
        }
    }

    /// Session using `tascar_cli` and UDP endpoints as configured
    pub fn from_config(config: AppConfig) -> Self {
        let launcher = TascarLauncher::new(&config.renderer);
        Self::new(config, Box::new(launcher), Box::new(UdpEndpointOpener))
    }

    pub fn state(&self) -> RendererState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &RendererLifecycle {
        &self.lifecycle
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Validate the block and configure the renderer for it
    pub fn configure(&mut self, block: &BlockConfig) -> Result<RendererState> {
        self.state().transition(LifecycleEvent::Configured)?;
        let scene = Scene::from_block(block)?;
        let state = self.lifecycle.configure(&block.root_dir)?;
        tracing::info!(scene = ?scene.kind(), "Session configured");
        self.scene = Some(scene);
        Ok(state)
    }

    pub fn setup(&mut self) -> Result<SetupOutcome> {
        self.lifecycle.setup()
    }

    pub fn start(&mut self) -> Result<RendererState> {
        self.lifecycle.start()
    }

    /// Set the SNR in dB for subsequent trials
    pub fn set_probe_level(&mut self, snr_db: f64) -> Result<GainSetting> {
        let scene = self.scene.as_mut().ok_or(SeatError::InvalidState {
            operation: "set probe level",
            state: self.lifecycle.state(),
        })?;
        Ok(scene.set_probe_level(snr_db))
    }

    /// Present one trial. Only legal while the renderer is active.
    pub fn present_trial(&self, stimulus_id: usize) -> Result<()> {
        let invalid = || SeatError::InvalidState {
            operation: "present trial",
            state: self.lifecycle.state(),
        };
        if self.lifecycle.state() != RendererState::Active {
            return Err(invalid());
        }
        let scene = self.scene.as_ref().ok_or_else(invalid)?;
        let endpoints = self.lifecycle.endpoints().ok_or_else(invalid)?;
        scene.present_trial(endpoints, stimulus_id)
    }

    pub fn stop(&mut self) -> Result<RendererState> {
        self.lifecycle.stop()
    }

    /// End the session: stop the renderer, then close the endpoints
    pub fn close(mut self) -> RendererState {
        self.finish();
        self.lifecycle.state()
    }

    fn finish(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.lifecycle.stop() {
            tracing::warn!(error = %e, "Error stopping renderer at session end");
        }
        self.lifecycle.close_endpoints();
        tracing::info!(state = ?self.lifecycle.state(), "Session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish();
    }
}
