//! Renderer module
//!
//! - Lifecycle state machine and scene handle ownership ([`lifecycle`])
//! - Spawning, liveness checks and stopping of `tascar_cli` ([`process`])

pub mod lifecycle;
pub mod process;

pub use lifecycle::{RendererLifecycle, RendererState, SceneHandle, SceneResources};
pub use process::{RendererLauncher, RendererProcess, TascarLauncher};
