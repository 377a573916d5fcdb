//! SEAT - Listening-effort experiment controller
//!
//! This library re-exports the renderer lifecycle, trial sequencing and OSC
//! plumbing from `seat-core` and adds the block runner used by the `seat`
//! binary.

pub mod args;
pub mod runner;

pub use seat_core::{config, error, net, paths, renderer, scene, session, trial};

pub use seat_core::{AppConfig, BlockConfig, SceneKind, Scene, Session, SeatError};
pub use seat_core::{RendererState, SetupOutcome, BUILD_DATE, VERSION};
