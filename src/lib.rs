//! tour-rs: guided-tour positioning and visibility engine.
//!
//! The crate highlights dashboard elements in sequence, places an explanatory
//! tooltip next to each one and keeps that placement in sync while the host
//! page scrolls, resizes or mutates. The live document is reached only through
//! the capability traits in [`host`], so the whole engine runs headless.

pub mod core;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod host;
pub mod observe;
pub mod render;
pub mod steps;
pub mod telemetry;

pub use cursor::{CursorHandle, TourCommand, TourCursor};
pub use engine::{EngineState, TourEngine, TourEngineConfig};
pub use error::{TourError, TourResult};
pub use steps::{TourStep, TourSteps};
