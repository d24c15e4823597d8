//! Drop-triggered auto-layout for the canvas editor.
//!
//! [`Orchestrator`] listens for drop events on a [`DropBus`], runs the
//! rasterize → upload → analyze → layout pipeline, and moves the dropped
//! shape through the [`CanvasEditor`] boundary. [`BusyFlag`] tells the view
//! when a pipeline is in flight.

pub mod busy;
pub mod config;
pub mod editor;
pub mod events;
pub mod orchestrator;

pub use busy::{BusyFlag, BusyGuard};
pub use config::{ConfigError, LayoutConfig, LayoutMode};
pub use editor::{CanvasEditor, EditorError, SharedCanvas};
pub use events::{DropBus, DropSubscription};
pub use orchestrator::{Activation, Notice, Orchestrator, PipelineError, Stage};
