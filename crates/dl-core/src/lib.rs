pub mod id;
pub mod model;
pub mod scene;
pub mod wire;

pub use id::ShapeId;
pub use model::*;
pub use scene::{Canvas, CanvasError};
pub use wire::{Status, strip_data_uri};
