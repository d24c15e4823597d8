//! Editor boundary: what the orchestrator may ask of the canvas.
//!
//! Two capabilities only: export shapes as vector graphics, and move a
//! shape. Everything else about the canvas stays out of reach.

use dl_core::id::ShapeId;
use dl_core::model::{DropEvent, Shape, ShapeUpdate};
use dl_core::scene::{Canvas, CanvasError};
use dl_render::hit::drop_target;
use dl_render::svg::{SvgOptions, VectorExport};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error("canvas lock poisoned")]
    Poisoned,

    #[error("no shape under the dropped set")]
    NoDropTarget,

    #[error("drop needs at least one shape")]
    NothingDropped,
}

pub trait CanvasEditor: VectorExport + Send + Sync {
    /// Reposition one existing shape. Must not touch any other property.
    fn update_shape(&self, update: ShapeUpdate) -> Result<(), EditorError>;
}

/// A [`Canvas`] shared between the view and the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SharedCanvas {
    inner: Arc<RwLock<Canvas>>,
}

impl SharedCanvas {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            inner: Arc::new(RwLock::new(canvas)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Canvas>, EditorError> {
        self.inner.read().map_err(|_| EditorError::Poisoned)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Canvas>, EditorError> {
        self.inner.write().map_err(|_| EditorError::Poisoned)
    }

    pub fn snapshot(&self) -> Result<Canvas, EditorError> {
        Ok(self.read()?.clone())
    }

    pub fn shape(&self, id: ShapeId) -> Option<Shape> {
        self.read().ok()?.get(id).cloned()
    }

    /// Build the event the canvas emits when `dropped` is released. The
    /// target is `target` if given, otherwise the topmost other shape under
    /// the dropped set.
    pub fn drop_event(
        &self,
        dropped: &[ShapeId],
        target: Option<ShapeId>,
    ) -> Result<DropEvent, EditorError> {
        if dropped.is_empty() {
            return Err(EditorError::NothingDropped);
        }
        let canvas = self.read()?;
        let target_id = match target {
            Some(id) => id,
            None => drop_target(&canvas, dropped).ok_or(EditorError::NoDropTarget)?,
        };
        let target = canvas
            .get(target_id)
            .cloned()
            .ok_or(CanvasError::UnknownShape(target_id))?;
        let shapes = canvas.collect(dropped)?;
        Ok(DropEvent::new(target, shapes))
    }
}

impl VectorExport for SharedCanvas {
    fn export_svg(&self, shapes: &[Shape], options: &SvgOptions) -> Option<String> {
        match self.read() {
            Ok(canvas) => canvas.export_svg(shapes, options),
            Err(e) => {
                log::error!("vector export failed: {e}");
                None
            }
        }
    }
}

impl CanvasEditor for SharedCanvas {
    fn update_shape(&self, update: ShapeUpdate) -> Result<(), EditorError> {
        self.write()?.apply_update(update)?;
        Ok(())
    }
}
