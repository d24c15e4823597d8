//! Drop-triggered auto-layout orchestrator.
//!
//! A drop of one or more shapes onto a target runs one pipeline:
//!
//! ```text
//! Idle → Capturing → Uploading → Analyzing → ComputingLayout → Applying → Idle
//!            └───────────┴───────────┴──────────────┴──→ (abort) → Idle
//! ```
//!
//! At most one pipeline runs at a time: the busy flag is acquired before a
//! pipeline starts and released by its guard when it ends, and drops that
//! arrive while it is held are ignored. Shapes are only touched in
//! `Applying`, after every upstream step succeeded.

use crate::busy::{BusyFlag, BusyGuard};
use crate::config::LayoutConfig;
use crate::editor::{CanvasEditor, EditorError};
use crate::events::DropBus;
use dl_agent::{AgentError, ImageTransport, LayoutAgent, TransportError, upload_name};
use dl_core::id::ShapeId;
use dl_core::model::{CanvasSize, DropEvent, LayoutObject, ShapeUpdate};
use dl_render::raster::{RasterizationError, Rasterizer};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(20);
const NOTICE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Capturing,
    Uploading,
    Analyzing,
    ComputingLayout,
    Applying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Idle => "idle",
            Stage::Capturing => "capturing",
            Stage::Uploading => "uploading",
            Stage::Analyzing => "analyzing",
            Stage::ComputingLayout => "computing layout",
            Stage::Applying => "applying",
        })
    }
}

/// How a pipeline ended, for user-facing feedback (toast/banner).
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Applied { shape: ShapeId, x: f64, y: f64 },
    Aborted { stage: Stage, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Rasterize(#[from] RasterizationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("layout refers to shape {0}, which was not dropped")]
    ForeignShape(ShapeId),
}

#[derive(Clone)]
pub struct Orchestrator {
    editor: Arc<dyn CanvasEditor>,
    transport: Arc<dyn ImageTransport>,
    agent: Arc<dyn LayoutAgent>,
    rasterizer: Rasterizer,
    busy: BusyFlag,
    notices: broadcast::Sender<Notice>,
    step_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        editor: Arc<dyn CanvasEditor>,
        transport: Arc<dyn ImageTransport>,
        agent: Arc<dyn LayoutAgent>,
        busy: BusyFlag,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            editor,
            transport,
            agent,
            rasterizer: Rasterizer::default(),
            busy,
            notices,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn from_config(
        config: &LayoutConfig,
        editor: Arc<dyn CanvasEditor>,
        busy: BusyFlag,
    ) -> Self {
        Self::new(editor, config.transport(), config.agent(), busy)
            .with_step_timeout(config.step_timeout())
            .with_rasterizer(Rasterizer::new(config.jpeg_quality))
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Rasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    /// Outcome feed: one `Notice` per finished pipeline.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Start a pipeline for `event` on the current runtime.
    ///
    /// Returns `None`, with no state change, when the event is not
    /// actionable or another pipeline is running.
    pub fn handle_drop(
        &self,
        event: DropEvent,
    ) -> Option<JoinHandle<Result<ShapeUpdate, PipelineError>>> {
        self.begin(event).map(tokio::spawn)
    }

    /// Subscribe to `bus` until the returned `Activation` is dropped or
    /// deactivated.
    pub fn activate(&self, bus: &DropBus) -> Activation {
        let mut subscription = bus.subscribe();
        let running: Arc<Mutex<JoinSet<()>>> = Arc::default();
        let this = self.clone();
        let tasks = Arc::clone(&running);

        let listener = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let Some(pipeline) = this.begin(event) {
                    track(&tasks, pipeline);
                }
            }
            log::debug!("drop bus closed; listener exiting");
        });

        log::debug!("auto-layout listener activated");
        Activation {
            listener: Some(listener),
            running,
        }
    }

    /// Guard + busy check. On success the busy flag is held by the returned
    /// pipeline future.
    fn begin(
        &self,
        event: DropEvent,
    ) -> Option<impl Future<Output = Result<ShapeUpdate, PipelineError>> + Send + use<>> {
        if event.shapes.is_empty() {
            log::warn!("ignoring drop onto {}: no shapes dropped", event.target.id);
            return None;
        }
        if !event.target.bounds.has_area() {
            log::warn!(
                "ignoring drop onto {}: target is {}x{}",
                event.target.id,
                event.target.bounds.width,
                event.target.bounds.height
            );
            return None;
        }
        let Some(guard) = self.busy.try_acquire() else {
            log::warn!(
                "auto-layout already running; ignoring drop of {} shape(s) onto {}",
                event.shapes.len(),
                event.target.id
            );
            return None;
        };

        let this = self.clone();
        Some(async move { this.run(event, guard).await })
    }

    async fn run(
        self,
        event: DropEvent,
        guard: BusyGuard,
    ) -> Result<ShapeUpdate, PipelineError> {
        let mut stage = Stage::Capturing;
        let result = self.pipeline(&event, &mut stage).await;

        // Idle before anyone hears about the outcome.
        drop(guard);

        let notice = match &result {
            Ok(update) => {
                log::info!(
                    "auto-layout moved {} to ({}, {})",
                    update.id,
                    update.x,
                    update.y
                );
                Notice::Applied {
                    shape: update.id,
                    x: update.x,
                    y: update.y,
                }
            }
            Err(e) => {
                log::error!("auto-layout aborted while {stage}: {e}");
                Notice::Aborted {
                    stage,
                    message: e.to_string(),
                }
            }
        };
        let _ = self.notices.send(notice);
        result
    }

    async fn pipeline(
        &self,
        event: &DropEvent,
        stage: &mut Stage,
    ) -> Result<ShapeUpdate, PipelineError> {
        let hero = &event.shapes[0];

        *stage = Stage::Capturing;
        log::debug!(
            "{stage}: {} shape(s) dropped onto {}",
            event.shapes.len(),
            event.target.id
        );
        let capture = self.rasterizer.capture(&*self.editor, &event.shapes)?;
        let quality = self.rasterizer.quality;
        let image = match timeout(
            self.step_timeout,
            tokio::task::spawn_blocking(move || capture.encode(quality)),
        )
        .await
        {
            Err(_) => return Err(RasterizationError::Timeout.into()),
            Ok(Err(join)) => return Err(RasterizationError::Task(join.to_string()).into()),
            Ok(Ok(encoded)) => encoded?,
        };

        *stage = Stage::Uploading;
        let name = upload_name(image.format);
        log::debug!("{stage}: {name} ({}x{})", image.width, image.height);
        let reference = timeout(self.step_timeout, self.transport.upload(&image, &name))
            .await
            .map_err(|_| TransportError::Timeout)??;
        drop(image);

        *stage = Stage::Analyzing;
        log::debug!("{stage}: {}", abbreviate(&reference.uri));
        let analysis = timeout(self.step_timeout, self.agent.analyze_image(&reference))
            .await
            .map_err(|_| AgentError::Timeout)??;

        *stage = Stage::ComputingLayout;
        let canvas = CanvasSize {
            width: event.target.bounds.width,
            height: event.target.bounds.height,
        };
        let objects = vec![LayoutObject {
            id: hero.id,
            desc: analysis.description(),
        }];
        log::debug!("{stage}: {}x{} canvas", canvas.width, canvas.height);
        let layout = timeout(self.step_timeout, self.agent.compute_layout(canvas, objects))
            .await
            .map_err(|_| AgentError::Timeout)??;
        if let Some(foreign) = layout.objects.iter().find(|o| !event.contains(o.id)) {
            return Err(PipelineError::ForeignShape(foreign.id));
        }

        *stage = Stage::Applying;
        let (x, y) = layout.origin();
        let update = ShapeUpdate::move_to(hero, x, y);
        log::debug!("{stage}: {} → ({x}, {y})", hero.id);
        self.editor.update_shape(update)?;
        Ok(update)
    }
}

/// Run `pipeline` in `tasks`, reaping pipelines that already finished.
fn track<F>(tasks: &Mutex<JoinSet<()>>, pipeline: F)
where
    F: Future + Send + 'static,
{
    let Ok(mut set) = tasks.lock() else {
        log::error!("pipeline registry poisoned; drop not handled");
        return;
    };
    while set.try_join_next().is_some() {}
    set.spawn(async move {
        let _ = pipeline.await;
    });
}

/// Data URIs make unreadable log lines.
fn abbreviate(uri: &str) -> String {
    const MAX: usize = 64;
    match uri.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &uri[..cut]),
        None => uri.to_string(),
    }
}

/// Live subscription of an orchestrator to a drop bus.
///
/// Dropping it stops listening and aborts any pipeline it started; the
/// aborted pipeline's busy guard clears the flag.
pub struct Activation {
    listener: Option<JoinHandle<()>>,
    running: Arc<Mutex<JoinSet<()>>>,
}

impl Activation {
    pub fn is_active(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| !l.is_finished())
    }

    /// Stop listening and wait until every pipeline this activation
    /// started has been torn down.
    pub async fn deactivate(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            let _ = listener.await;
        }
        let mut running = match self.running.lock() {
            Ok(mut set) => std::mem::take(&mut *set),
            Err(_) => return,
        };
        running.shutdown().await;
        log::debug!("auto-layout listener deactivated");
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Ok(mut set) = self.running.lock() {
            set.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::ComputingLayout.to_string(), "computing layout");
        assert_eq!(Stage::Capturing.to_string(), "capturing");
    }

    #[test]
    fn long_uris_are_abbreviated() {
        let uri = format!("data:image/jpeg;base64,{}", "A".repeat(200));
        let short = abbreviate(&uri);
        assert_eq!(short.chars().count(), 65);
        assert!(short.ends_with('…'));
        assert_eq!(abbreviate("u1"), "u1");
    }
}
