//! Offline stand-in for the layout agent.
//!
//! Waits a fixed delay and answers with fixed margins (top/left 30). Useful
//! for demos and UI work without an agent deployment; the margins carry no
//! meaning.

use crate::agent::LayoutAgent;
use crate::error::AgentError;
use async_trait::async_trait;
use dl_core::model::{
    AnalysisResult, CanvasSize, ImageReference, LayoutObject, LayoutResult, Margins,
};
use std::time::Duration;

pub const CANNED_DELAY: Duration = Duration::from_secs(3);

pub const CANNED_MARGINS: Margins = Margins {
    top: 30.0,
    right: 0.0,
    bottom: 0.0,
    left: 30.0,
};

#[derive(Debug, Clone)]
pub struct CannedAgent {
    pub delay: Duration,
    pub margins: Margins,
}

impl CannedAgent {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            margins: CANNED_MARGINS,
        }
    }
}

impl Default for CannedAgent {
    fn default() -> Self {
        Self::new(CANNED_DELAY)
    }
}

#[async_trait]
impl LayoutAgent for CannedAgent {
    async fn analyze_image(
        &self,
        _reference: &ImageReference,
    ) -> Result<AnalysisResult, AgentError> {
        Ok(AnalysisResult::default())
    }

    async fn compute_layout(
        &self,
        _canvas: CanvasSize,
        _objects: Vec<LayoutObject>,
    ) -> Result<LayoutResult, AgentError> {
        tokio::time::sleep(self.delay).await;
        Ok(LayoutResult {
            margins: self.margins,
            objects: Vec::new(),
        })
    }
}
