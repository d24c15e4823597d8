//! Agent client: image analysis and layout computation.
//!
//! Both operations go to the same endpoint and are distinguished by the
//! `name` field of the request body. A layout request only makes sense with
//! descriptions taken from an analysis of the same drop's image.

use crate::error::AgentError;
use async_trait::async_trait;
use dl_core::model::{AnalysisResult, CanvasSize, ImageReference, LayoutObject, LayoutResult};
use dl_core::wire::{ANALYZE_IMAGE, AUTOLAYOUT, AgentRequest, AgentResponse, LayoutPayload};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[async_trait]
pub trait LayoutAgent: Send + Sync {
    async fn analyze_image(
        &self,
        reference: &ImageReference,
    ) -> Result<AnalysisResult, AgentError>;

    async fn compute_layout(
        &self,
        canvas: CanvasSize,
        objects: Vec<LayoutObject>,
    ) -> Result<LayoutResult, AgentError>;
}

#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: Client,
    agent_url: String,
}

impl HttpAgentClient {
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), agent_url)
    }

    pub fn with_client(client: Client, agent_url: impl Into<String>) -> Self {
        Self {
            client,
            agent_url: agent_url.into(),
        }
    }

    async fn call<A, R>(
        &self,
        operation: &'static str,
        request: &AgentRequest<A>,
    ) -> Result<R, AgentError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        log::debug!("agent call {operation} → {}", self.agent_url);
        let resp = self.client.post(&self.agent_url).json(request).send().await?;
        let http_status = resp.status();
        if !http_status.is_success() {
            return Err(AgentError::Status(http_status.as_u16()));
        }

        let parsed: AgentResponse<R> = resp.json().await?;
        if !parsed.status.is_success() {
            return Err(AgentError::Rejected {
                operation,
                status: parsed.status,
            });
        }
        Ok(parsed.result)
    }
}

#[async_trait]
impl LayoutAgent for HttpAgentClient {
    async fn analyze_image(
        &self,
        reference: &ImageReference,
    ) -> Result<AnalysisResult, AgentError> {
        if reference.uri.trim().is_empty() {
            return Err(AgentError::MissingReference);
        }
        let request = AgentRequest::analyze_image(reference.uri.clone());
        let items: Vec<serde_json::Value> = self.call(ANALYZE_IMAGE, &request).await?;
        Ok(AnalysisResult::from(items))
    }

    async fn compute_layout(
        &self,
        canvas: CanvasSize,
        objects: Vec<LayoutObject>,
    ) -> Result<LayoutResult, AgentError> {
        if objects.is_empty() {
            return Err(AgentError::NoObjects);
        }
        let request = AgentRequest::autolayout(canvas, objects);
        let payload: LayoutPayload = self.call(AUTOLAYOUT, &request).await?;
        Ok(LayoutResult::try_from(payload)?)
    }
}
