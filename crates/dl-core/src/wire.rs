//! JSON request/response bodies for the upload and agent endpoints.

use crate::model::{AnalysisResult, CanvasSize, LayoutObject, LayoutResult, Margins};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ANALYZE_IMAGE: &str = "analyze_image";
pub const AUTOLAYOUT: &str = "autolayout";

/// Remove every leading `data:<mime>;base64,` prefix, leaving the bare
/// base64 payload. Stripping an already-stripped payload is a no-op.
pub fn strip_data_uri(payload: &str) -> &str {
    let mut rest = payload;
    while let Some(after) = rest.strip_prefix("data:") {
        match after.find(";base64,") {
            Some(i) if !after[..i].contains(',') => rest = &after[i + ";base64,".len()..],
            _ => break,
        }
    }
    rest
}

// ─── Status ──────────────────────────────────────────────────────────────

/// Response status as the endpoints report it: an HTTP code or a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Code(u16),
    Text(String),
}

impl Status {
    pub fn is_success(&self) -> bool {
        match self {
            Status::Code(code) => (200..300).contains(code),
            Status::Text(text) => {
                let text = text.trim();
                match text.parse::<u16>() {
                    Ok(code) => (200..300).contains(&code),
                    Err(_) => ["ok", "success", "succeeded"]
                        .iter()
                        .any(|word| text.eq_ignore_ascii_case(word)),
                }
            }
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Code(200)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{code}"),
            Status::Text(text) => f.write_str(text),
        }
    }
}

// ─── Upload ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Bare base64 payload, no data-URI scheme.
    pub base64: String,
    pub name: String,
}

impl UploadRequest {
    pub fn new(payload: &str, name: impl Into<String>) -> Self {
        Self {
            base64: strip_data_uri(payload).to_string(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: Status,
    pub uri: String,
}

// ─── Agent ───────────────────────────────────────────────────────────────

/// `{ "name": <operation>, "args": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest<A> {
    pub name: String,
    pub args: A,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeArgs {
    pub image_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoLayoutArgs {
    pub width: f64,
    pub height: f64,
    pub objects: Vec<LayoutObject>,
}

impl AgentRequest<AnalyzeArgs> {
    pub fn analyze_image(image_path: impl Into<String>) -> Self {
        Self {
            name: ANALYZE_IMAGE.to_string(),
            args: AnalyzeArgs {
                image_path: image_path.into(),
            },
        }
    }
}

impl AgentRequest<AutoLayoutArgs> {
    pub fn autolayout(canvas: CanvasSize, objects: Vec<LayoutObject>) -> Self {
        Self {
            name: AUTOLAYOUT.to_string(),
            args: AutoLayoutArgs {
                width: canvas.width,
                height: canvas.height,
                objects,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse<R> {
    #[serde(default)]
    pub status: Status,
    pub result: R,
}

pub type AnalyzeResponse = AgentResponse<Vec<Value>>;
pub type AutoLayoutResponse = AgentResponse<LayoutPayload>;

/// `result` body of an `autolayout` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPayload {
    pub canvas_top_margin: f64,
    #[serde(default)]
    pub canvas_right_margin: f64,
    #[serde(default)]
    pub canvas_bottom_margin: f64,
    pub canvas_left_margin: f64,
    #[serde(default)]
    pub objects: Vec<Value>,
}

impl From<Vec<Value>> for AnalysisResult {
    fn from(items: Vec<Value>) -> Self {
        Self { items }
    }
}

/// A layout object in an agent reply that is not `{ id, desc }`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("layout object #{index} is malformed: {reason}")]
pub struct MalformedObject {
    pub index: usize,
    pub reason: String,
}

impl TryFrom<LayoutPayload> for LayoutResult {
    type Error = MalformedObject;

    fn try_from(payload: LayoutPayload) -> Result<Self, Self::Error> {
        let objects = payload
            .objects
            .into_iter()
            .enumerate()
            .map(|(index, obj)| {
                serde_json::from_value::<LayoutObject>(obj).map_err(|e| MalformedObject {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            margins: Margins {
                top: payload.canvas_top_margin,
                right: payload.canvas_right_margin,
                bottom: payload.canvas_bottom_margin,
                left: payload.canvas_left_margin,
            },
            objects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ShapeId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn strips_jpeg_prefix() {
        assert_eq!(strip_data_uri("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
    }

    #[test]
    fn strips_repeated_prefixes() {
        let doubled = "data:image/jpeg;base64,data:image/png;base64,AAAA";
        assert_eq!(strip_data_uri(doubled), "AAAA");
        assert_eq!(strip_data_uri(strip_data_uri(doubled)), "AAAA");
    }

    #[test]
    fn leaves_non_base64_data_uris_alone() {
        assert_eq!(
            strip_data_uri("data:text/plain,hello;base64,x"),
            "data:text/plain,hello;base64,x"
        );
    }

    #[test]
    fn upload_request_body() {
        let req = UploadRequest::new("data:image/jpeg;base64,AAAA", "x.jpg");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "base64": "AAAA", "name": "x.jpg" })
        );
    }

    #[test]
    fn status_success_rules() {
        assert!(Status::Code(200).is_success());
        assert!(Status::Code(201).is_success());
        assert!(!Status::Code(500).is_success());
        assert!(Status::Text("OK".into()).is_success());
        assert!(Status::Text("200".into()).is_success());
        assert!(!Status::Text("error".into()).is_success());
    }

    #[test]
    fn autolayout_request_body() {
        let req = AgentRequest::autolayout(
            CanvasSize {
                width: 800.0,
                height: 600.0,
            },
            vec![LayoutObject {
                id: ShapeId::intern("shape:hero"),
                desc: "a chair".into(),
            }],
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "name": "autolayout",
                "args": {
                    "width": 800.0,
                    "height": 600.0,
                    "objects": [{ "id": "shape:hero", "desc": "a chair" }]
                }
            })
        );
    }

    #[test]
    fn analyze_request_body() {
        let req = AgentRequest::analyze_image("u1");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "name": "analyze_image", "args": { "image_path": "u1" } })
        );
    }

    #[test]
    fn layout_response_into_result() {
        let resp: AutoLayoutResponse = serde_json::from_value(json!({
            "status": 200,
            "result": {
                "canvas_top_margin": 30,
                "canvas_right_margin": 0,
                "canvas_bottom_margin": 0,
                "canvas_left_margin": 45,
                "objects": [{ "id": "shape:hero", "desc": "chair" }]
            }
        }))
        .unwrap();
        assert!(resp.status.is_success());

        let layout = LayoutResult::try_from(resp.result).unwrap();
        assert_eq!(layout.origin(), (45.0, 30.0));
        assert_eq!(layout.objects.len(), 1);
        assert_eq!(layout.objects[0].id, ShapeId::intern("shape:hero"));
    }

    #[test]
    fn object_without_desc_is_malformed() {
        let payload: LayoutPayload = serde_json::from_value(json!({
            "canvas_top_margin": 30,
            "canvas_left_margin": 30,
            "objects": [
                { "id": "shape:hero", "desc": "chair" },
                { "id": "shape:other" }
            ]
        }))
        .unwrap();

        let err = LayoutResult::try_from(payload).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(err.reason.contains("desc"), "{}", err.reason);
    }

    #[test]
    fn non_object_entry_is_malformed() {
        let payload: LayoutPayload = serde_json::from_value(json!({
            "canvas_top_margin": 0,
            "canvas_left_margin": 0,
            "objects": [7]
        }))
        .unwrap();
        assert_eq!(LayoutResult::try_from(payload).unwrap_err().index, 0);
    }
}
