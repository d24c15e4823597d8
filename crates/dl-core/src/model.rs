//! Shape and pipeline data model.
//!
//! Shapes are owned by the canvas; everything else here is transient and
//! lives for a single drop-triggered layout pipeline: the `DropEvent` that
//! starts it, the `RasterImage` captured from the dropped shapes, the
//! `ImageReference` returned by the upload, the agent's `AnalysisResult`,
//! and the `LayoutResult` that is turned into one `ShapeUpdate`.

use crate::id::ShapeId;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Geometry ────────────────────────────────────────────────────────────

/// Axis-aligned bounds of a shape in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Edges count as inside (unlike kurbo's half-open `Rect::contains`).
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Both extents strictly positive (and finite).
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    /// Smallest bounds covering every input. `None` for an empty iterator.
    pub fn union<'a>(all: impl IntoIterator<Item = &'a Bounds>) -> Option<Bounds> {
        all.into_iter()
            .map(Bounds::to_rect)
            .reduce(|acc, r| acc.union(r))
            .map(Bounds::from_rect)
    }
}

// ─── Shapes ──────────────────────────────────────────────────────────────

/// Type tag sent to the editor with every shape update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Image,
    Geo,
    Frame,
}

impl ShapeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Image => "image",
            ShapeType::Geo => "geo",
            ShapeType::Frame => "frame",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoKind {
    Rectangle,
    Ellipse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    /// Raster image; `src` is a data URI or an external URL.
    Image {
        #[serde(default)]
        src: Option<String>,
    },
    /// Geometric primitive with optional label.
    Geo {
        geo: GeoKind,
        #[serde(default)]
        text: Option<String>,
    },
    /// Container that shapes are dropped onto.
    Frame,
}

impl ShapeKind {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            ShapeKind::Image { .. } => ShapeType::Image,
            ShapeKind::Geo { .. } => ShapeType::Geo,
            ShapeKind::Frame => ShapeType::Frame,
        }
    }

    /// `"image"`, `"geo"` or `"frame"`.
    pub fn type_tag(&self) -> &'static str {
        self.shape_type().as_str()
    }
}

/// A positioned, sized object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    #[serde(flatten)]
    pub kind: ShapeKind,
    pub bounds: Bounds,
    /// Fill color as a CSS color string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

impl Shape {
    pub fn new(id: ShapeId, kind: ShapeKind, bounds: Bounds) -> Self {
        Self {
            id,
            kind,
            bounds,
            fill: None,
        }
    }

    pub fn image(id: &str, bounds: Bounds) -> Self {
        Self::new(ShapeId::intern(id), ShapeKind::Image { src: None }, bounds)
    }

    pub fn frame(id: &str, bounds: Bounds) -> Self {
        Self::new(ShapeId::intern(id), ShapeKind::Frame, bounds)
    }

    pub fn rect(id: &str, bounds: Bounds) -> Self {
        Self::new(
            ShapeId::intern(id),
            ShapeKind::Geo {
                geo: GeoKind::Rectangle,
                text: None,
            },
            bounds,
        )
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }
}

// ─── Drop events ─────────────────────────────────────────────────────────

/// Shapes released onto a target shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    /// Drop destination; its size is the layout canvas.
    #[serde(rename = "shape")]
    pub target: Shape,
    /// Dropped set, in release order.
    pub shapes: SmallVec<[Shape; 4]>,
}

impl DropEvent {
    pub fn new(target: Shape, shapes: impl IntoIterator<Item = Shape>) -> Self {
        Self {
            target,
            shapes: shapes.into_iter().collect(),
        }
    }

    /// Non-empty dropped set and a target with positive width and height.
    pub fn is_actionable(&self) -> bool {
        !self.shapes.is_empty() && self.target.bounds.has_area()
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.iter().any(|s| s.id == id)
    }
}

// ─── Raster images ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// Encoded image captured from a set of shapes.
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl RasterImage {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:<mime>;base64,<payload>`.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish()
    }
}

/// Where the upload endpoint stored an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReference {
    pub status: crate::wire::Status,
    pub uri: String,
}

// ─── Agent results ───────────────────────────────────────────────────────

/// Semantic description of an uploaded image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub items: Vec<serde_json::Value>,
}

impl AnalysisResult {
    /// Flatten the items into one description: strings verbatim, anything
    /// else as compact JSON, one item per line.
    pub fn description(&self) -> String {
        self.items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Canvas dimensions sent with a layout request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// One object in a layout request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutObject {
    pub id: ShapeId,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutResult {
    pub margins: Margins,
    pub objects: Vec<LayoutObject>,
}

impl LayoutResult {
    /// New absolute position of the laid-out shape: `(left, top)`.
    pub fn origin(&self) -> (f64, f64) {
        (self.margins.left, self.margins.top)
    }
}

// ─── Editor mutations ────────────────────────────────────────────────────

/// Reposition an existing shape. Carries nothing but the id, the type tag,
/// and the new coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeUpdate {
    pub id: ShapeId,
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    pub x: f64,
    pub y: f64,
}

impl ShapeUpdate {
    pub fn move_to(shape: &Shape, x: f64, y: f64) -> Self {
        Self {
            id: shape.id,
            shape_type: shape.shape_type(),
            x,
            y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drop_event_guard() {
        let target = Shape::frame("frame", Bounds::new(0.0, 0.0, 800.0, 600.0));
        let img = Shape::image("img", Bounds::new(10.0, 10.0, 400.0, 400.0));

        assert!(DropEvent::new(target.clone(), [img.clone()]).is_actionable());
        assert!(!DropEvent::new(target, []).is_actionable());

        let flat = Shape::frame("flat", Bounds::new(0.0, 0.0, 800.0, 0.0));
        assert!(!DropEvent::new(flat, [img.clone()]).is_actionable());
        let negative = Shape::frame("neg", Bounds::new(0.0, 0.0, -5.0, 100.0));
        assert!(!DropEvent::new(negative, [img]).is_actionable());
    }

    #[test]
    fn bounds_contain_their_edges() {
        let b = Bounds::new(10.0, 20.0, 100.0, 50.0);
        assert!(b.contains(10.0, 20.0));
        assert!(b.contains(110.0, 70.0));
        assert!(b.contains(60.0, 45.0));
        assert!(!b.contains(9.9, 45.0));
        assert!(!b.contains(60.0, 70.1));
    }

    #[test]
    fn union_of_bounds() {
        let a = Bounds::new(10.0, 20.0, 100.0, 50.0);
        let b = Bounds::new(-10.0, 40.0, 30.0, 100.0);
        assert_eq!(
            Bounds::union([&a, &b]),
            Some(Bounds::new(-10.0, 20.0, 120.0, 120.0))
        );
        assert_eq!(Bounds::union(std::iter::empty()), None);
    }

    #[test]
    fn shape_json_shape() {
        let shape = Shape::image("shape:img", Bounds::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "shape:img",
                "type": "image",
                "src": null,
                "bounds": { "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0 }
            })
        );
        let back: Shape = serde_json::from_value(json).unwrap();
        assert_eq!(back, shape);
    }

    #[test]
    fn data_uri_prefix() {
        let image = RasterImage {
            bytes: vec![0, 0, 0],
            width: 1,
            height: 1,
            format: ImageFormat::Jpeg,
        };
        assert_eq!(image.data_uri(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn analysis_description_flattens_items() {
        let analysis = AnalysisResult {
            items: vec![
                serde_json::json!("a red chair"),
                serde_json::json!({ "label": "table" }),
            ],
        };
        assert_eq!(analysis.description(), "a red chair\n{\"label\":\"table\"}");
    }

    #[test]
    fn update_carries_type_tag() {
        let shape = Shape::image("shape:hero", Bounds::new(5.0, 5.0, 10.0, 10.0));
        let update = ShapeUpdate::move_to(&shape, 30.0, 30.0);
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({ "id": "shape:hero", "type": "image", "x": 30.0, "y": 30.0 })
        );
        assert_eq!(shape.kind.type_tag(), "image");
        assert_eq!(ShapeKind::Frame.type_tag(), "frame");
    }
}
