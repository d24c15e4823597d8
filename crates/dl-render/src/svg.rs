//! Vector export: shapes → standalone SVG document.
//!
//! The document covers the union of the exported shapes' bounds at scale
//! 1:1. Shapes are painted in the order given.

use dl_core::model::{Bounds, GeoKind, Shape, ShapeKind};
use dl_core::scene::Canvas;
use std::fmt::Write as _;

const FRAME_FILL: &str = "#FFFFFF";
const FRAME_STROKE: &str = "#C8C8C8";
const GEO_FILL: &str = "#E3E3E8";
const IMAGE_PLACEHOLDER_FILL: &str = "#D0D0D6";
const LABEL_FILL: &str = "#1D1D1F";

#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Background color painted behind all shapes. `None` = transparent.
    pub background: Option<String>,
    /// Uniform scale of the output document.
    pub scale: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            background: Some("#FFFFFF".to_string()),
            scale: 1.0,
        }
    }
}

/// The editor capability the rasterizer needs: export shapes as SVG.
pub trait VectorExport {
    /// `None` when there is nothing to export.
    fn export_svg(&self, shapes: &[Shape], options: &SvgOptions) -> Option<String>;
}

impl VectorExport for Canvas {
    /// Exports the canvas' current version of each shape. Shapes the canvas
    /// does not know are skipped.
    fn export_svg(&self, shapes: &[Shape], options: &SvgOptions) -> Option<String> {
        let live: Vec<Shape> = shapes
            .iter()
            .filter_map(|s| match self.get(s.id) {
                Some(live) => Some(live.clone()),
                None => {
                    log::warn!("export skipped unknown shape {}", s.id);
                    None
                }
            })
            .collect();
        export_svg(&live, options)
    }
}

/// Serialize `shapes` as an SVG document. Returns `None` for an empty set or
/// when the combined bounds have no area.
pub fn export_svg(shapes: &[Shape], options: &SvgOptions) -> Option<String> {
    let area = Bounds::union(shapes.iter().map(|s| &s.bounds))?;
    if !area.has_area() || options.scale <= 0.0 {
        return None;
    }

    let width = area.width * options.scale;
    let height = area.height * options.scale;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{} {} {} {}\">",
        area.x, area.y, area.width, area.height
    );

    if let Some(bg) = &options.background {
        let _ = writeln!(
            svg,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" />",
            area.x,
            area.y,
            area.width,
            area.height,
            escape(bg)
        );
    }

    for shape in shapes {
        render_shape_svg(&mut svg, shape);
    }

    svg.push_str("</svg>\n");
    Some(svg)
}

fn render_shape_svg(out: &mut String, shape: &Shape) {
    let b = &shape.bounds;
    if !b.has_area() {
        return;
    }

    match &shape.kind {
        ShapeKind::Frame => {
            let fill = shape.fill.as_deref().unwrap_or(FRAME_FILL);
            let _ = writeln!(
                out,
                "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\" />",
                b.x,
                b.y,
                b.width,
                b.height,
                escape(fill),
                FRAME_STROKE
            );
        }
        ShapeKind::Geo { geo, text } => {
            let fill = escape(shape.fill.as_deref().unwrap_or(GEO_FILL));
            match geo {
                GeoKind::Rectangle => {
                    let _ = writeln!(
                        out,
                        "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{fill}\" />",
                        b.x, b.y, b.width, b.height
                    );
                }
                GeoKind::Ellipse => {
                    let (cx, cy) = b.center();
                    let _ = writeln!(
                        out,
                        "  <ellipse cx=\"{cx}\" cy=\"{cy}\" rx=\"{}\" ry=\"{}\" fill=\"{fill}\" />",
                        b.width / 2.0,
                        b.height / 2.0
                    );
                }
            }
            if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                let (cx, cy) = b.center();
                let _ = writeln!(
                    out,
                    "  <text x=\"{cx}\" y=\"{cy}\" font-size=\"16\" fill=\"{LABEL_FILL}\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
                    escape(text)
                );
            }
        }
        ShapeKind::Image { src } => match src.as_deref().filter(|s| !s.is_empty()) {
            Some(href) => {
                let _ = writeln!(
                    out,
                    "  <image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{}\" />",
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                    escape(href)
                );
            }
            None => {
                let fill = shape.fill.as_deref().unwrap_or(IMAGE_PLACEHOLDER_FILL);
                let _ = writeln!(
                    out,
                    "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" />",
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                    escape(fill)
                );
            }
        },
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_core::id::ShapeId;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_set_exports_nothing() {
        assert_eq!(export_svg(&[], &SvgOptions::default()), None);
    }

    #[test]
    fn zero_area_exports_nothing() {
        let flat = Shape::image("flat", Bounds::new(0.0, 0.0, 100.0, 0.0));
        assert_eq!(export_svg(&[flat], &SvgOptions::default()), None);
    }

    #[test]
    fn view_box_covers_union() {
        let a = Shape::image("a", Bounds::new(10.0, 10.0, 100.0, 100.0));
        let b = Shape::rect("b", Bounds::new(60.0, 50.0, 100.0, 100.0));
        let svg = export_svg(&[a, b], &SvgOptions::default()).unwrap();
        assert!(svg.contains("viewBox=\"10 10 150 140\""));
        assert!(svg.contains("width=\"150\" height=\"140\""));
    }

    #[test]
    fn background_is_optional() {
        let a = Shape::rect("a", Bounds::new(0.0, 0.0, 10.0, 10.0)).with_fill("#112233");
        let with_bg = export_svg(std::slice::from_ref(&a), &SvgOptions::default()).unwrap();
        let without = export_svg(
            &[a],
            &SvgOptions {
                background: None,
                scale: 1.0,
            },
        )
        .unwrap();
        assert_eq!(with_bg.matches("<rect").count(), 2);
        assert_eq!(without.matches("<rect").count(), 1);
    }

    #[test]
    fn image_href_and_label_are_escaped() {
        let mut img = Shape::image("img", Bounds::new(0.0, 0.0, 10.0, 10.0));
        img.kind = ShapeKind::Image {
            src: Some("https://x.test/a?b=1&c=\"2\"".into()),
        };
        let label = Shape::new(
            ShapeId::intern("label"),
            ShapeKind::Geo {
                geo: GeoKind::Ellipse,
                text: Some("<b>hi</b>".into()),
            },
            Bounds::new(0.0, 0.0, 10.0, 10.0),
        );
        let svg = export_svg(&[img, label], &SvgOptions::default()).unwrap();
        assert!(svg.contains("href=\"https://x.test/a?b=1&amp;c=&quot;2&quot;\""));
        assert!(svg.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(svg.contains("<ellipse cx=\"5\" cy=\"5\""));
    }

    #[test]
    fn canvas_exports_live_geometry() {
        let mut canvas = Canvas::new();
        canvas
            .add_shape(Shape::image("live", Bounds::new(5.0, 5.0, 20.0, 20.0)))
            .unwrap();
        let stale = Shape::image("live", Bounds::new(500.0, 500.0, 20.0, 20.0));
        let ghost = Shape::image("ghost", Bounds::new(0.0, 0.0, 1.0, 1.0));
        let svg = canvas
            .export_svg(&[stale, ghost], &SvgOptions::default())
            .unwrap();
        assert!(svg.contains("viewBox=\"5 5 20 20\""));
    }
}
