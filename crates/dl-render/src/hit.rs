//! Hit testing: point → shape lookup.
//!
//! Walks the canvas front-to-back (reverse paint order) to find which shape
//! is at a given canvas position.

use dl_core::id::ShapeId;
use dl_core::model::Bounds;
use dl_core::scene::Canvas;

/// Topmost shape at `(px, py)`, ignoring shapes in `exclude`.
pub fn hit_test(canvas: &Canvas, px: f64, py: f64, exclude: &[ShapeId]) -> Option<ShapeId> {
    canvas
        .shapes()
        .into_iter()
        .rev()
        .filter(|s| !exclude.contains(&s.id))
        .find(|s| s.bounds.has_area() && s.bounds.contains(px, py))
        .map(|s| s.id)
}

/// The shape the `dropped` set was released onto: the topmost other shape
/// under the center of the dropped shapes' combined bounds.
pub fn drop_target(canvas: &Canvas, dropped: &[ShapeId]) -> Option<ShapeId> {
    let bounds: Vec<Bounds> = dropped
        .iter()
        .filter_map(|id| canvas.get(*id).map(|s| s.bounds))
        .collect();
    let (cx, cy) = Bounds::union(&bounds)?.center();
    hit_test(canvas, cx, cy, dropped)
}
