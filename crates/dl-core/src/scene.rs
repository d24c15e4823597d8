//! In-memory canvas scene.
//!
//! Shapes hang off a single root node of a `StableDiGraph`; child order is
//! paint order (first = bottom). Node indices stay valid across removals, so
//! the id index never has to be rebuilt.

use crate::id::ShapeId;
use crate::model::{Shape, ShapeUpdate};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanvasError {
    #[error("unknown shape {0}")]
    UnknownShape(ShapeId),

    #[error("shape {id} is a {actual}, update targeted a {requested}")]
    TypeMismatch {
        id: ShapeId,
        actual: &'static str,
        requested: &'static str,
    },

    #[error("duplicate shape id {0}")]
    DuplicateId(ShapeId),
}

#[derive(Debug, Clone)]
enum Node {
    Root,
    Shape(Shape),
}

/// The shapes currently on the canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    graph: StableDiGraph<Node, ()>,
    root: NodeIndex,
    id_index: HashMap<ShapeId, NodeIndex>,
}

impl Canvas {
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Node::Root);
        Self {
            graph,
            root,
            id_index: HashMap::new(),
        }
    }

    /// Add a shape on top of everything else.
    pub fn add_shape(&mut self, shape: Shape) -> Result<NodeIndex, CanvasError> {
        if self.id_index.contains_key(&shape.id) {
            return Err(CanvasError::DuplicateId(shape.id));
        }
        let id = shape.id;
        let idx = self.graph.add_node(Node::Shape(shape));
        self.graph.add_edge(self.root, idx, ());
        self.id_index.insert(id, idx);
        Ok(idx)
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let idx = self.id_index.remove(&id)?;
        match self.graph.remove_node(idx) {
            Some(Node::Shape(shape)) => Some(shape),
            _ => None,
        }
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.id_index.get(&id).and_then(|idx| match &self.graph[*idx] {
            Node::Shape(shape) => Some(shape),
            Node::Root => None,
        })
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        let idx = self.id_index.get(&id).copied()?;
        match &mut self.graph[idx] {
            Node::Shape(shape) => Some(shape),
            Node::Root => None,
        }
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    /// Shapes in paint order (bottom first).
    ///
    /// Sorted by `NodeIndex` so the order is insertion order regardless of
    /// how petgraph walks its adjacency list.
    pub fn shapes(&self) -> Vec<&Shape> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(self.root, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
            .into_iter()
            .filter_map(|idx| match &self.graph[idx] {
                Node::Shape(shape) => Some(shape),
                Node::Root => None,
            })
            .collect()
    }

    /// Look up several shapes, failing on the first unknown id.
    pub fn collect(&self, ids: &[ShapeId]) -> Result<Vec<Shape>, CanvasError> {
        ids.iter()
            .map(|id| self.get(*id).cloned().ok_or(CanvasError::UnknownShape(*id)))
            .collect()
    }

    /// Move a shape. Only `x`/`y` change; size, kind and fill are untouched.
    pub fn apply_update(&mut self, update: ShapeUpdate) -> Result<(), CanvasError> {
        let shape = self
            .get_mut(update.id)
            .ok_or(CanvasError::UnknownShape(update.id))?;
        let actual = shape.shape_type();
        if actual != update.shape_type {
            return Err(CanvasError::TypeMismatch {
                id: update.id,
                actual: actual.as_str(),
                requested: update.shape_type.as_str(),
            });
        }
        log::debug!(
            "moving {} from ({}, {}) to ({}, {})",
            update.id,
            shape.bounds.x,
            shape.bounds.y,
            update.x,
            update.y
        );
        shape.bounds.x = update.x;
        shape.bounds.y = update.y;
        Ok(())
    }

    /// An id no shape in this canvas uses, e.g. `image_3`.
    pub fn fresh_id(&self, prefix: &str) -> ShapeId {
        let mut n = self.len();
        loop {
            let id = ShapeId::intern(&format!("{prefix}_{n}"));
            if !self.contains(id) {
                return id;
            }
            n += 1;
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk form: `{ "shapes": [...] }` in paint order.
#[derive(Serialize, Deserialize)]
struct CanvasDoc<S> {
    shapes: Vec<S>,
}

impl Serialize for Canvas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CanvasDoc {
            shapes: self.shapes(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Canvas {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = CanvasDoc::<Shape>::deserialize(deserializer)?;
        let mut canvas = Canvas::new();
        for shape in doc.shapes {
            canvas.add_shape(shape).map_err(serde::de::Error::custom)?;
        }
        Ok(canvas)
    }
}
