//! Replica: the client's ordered copy of a room's shape log.
//!
//! Shapes keep the order in which they were first seen. An incoming shape whose
//! id is already present replaces that entry in place; any other shape is
//! appended. The same rule serves remote `drawShape`/`updateShape` events and
//! local freehand amends, so either source can apply at any time without
//! disturbing the other.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use frames::Shape;

/// How [`Replica::upsert`] applied a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The id was new; the shape went to the end of the log.
    Appended,
    /// An entry with the same id was replaced in place.
    Amended,
}

/// In-memory, ordered store of shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replica {
    shapes: Vec<Shape>,
}

impl Replica {
    /// Create an empty replica.
    #[must_use]
    pub fn new() -> Self {
        Self { shapes: Vec::new() }
    }

    /// Replace the whole collection with a server snapshot.
    pub fn load_snapshot(&mut self, shapes: Vec<Shape>) {
        self.shapes = shapes;
    }

    /// Amend the entry with the same id, or append when the id is new.
    pub fn upsert(&mut self, shape: Shape) -> Applied {
        match self.position(&shape.id) {
            Some(index) => {
                self.shapes[index] = shape;
                Applied::Amended
            }
            None => {
                self.shapes.push(shape);
                Applied::Appended
            }
        }
    }

    /// Index of the entry with `id`, if present.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.id == id)
    }

    /// Drop every shape.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Owned copy of the current collection, for history snapshots.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Shape> {
        self.shapes.clone()
    }

    /// Swap in a previously taken snapshot, returning the current collection.
    pub fn restore(&mut self, shapes: Vec<Shape>) -> Vec<Shape> {
        std::mem::replace(&mut self.shapes, shapes)
    }

    /// Shapes in log order, for rendering.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
