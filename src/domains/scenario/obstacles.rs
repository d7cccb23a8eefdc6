use crate::domains::sync::Polygon;
use std::collections::BTreeSet;
use tracing::debug;

/// Static obstacles known to the radio environment.
#[derive(Debug, Clone, Default)]
pub struct ObstacleControl {
    supported_types: BTreeSet<String>,
    obstacles: Vec<Polygon>,
}

impl ObstacleControl {
    pub fn new<I, S>(supported_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported_types: supported_types.into_iter().map(Into::into).collect(),
            obstacles: Vec::new(),
        }
    }

    pub fn is_type_supported(&self, kind: &str) -> bool {
        self.supported_types.contains(kind)
    }

    pub fn add_from_type_and_shape(&mut self, polygon: Polygon) {
        debug!(id = %polygon.id, kind = %polygon.kind, vertices = polygon.shape.len(), "adding obstacle");
        self.obstacles.push(polygon);
    }

    /// Adds every polygon of a supported type and returns how many were added.
    pub fn add_supported(&mut self, polygons: &[Polygon]) -> usize {
        let before = self.obstacles.len();
        for polygon in polygons {
            if self.is_type_supported(&polygon.kind) {
                self.add_from_type_and_shape(polygon.clone());
            }
        }
        self.obstacles.len() - before
    }

    pub fn obstacles(&self) -> &[Polygon] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}
