//! Depth-ordered aggregation of layer primitives into flat per-kind batches
//! ready for GPU upload.

use std::sync::Arc;

use crate::layers::Layer;
use crate::primitives::{LabelPrimitive, LinePrimitive, PointPrimitive};

/// Flat primitive lists for one frame, in final draw order.
#[derive(Default)]
pub struct SceneBatches {
    pub points: Vec<PointPrimitive>,
    pub lines: Vec<LinePrimitive>,
    pub labels: Vec<LabelPrimitive>,
}

/// Owns the layer set and rebuilds the flat batches when it changes.
///
/// Aggregation is driven by an explicit dirty flag, not run every frame: star
/// layers can hold tens of thousands of points, and re-collecting them per
/// frame would dominate the frame budget.
pub struct SceneComposer {
    layers: Vec<Arc<dyn Layer>>,
    dirty: bool,
}

impl SceneComposer {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            dirty: true,
        }
    }

    pub fn add_layer(&mut self, layer: Arc<dyn Layer>) {
        self.layers.push(layer);
        self.dirty = true;
    }

    pub fn remove_layer(&mut self, id: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.id() != id);
        let removed = self.layers.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn set_layers(&mut self, layers: Vec<Arc<dyn Layer>>) {
        self.layers = layers;
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.dirty = true;
    }

    pub fn layer(&self, id: &str) -> Option<&Arc<dyn Layer>> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Signal that layer contents changed (visibility toggle, redraw) and
    /// the batches must be rebuilt on the next frame.
    pub fn mark_changed(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Collect all visible layers' primitives, back to front, and clear the
    /// dirty flag. Within each output list, a layer's primitives appear in
    /// its own insertion order.
    pub fn aggregate(&mut self) -> SceneBatches {
        let mut ordered: Vec<&Arc<dyn Layer>> = self.layers.iter().collect();
        ordered.sort_by_key(|l| l.depth_order());

        let mut batches = SceneBatches::default();
        for layer in ordered {
            if !layer.is_visible() {
                continue;
            }
            batches.points.extend(layer.points());
            batches.lines.extend(layer.lines());
            batches.labels.extend(layer.labels());
        }

        self.dirty = false;
        log::debug!(
            "aggregated {} points, {} lines, {} labels from {} layers",
            batches.points.len(),
            batches.lines.len(),
            batches.labels.len(),
            self.layers.len()
        );
        batches
    }
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new()
    }
}
