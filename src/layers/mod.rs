//! Layers of celestial primitives.
//!
//! A layer owns three primitive collections (points, lines, labels) behind a
//! read-write lock and knows how to populate them from its data source.
//! Readers (the frame loop) take snapshots concurrently; writers
//! (`initialize`/`redraw`) clear and repopulate atomically. Visibility is
//! independent of data retention: a hidden layer keeps its primitives and
//! re-exposes them when shown again.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::primitives::{LabelPrimitive, LinePrimitive, PointPrimitive};

pub trait Layer: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Rendering order among layers; lower draws behind higher.
    fn depth_order(&self) -> i32;
    /// Populate the layer once. Repeat calls warn and return.
    fn initialize(&self);
    /// Clear and repopulate unconditionally, e.g. after a time change.
    fn redraw(&self);
    fn set_visible(&self, visible: bool);
    fn is_visible(&self) -> bool;
    /// Snapshot of the point primitives; empty when the layer is hidden.
    fn points(&self) -> Vec<PointPrimitive>;
    fn lines(&self) -> Vec<LinePrimitive>;
    fn labels(&self) -> Vec<LabelPrimitive>;
}

/// Primitive buffers a layer populates. Mutation happens only inside
/// `LayerStore::initialize_with`/`redraw_with`, which hold the write lock.
#[derive(Default)]
pub struct Primitives {
    points: Vec<PointPrimitive>,
    lines: Vec<LinePrimitive>,
    labels: Vec<LabelPrimitive>,
}

impl Primitives {
    pub fn add_point(&mut self, point: PointPrimitive) {
        self.points.push(point);
    }

    pub fn add_line(&mut self, line: LinePrimitive) {
        self.lines.push(line);
    }

    pub fn add_label(&mut self, label: LabelPrimitive) {
        self.labels.push(label);
    }

    pub fn add_points(&mut self, points: impl IntoIterator<Item = PointPrimitive>) {
        self.points.extend(points);
    }

    pub fn add_lines(&mut self, lines: impl IntoIterator<Item = LinePrimitive>) {
        self.lines.extend(lines);
    }

    fn clear(&mut self) {
        self.points.clear();
        self.lines.clear();
        self.labels.clear();
    }

    fn count(&self) -> usize {
        self.points.len() + self.lines.len() + self.labels.len()
    }
}

/// Identity, flags, and locked primitive storage shared by every layer.
///
/// Concrete layers embed a store and supply a population routine; the store
/// runs it under the write lock and handles idempotence, redraw, visibility,
/// and snapshotting.
pub struct LayerStore {
    id: &'static str,
    name: &'static str,
    depth_order: i32,
    visible: AtomicBool,
    initialized: AtomicBool,
    primitives: RwLock<Primitives>,
}

impl LayerStore {
    pub fn new(id: &'static str, name: &'static str, depth_order: i32) -> Self {
        Self {
            id,
            name,
            depth_order,
            visible: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            primitives: RwLock::new(Primitives::default()),
        }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn depth_order(&self) -> i32 {
        self.depth_order
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
        log::debug!("layer {} visibility set to {}", self.id, visible);
    }

    /// Run `populate` once under the write lock. Idempotent but noisy:
    /// repeat calls (including races from other threads) warn and return.
    pub fn initialize_with(&self, populate: impl FnOnce(&mut Primitives)) {
        if self.initialized.load(Ordering::Acquire) {
            log::warn!("layer {} already initialized", self.id);
            return;
        }
        let mut buf = self.primitives.write();
        // Recheck under the lock; a concurrent caller may have won the race.
        if self.initialized.swap(true, Ordering::AcqRel) {
            log::warn!("layer {} already initialized", self.id);
            return;
        }
        buf.clear();
        populate(&mut buf);
        log::debug!(
            "layer {} initialized with {} points, {} lines, {} labels",
            self.id,
            buf.points.len(),
            buf.lines.len(),
            buf.labels.len()
        );
    }

    /// Clear and repopulate under the write lock. Does not reset the
    /// initialized flag.
    pub fn redraw_with(&self, populate: impl FnOnce(&mut Primitives)) {
        let mut buf = self.primitives.write();
        buf.clear();
        populate(&mut buf);
        log::debug!(
            "layer {} redrawn with {} primitives",
            self.id,
            buf.count()
        );
    }

    // Snapshot accessors. The hidden case returns without touching the lock;
    // the aggregation loop hits these for every layer every rebuild.

    pub fn points(&self) -> Vec<PointPrimitive> {
        if !self.is_visible() {
            return Vec::new();
        }
        self.primitives.read().points.clone()
    }

    pub fn lines(&self) -> Vec<LinePrimitive> {
        if !self.is_visible() {
            return Vec::new();
        }
        self.primitives.read().lines.clone()
    }

    pub fn labels(&self) -> Vec<LabelPrimitive> {
        if !self.is_visible() {
            return Vec::new();
        }
        self.primitives.read().labels.clone()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.read().count()
    }
}

/// The population half of a layer: a store plus a routine that fills it.
/// Everything else in the [`Layer`] contract is derived from these two.
pub trait PopulateLayer: Send + Sync {
    fn store(&self) -> &LayerStore;
    /// Called with the store's write lock held.
    fn populate(&self, buf: &mut Primitives);
}

impl<T: PopulateLayer> Layer for T {
    fn id(&self) -> &str {
        self.store().id()
    }

    fn name(&self) -> &str {
        self.store().name()
    }

    fn depth_order(&self) -> i32 {
        self.store().depth_order()
    }

    fn initialize(&self) {
        self.store().initialize_with(|buf| self.populate(buf));
    }

    fn redraw(&self) {
        self.store().redraw_with(|buf| self.populate(buf));
    }

    fn set_visible(&self, visible: bool) {
        self.store().set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.store().is_visible()
    }

    fn points(&self) -> Vec<PointPrimitive> {
        self.store().points()
    }

    fn lines(&self) -> Vec<LinePrimitive> {
        self.store().lines()
    }

    fn labels(&self) -> Vec<LabelPrimitive> {
        self.store().labels()
    }
}

pub mod constellations;
pub mod grid;
pub mod planets;
pub mod stars;

pub use constellations::ConstellationsLayer;
pub use grid::GridLayer;
pub use planets::PlanetsLayer;
pub use stars::StarsLayer;
