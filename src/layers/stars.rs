//! Star layer: turns catalog records into point primitives with
//! magnitude-based filtering and name labels for the brightest stars.

use crate::layers::{LayerStore, PopulateLayer, Primitives};
use crate::primitives::{LabelPrimitive, PointPrimitive};
use crate::types::{GeocentricCoords, Shape};

pub const LAYER_ID: &str = "layer_stars";
pub const LAYER_NAME: &str = "Stars";

/// Stars render above the grid and constellation figures.
pub const DEPTH_ORDER: i32 = 30;

/// Naked-eye limit; everything fainter is skipped by default.
pub const DEFAULT_MAGNITUDE_LIMIT: f32 = 6.5;

/// Stricter ceiling for name labels.
pub const DEFAULT_LABEL_MAGNITUDE_LIMIT: f32 = 3.0;

const LABEL_COLOR: u32 = 0xFFCCCCCC;
const LABEL_FONT_SIZE: f32 = 13.0;
const LABEL_OFFSET: f32 = 0.02;

/// Stars brighter than this render with the rayed star shape.
const STAR_SHAPE_MAGNITUDE: f32 = 2.0;

/// A single catalog entry as consumed by the layer.
#[derive(Debug, Clone)]
pub struct StarRecord {
    pub id: String,
    /// Proper name; `None` for unnamed catalog stars.
    pub name: Option<String>,
    pub coords: GeocentricCoords,
    /// Apparent visual magnitude; numerically lower is brighter.
    pub magnitude: f32,
    /// Packed ARGB display color, typically derived from spectral class.
    pub color: u32,
    /// Render diameter hint in pixels.
    pub size: u32,
    pub spectral_type: Option<String>,
    pub distance_pc: Option<f32>,
    pub constellation: Option<String>,
}

/// Source of star records. Implementations must return quickly; the layer
/// queries them while holding its write lock.
pub trait StarCatalog: Send + Sync {
    /// All stars with magnitude strictly less than `max_magnitude`.
    fn stars_brighter_than(&self, max_magnitude: f32) -> Vec<StarRecord>;

    fn find_by_id(&self, id: &str) -> Option<StarRecord>;

    /// Partial, case-insensitive name match.
    fn find_by_name(&self, name: &str) -> Vec<StarRecord>;
}

pub struct StarsLayer<C> {
    store: LayerStore,
    catalog: C,
    magnitude_limit: f32,
    label_magnitude_limit: f32,
    show_labels: bool,
}

impl<C: StarCatalog> StarsLayer<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_limits(
            catalog,
            DEFAULT_MAGNITUDE_LIMIT,
            DEFAULT_LABEL_MAGNITUDE_LIMIT,
            true,
        )
    }

    pub fn with_limits(
        catalog: C,
        magnitude_limit: f32,
        label_magnitude_limit: f32,
        show_labels: bool,
    ) -> Self {
        Self {
            store: LayerStore::new(LAYER_ID, LAYER_NAME, DEPTH_ORDER),
            catalog,
            magnitude_limit,
            label_magnitude_limit,
            show_labels,
        }
    }

    pub fn magnitude_limit(&self) -> f32 {
        self.magnitude_limit
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn should_label(&self, star: &StarRecord) -> bool {
        match &star.name {
            Some(name) if !name.is_empty() => star.magnitude <= self.label_magnitude_limit,
            _ => false,
        }
    }
}

/// Bright stars get the rayed star shape, the rest plain discs.
fn point_from_star(star: &StarRecord) -> PointPrimitive {
    let shape = if star.magnitude < STAR_SHAPE_MAGNITUDE {
        Shape::Star
    } else {
        Shape::Circle
    };
    PointPrimitive::new(star.coords, star.color, star.size, shape)
}

impl<C: StarCatalog> PopulateLayer for StarsLayer<C> {
    fn store(&self) -> &LayerStore {
        &self.store
    }

    fn populate(&self, buf: &mut Primitives) {
        let stars = self.catalog.stars_brighter_than(self.magnitude_limit);
        log::debug!(
            "{} stars brighter than magnitude {}",
            stars.len(),
            self.magnitude_limit
        );

        for star in &stars {
            buf.add_point(point_from_star(star));

            if self.show_labels && self.should_label(star) {
                let name = star.name.as_deref().unwrap_or_default();
                match LabelPrimitive::with_style(
                    star.coords,
                    name,
                    LABEL_COLOR,
                    LABEL_FONT_SIZE,
                    LABEL_OFFSET,
                ) {
                    Ok(label) => buf.add_label(label),
                    Err(err) => log::warn!("skipping label for star {}: {err}", star.id),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;

    struct FixedCatalog {
        stars: Vec<StarRecord>,
    }

    fn star(id: &str, name: Option<&str>, magnitude: f32) -> StarRecord {
        StarRecord {
            id: id.to_owned(),
            name: name.map(str::to_owned),
            coords: GeocentricCoords::from_degrees(10.0, 10.0),
            magnitude,
            color: 0xFFFFFFFF,
            size: 4,
            spectral_type: None,
            distance_pc: None,
            constellation: None,
        }
    }

    impl StarCatalog for FixedCatalog {
        fn stars_brighter_than(&self, max_magnitude: f32) -> Vec<StarRecord> {
            self.stars
                .iter()
                .filter(|s| s.magnitude < max_magnitude)
                .cloned()
                .collect()
        }

        fn find_by_id(&self, id: &str) -> Option<StarRecord> {
            self.stars.iter().find(|s| s.id == id).cloned()
        }

        fn find_by_name(&self, name: &str) -> Vec<StarRecord> {
            let needle = name.to_lowercase();
            self.stars
                .iter()
                .filter(|s| {
                    s.name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect()
        }
    }

    fn catalog() -> FixedCatalog {
        FixedCatalog {
            stars: vec![
                star("s1", Some("Sirius"), -1.0),
                star("s2", Some("Polaris"), 2.0),
                star("s3", None, 5.0),
                star("s4", Some("Faint"), 7.0),
            ],
        }
    }

    #[test]
    fn magnitude_ceiling_filters_points() {
        let layer = StarsLayer::new(catalog());
        layer.initialize();
        // 7.0 is fainter than the 6.5 ceiling
        assert_eq!(layer.points().len(), 3);
    }

    #[test]
    fn labels_require_name_and_brightness() {
        let layer = StarsLayer::new(catalog());
        layer.initialize();
        let labels = layer.labels();
        // Sirius (-1.0) and Polaris (2.0) pass the 3.0 label ceiling; the
        // mag-5 star is unnamed and the named mag-7 star was filtered out.
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().any(|l| l.text() == "Sirius"));
        assert!(labels.iter().any(|l| l.text() == "Polaris"));
    }

    #[test]
    fn bright_stars_get_star_shape() {
        let layer = StarsLayer::new(catalog());
        layer.initialize();
        let points = layer.points();
        assert_eq!(points[0].shape(), Shape::Star); // mag -1.0
        assert_eq!(points[1].shape(), Shape::Circle); // mag 2.0, not < 2.0
        assert_eq!(points[2].shape(), Shape::Circle); // mag 5.0
    }

    #[test]
    fn labels_can_be_disabled() {
        let layer = StarsLayer::with_limits(catalog(), 6.5, 3.0, false);
        layer.initialize();
        assert_eq!(layer.points().len(), 3);
        assert!(layer.labels().is_empty());
    }

    #[test]
    fn stricter_magnitude_limit_narrows_the_set() {
        let layer = StarsLayer::with_limits(catalog(), 1.0, 1.0, true);
        layer.initialize();
        assert_eq!(layer.points().len(), 1);
        assert_eq!(layer.labels().len(), 1);
    }
}
