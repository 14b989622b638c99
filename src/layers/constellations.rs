//! Constellation figures: stick-figure polylines plus a name label at the
//! figure's centroid.

use glam::Vec3;

use crate::layers::{LayerStore, PopulateLayer, Primitives};
use crate::primitives::{LabelPrimitive, LinePrimitive};
use crate::types::GeocentricCoords;

pub const LAYER_ID: &str = "layer_constellations";
pub const LAYER_NAME: &str = "Constellations";

/// Figures render above the grid, below stars.
pub const DEPTH_ORDER: i32 = 10;

const LINE_COLOR: u32 = 0x40FFFFFF;
const LINE_WIDTH: f32 = 1.5;
const LABEL_COLOR: u32 = 0xFF87CEEB;
const LABEL_FONT_SIZE: f32 = 14.0;

/// One constellation: identity plus its figure polylines.
#[derive(Debug, Clone)]
pub struct ConstellationFigure {
    /// IAU abbreviation, e.g. "ORI".
    pub id: String,
    pub name: String,
    pub polylines: Vec<Vec<GeocentricCoords>>,
}

impl ConstellationFigure {
    /// Mean direction of all figure vertices, used to anchor the name label.
    /// `None` when the figure is empty or the vertices cancel out.
    pub fn centroid(&self) -> Option<GeocentricCoords> {
        let mut sum = Vec3::ZERO;
        let mut n = 0u32;
        for polyline in &self.polylines {
            for vertex in polyline {
                sum += vertex.to_vector3();
                n += 1;
            }
        }
        if n == 0 || sum.length() < 1e-6 {
            return None;
        }
        Some(GeocentricCoords::from_vector3(sum.normalize()))
    }
}

pub trait ConstellationSource: Send + Sync {
    fn constellations(&self) -> Vec<ConstellationFigure>;

    fn find_by_id(&self, id: &str) -> Option<ConstellationFigure>;

    fn find_by_name(&self, name: &str) -> Vec<ConstellationFigure>;
}

pub struct ConstellationsLayer<S> {
    store: LayerStore,
    source: S,
    show_lines: bool,
    show_names: bool,
}

impl<S: ConstellationSource> ConstellationsLayer<S> {
    pub fn new(source: S) -> Self {
        Self {
            store: LayerStore::new(LAYER_ID, LAYER_NAME, DEPTH_ORDER),
            source,
            show_lines: true,
            show_names: true,
        }
    }

    pub fn show_lines(mut self, show: bool) -> Self {
        self.show_lines = show;
        self
    }

    pub fn show_names(mut self, show: bool) -> Self {
        self.show_names = show;
        self
    }
}

impl<S: ConstellationSource> PopulateLayer for ConstellationsLayer<S> {
    fn store(&self) -> &LayerStore {
        &self.store
    }

    fn populate(&self, buf: &mut Primitives) {
        for figure in self.source.constellations() {
            if self.show_lines {
                for polyline in &figure.polylines {
                    if polyline.len() < 2 {
                        log::warn!("degenerate figure segment in {}", figure.id);
                        continue;
                    }
                    buf.add_line(LinePrimitive::with_vertices(
                        LINE_COLOR,
                        LINE_WIDTH,
                        polyline.clone(),
                    ));
                }
            }

            if self.show_names {
                if let Some(centroid) = figure.centroid() {
                    match LabelPrimitive::with_style(
                        centroid,
                        figure.name.clone(),
                        LABEL_COLOR,
                        LABEL_FONT_SIZE,
                        0.0,
                    ) {
                        Ok(label) => buf.add_label(label),
                        Err(err) => log::warn!("skipping name for {}: {err}", figure.id),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;
    use crate::test_utils::approx;

    struct FixedSource {
        figures: Vec<ConstellationFigure>,
    }

    impl ConstellationSource for FixedSource {
        fn constellations(&self) -> Vec<ConstellationFigure> {
            self.figures.clone()
        }

        fn find_by_id(&self, id: &str) -> Option<ConstellationFigure> {
            self.figures.iter().find(|f| f.id == id).cloned()
        }

        fn find_by_name(&self, name: &str) -> Vec<ConstellationFigure> {
            let needle = name.to_lowercase();
            self.figures
                .iter()
                .filter(|f| f.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
    }

    fn coords(ra: f32, dec: f32) -> GeocentricCoords {
        GeocentricCoords::from_degrees(ra, dec)
    }

    fn source() -> FixedSource {
        FixedSource {
            figures: vec![ConstellationFigure {
                id: "TRI".to_owned(),
                name: "Triangulum".to_owned(),
                polylines: vec![
                    vec![coords(28.0, 29.0), coords(30.0, 33.0), coords(32.0, 35.0)],
                    vec![coords(28.0, 29.0), coords(32.0, 35.0)],
                ],
            }],
        }
    }

    #[test]
    fn figures_become_lines_and_a_name_label() {
        let layer = ConstellationsLayer::new(source());
        layer.initialize();
        let lines = layer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].segment_count(), 2);
        assert_eq!(lines[1].segment_count(), 1);

        let labels = layer.labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text(), "Triangulum");
    }

    #[test]
    fn centroid_sits_inside_the_figure() {
        let figure = source().figures.remove(0);
        let centroid = figure.centroid().unwrap();
        assert!(centroid.ra_deg() > 27.0 && centroid.ra_deg() < 33.0);
        assert!(centroid.dec_deg() > 28.0 && centroid.dec_deg() < 36.0);
    }

    #[test]
    fn empty_figure_has_no_centroid() {
        let figure = ConstellationFigure {
            id: "X".to_owned(),
            name: "X".to_owned(),
            polylines: vec![],
        };
        assert!(figure.centroid().is_none());
    }

    #[test]
    fn toggles_suppress_lines_or_names() {
        let no_lines = ConstellationsLayer::new(source()).show_lines(false);
        no_lines.initialize();
        assert!(no_lines.lines().is_empty());
        assert_eq!(no_lines.labels().len(), 1);

        let no_names = ConstellationsLayer::new(source()).show_names(false);
        no_names.initialize();
        assert_eq!(no_names.lines().len(), 2);
        assert!(no_names.labels().is_empty());
    }

    #[test]
    fn single_vertex_polyline_is_skipped() {
        let layer = ConstellationsLayer::new(FixedSource {
            figures: vec![ConstellationFigure {
                id: "PT".to_owned(),
                name: "Point".to_owned(),
                polylines: vec![vec![coords(0.0, 0.0)]],
            }],
        });
        layer.initialize();
        assert!(layer.lines().is_empty());
        // The label is still produced from the lone vertex
        let labels = layer.labels();
        assert_eq!(labels.len(), 1);
        assert!(approx(labels[0].location().dec_deg(), 0.0, 1e-4));
    }
}
