//! Celestial coordinate grid: RA meridians, declination parallels, the
//! equator, an optional ecliptic, and tick labels.

use crate::layers::{LayerStore, PopulateLayer, Primitives};
use crate::primitives::{LabelPrimitive, LinePrimitive};
use crate::types::GeocentricCoords;

pub const LAYER_ID: &str = "layer_grid";
pub const LAYER_NAME: &str = "Coordinate Grid";

/// Grid renders behind everything else.
pub const DEPTH_ORDER: i32 = 0;

/// Vertices per meridian, north pole to south pole.
const MERIDIAN_VERTICES: u32 = 19;

/// Vertices per declination circle before the closing repeat (10° RA steps).
const PARALLEL_VERTICES: u32 = 36;

/// Obliquity of the ecliptic, degrees.
const OBLIQUITY_DEG: f32 = 23.439281;

const GRID_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Number of RA meridians (12 gives 2-hour spacing).
    pub ra_lines: u32,
    /// Declination divisions between equator and pole; parallels are drawn
    /// at i * 90 / dec_lines for i = 1..dec_lines on each side.
    pub dec_lines: u32,
    pub line_color: u32,
    pub equator_color: u32,
    pub ecliptic_color: u32,
    pub label_color: u32,
    pub line_width: f32,
    pub show_ecliptic: bool,
    pub show_labels: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            ra_lines: 12,
            dec_lines: 9,
            line_color: 0x14F8EFBC,
            equator_color: 0x40F8EFBC,
            ecliptic_color: 0x40FFB347,
            label_color: 0x80F8EFBC,
            line_width: 1.0,
            show_ecliptic: false,
            show_labels: true,
        }
    }
}

pub struct GridLayer {
    store: LayerStore,
    cfg: GridConfig,
}

impl GridLayer {
    pub fn new() -> Self {
        Self::with_config(GridConfig::default())
    }

    pub fn with_config(cfg: GridConfig) -> Self {
        Self {
            store: LayerStore::new(LAYER_ID, LAYER_NAME, DEPTH_ORDER),
            cfg,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.cfg
    }

    /// Meridian at `index * 360 / ra_lines` degrees RA, pole to pole.
    fn meridian(&self, index: u32) -> LinePrimitive {
        let ra = index as f32 * 360.0 / self.cfg.ra_lines as f32;
        let mut line = LinePrimitive::new(self.cfg.line_color, self.cfg.line_width);
        for i in 0..MERIDIAN_VERTICES {
            let dec = 90.0 - i as f32 * 180.0 / (MERIDIAN_VERTICES - 1) as f32;
            line.add_vertex(ra, dec);
        }
        line
    }

    /// Closed declination circle at `dec` degrees.
    fn parallel(&self, dec: f32, color: u32) -> LinePrimitive {
        let mut line = LinePrimitive::new(color, self.cfg.line_width);
        for i in 0..=PARALLEL_VERTICES {
            let ra = if i == PARALLEL_VERTICES {
                0.0
            } else {
                i as f32 * 360.0 / PARALLEL_VERTICES as f32
            };
            line.add_vertex(ra, dec);
        }
        line
    }

    /// The ecliptic as a great circle tilted by the obliquity:
    /// RA = atan2(sin λ · cos ε, cos λ), Dec = asin(sin λ · sin ε).
    fn ecliptic(&self) -> LinePrimitive {
        let eps = OBLIQUITY_DEG.to_radians();
        let mut line = LinePrimitive::new(self.cfg.ecliptic_color, self.cfg.line_width);
        for i in 0..=PARALLEL_VERTICES {
            let lon = (i as f32 * 360.0 / PARALLEL_VERTICES as f32).to_radians();
            let ra = (lon.sin() * eps.cos()).atan2(lon.cos()).to_degrees();
            let dec = (lon.sin() * eps.sin()).asin().to_degrees();
            line.add_vertex(ra.rem_euclid(360.0), dec);
        }
        line
    }

    fn add_label(&self, buf: &mut Primitives, ra: f32, dec: f32, text: String) {
        let loc = GeocentricCoords::from_degrees(ra, dec);
        match LabelPrimitive::with_style(loc, text, self.cfg.label_color, GRID_FONT_SIZE, 0.0) {
            Ok(label) => buf.add_label(label),
            Err(err) => log::warn!("skipping grid label: {err}"),
        }
    }
}

impl Default for GridLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PopulateLayer for GridLayer {
    fn store(&self) -> &LayerStore {
        &self.store
    }

    fn populate(&self, buf: &mut Primitives) {
        // Meridians
        for i in 0..self.cfg.ra_lines {
            buf.add_line(self.meridian(i));
        }

        // Equator first, at the brighter color
        buf.add_line(self.parallel(0.0, self.cfg.equator_color));

        // Parallels either side of the equator, with tick labels
        for i in 1..self.cfg.dec_lines {
            let dec = i as f32 * 90.0 / self.cfg.dec_lines as f32;
            buf.add_line(self.parallel(dec, self.cfg.line_color));
            buf.add_line(self.parallel(-dec, self.cfg.line_color));

            if self.cfg.show_labels {
                self.add_label(buf, 0.0, dec, format_dec(dec));
                self.add_label(buf, 0.0, -dec, format_dec(-dec));
            }
        }

        if self.cfg.show_labels {
            self.add_label(buf, 0.0, 90.0, "N".to_owned());
            self.add_label(buf, 0.0, -90.0, "S".to_owned());

            // Hour marks along the equator, every 2 hours
            for h in 0..12u32 {
                let ra = h as f32 * 30.0;
                self.add_label(buf, ra, 0.0, format!("{}h", h * 2));
            }
        }

        if self.cfg.show_ecliptic {
            buf.add_line(self.ecliptic());
        }
    }
}

/// Signed integer degrees with a trailing degree sign, e.g. "+30°" / "-10°".
fn format_dec(dec: f32) -> String {
    let deg = dec.round() as i32;
    if deg > 0 {
        format!("+{deg}\u{00B0}")
    } else {
        format!("{deg}\u{00B0}")
    }
}
