//! Bright-star catalog backing the stars layer.
//!
//! The embedded catalog is a gzipped CSV of the brightest naked-eye stars
//! (HYG-style columns, RA in hours). A path override replaces it with an
//! external file in the same format.

use anyhow::Result;
use csv::{Reader, ReaderBuilder};
use flate2::read::GzDecoder;
use phf::phf_map;
use serde::Deserialize;

use crate::layers::stars::{StarCatalog, StarRecord};
use crate::types::{GeocentricCoords, parse_or};

// Embed the gzipped star catalog
pub const BRIGHT_STARS_CSV_GZ: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/bright_stars.csv.gz"));

/// Display colors by spectral class letter, warm for late types.
static SPECTRAL_COLORS: phf::Map<&'static str, u32> = phf_map! {
    "O" => 0xFF9BB0FF,
    "B" => 0xFFAABFFF,
    "A" => 0xFFCAD7FF,
    "F" => 0xFFF8F7FF,
    "G" => 0xFFFFF4EA,
    "K" => 0xFFFFD2A1,
    "M" => 0xFFFFCC6F,
};

const DEFAULT_STAR_COLOR: u32 = 0xFFFFFFFF;

#[derive(Debug, Deserialize)]
struct StarRow {
    id: String,
    ra: String,
    dec: String,
    dist: String,
    mag: String,
    spect: String,
    con: String,
    proper: String,
}

/// ARGB color for a spectral classification like "K2III".
pub fn spectral_color(spectral_type: &str) -> u32 {
    spectral_type
        .get(0..1)
        .and_then(|letter| SPECTRAL_COLORS.get(letter))
        .copied()
        .unwrap_or(DEFAULT_STAR_COLOR)
}

/// Render diameter from magnitude; brighter stars draw bigger.
pub fn size_for_magnitude(magnitude: f32) -> u32 {
    if magnitude < 0.0 {
        6
    } else if magnitude < 1.0 {
        5
    } else if magnitude < 2.5 {
        4
    } else if magnitude < 4.0 {
        3
    } else {
        2
    }
}

fn parse_stars_from_reader<R: std::io::Read>(mut rdr: Reader<R>) -> Result<Vec<StarRecord>> {
    let mut out = Vec::new();
    for rec in rdr.deserialize() {
        let row: StarRow = rec?;
        let ra_h: f32 = parse_or(&row.ra, 0.0);
        let dec_deg: f32 = parse_or(&row.dec, 0.0);
        let mag: f32 = parse_or(&row.mag, 99.0);
        let dist: f32 = parse_or(&row.dist, -1.0);
        out.push(StarRecord {
            id: row.id,
            name: (!row.proper.is_empty()).then_some(row.proper),
            coords: GeocentricCoords::from_hours(ra_h, dec_deg),
            magnitude: mag,
            color: spectral_color(&row.spect),
            size: size_for_magnitude(mag),
            spectral_type: (!row.spect.is_empty()).then_some(row.spect),
            distance_pc: (dist >= 0.0).then_some(dist),
            constellation: (!row.con.is_empty()).then_some(row.con),
        });
    }
    Ok(out)
}

/// In-memory star catalog loaded once at startup.
pub struct BrightStarCatalog {
    stars: Vec<StarRecord>,
}

impl BrightStarCatalog {
    /// Load the embedded catalog, or an external CSV when a path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let stars = if let Some(p) = path {
            let rdr = ReaderBuilder::new().from_path(p)?;
            parse_stars_from_reader(rdr)?
        } else {
            let gz = GzDecoder::new(BRIGHT_STARS_CSV_GZ);
            let rdr = ReaderBuilder::new().from_reader(gz);
            parse_stars_from_reader(rdr)?
        };
        log::info!("loaded {} catalog stars", stars.len());
        Ok(Self { stars })
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

impl StarCatalog for BrightStarCatalog {
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
        if needle.is_empty() {
            return Vec::new();
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;
    use csv::ReaderBuilder;

    fn parse_from_str(csv: &str) -> Vec<StarRecord> {
        let rdr = ReaderBuilder::new().from_reader(csv.as_bytes());
        parse_stars_from_reader(rdr).expect("parse star CSV")
    }

    #[test]
    fn parses_rows_and_converts_ra_hours_to_degrees() {
        let csv = "\
id,ra,dec,dist,mag,spect,con,proper
32349,6.752481,-16.716116,2.64,-1.44,A1V,CMA,Sirius
27989,5.919529,7.407063,152.67,0.45,M2I,ORI,Betelgeuse
";
        let stars = parse_from_str(csv);
        assert_eq!(stars.len(), 2);

        let s1 = &stars[0];
        assert_eq!(s1.id, "32349");
        assert_eq!(s1.name.as_deref(), Some("Sirius"));
        assert!(approx(s1.coords.ra_deg(), 6.752481 * 15.0, 1e-3));
        assert!(approx(s1.coords.dec_deg(), -16.716116, 1e-4));
        assert!(approx(s1.magnitude, -1.44, 1e-5));
        assert_eq!(s1.color, spectral_color("A1V"));
        assert_eq!(s1.size, 6); // negative magnitude
        assert_eq!(s1.constellation.as_deref(), Some("CMA"));
        assert!(approx(s1.distance_pc.unwrap(), 2.64, 1e-5));

        let s2 = &stars[1];
        assert_eq!(s2.color, spectral_color("M2I"));
        assert_eq!(s2.size, 5); // magnitude in [0, 1)
    }

    #[test]
    fn blank_fields_become_none_and_defaults() {
        let csv = "\
id,ra,dec,dist,mag,spect,con,proper
1,1.0,2.0,,,,,
";
        let stars = parse_from_str(csv);
        let s = &stars[0];
        assert!(s.name.is_none());
        assert!(s.spectral_type.is_none());
        assert!(s.constellation.is_none());
        assert!(s.distance_pc.is_none());
        assert!(approx(s.magnitude, 99.0, 1e-3));
        assert_eq!(s.color, DEFAULT_STAR_COLOR);
    }

    #[test]
    fn embedded_catalog_loads_and_filters() {
        let catalog = BrightStarCatalog::load(None).expect("embedded catalog");
        assert!(catalog.len() > 50);

        let visible = catalog.stars_brighter_than(6.5);
        assert_eq!(visible.len(), catalog.len()); // everything embedded is naked-eye

        let bright = catalog.stars_brighter_than(1.0);
        assert!(bright.len() >= 10 && bright.len() < catalog.len());
        assert!(bright.iter().all(|s| s.magnitude < 1.0));
    }

    #[test]
    fn lookup_by_id_and_name() {
        let catalog = BrightStarCatalog::load(None).unwrap();
        let sirius = catalog.find_by_id("32349").expect("Sirius by id");
        assert_eq!(sirius.name.as_deref(), Some("Sirius"));

        let matches = catalog.find_by_name("pol");
        assert!(matches.iter().any(|s| s.name.as_deref() == Some("Polaris")));
        assert!(matches.iter().any(|s| s.name.as_deref() == Some("Pollux")));

        assert!(catalog.find_by_name("").is_empty());
        assert!(catalog.find_by_id("no-such-id").is_none());
    }

    #[test]
    fn spectral_colors_cover_the_main_sequence() {
        assert_ne!(spectral_color("O5I"), DEFAULT_STAR_COLOR);
        assert_ne!(spectral_color("M2I"), DEFAULT_STAR_COLOR);
        assert_eq!(spectral_color("X9"), DEFAULT_STAR_COLOR);
        assert_eq!(spectral_color(""), DEFAULT_STAR_COLOR);
    }

    #[test]
    fn sizes_step_down_with_magnitude() {
        assert_eq!(size_for_magnitude(-1.4), 6);
        assert_eq!(size_for_magnitude(0.5), 5);
        assert_eq!(size_for_magnitude(2.0), 4);
        assert_eq!(size_for_magnitude(3.9), 3);
        assert_eq!(size_for_magnitude(6.0), 2);
    }
}
