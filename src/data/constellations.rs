//! Constellation figure data backing the constellations layer.
//!
//! The embedded CSV stores figure polylines as (constellation, segment,
//! RA hours, Dec degrees) rows; consecutive rows of one segment form a
//! polyline. Full names come from the IAU abbreviation table.

use anyhow::Result;
use csv::{Reader, ReaderBuilder, Trim};
use phf::phf_map;
use std::collections::HashMap;

use crate::layers::constellations::{ConstellationFigure, ConstellationSource};
use crate::types::{GeocentricCoords, parse_or};

// Embed the constellation figure data
pub const CONSTELLATIONS_CSV: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/data/constellations.csv"
));

static CONSTELLATION_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "AND" => "Andromeda",
    "ANT" => "Antlia",
    "APS" => "Apus",
    "AQL" => "Aquila",
    "AQR" => "Aquarius",
    "ARA" => "Ara",
    "ARI" => "Aries",
    "AUR" => "Auriga",
    "BOO" => "Boötes",
    "CAE" => "Caelum",
    "CAM" => "Camelopardalis",
    "CAP" => "Capricornus",
    "CAR" => "Carina",
    "CAS" => "Cassiopeia",
    "CEN" => "Centaurus",
    "CEP" => "Cepheus",
    "CET" => "Cetus",
    "CHA" => "Chamaeleon",
    "CIR" => "Circinus",
    "CMA" => "Canis Major",
    "CMI" => "Canis Minor",
    "CNC" => "Cancer",
    "COL" => "Columba",
    "COM" => "Coma Berenices",
    "CRA" => "Corona Australis",
    "CRB" => "Corona Borealis",
    "CRT" => "Crater",
    "CRU" => "Crux",
    "CRV" => "Corvus",
    "CVN" => "Canes Venatici",
    "CYG" => "Cygnus",
    "DEL" => "Delphinus",
    "DOR" => "Dorado",
    "DRA" => "Draco",
    "EQU" => "Equuleus",
    "ERI" => "Eridanus",
    "FOR" => "Fornax",
    "GEM" => "Gemini",
    "GRU" => "Grus",
    "HER" => "Hercules",
    "HOR" => "Horologium",
    "HYA" => "Hydra",
    "HYI" => "Hydrus",
    "IND" => "Indus",
    "LAC" => "Lacerta",
    "LEO" => "Leo",
    "LEP" => "Lepus",
    "LIB" => "Libra",
    "LMI" => "Leo Minor",
    "LUP" => "Lupus",
    "LYN" => "Lynx",
    "LYR" => "Lyra",
    "MEN" => "Mensa",
    "MIC" => "Microscopium",
    "MON" => "Monoceros",
    "MUS" => "Musca",
    "NOR" => "Norma",
    "OCT" => "Octans",
    "OPH" => "Ophiuchus",
    "ORI" => "Orion",
    "PAV" => "Pavo",
    "PEG" => "Pegasus",
    "PER" => "Perseus",
    "PHE" => "Phoenix",
    "PIC" => "Pictor",
    "PSA" => "Piscis Austrinus",
    "PSC" => "Pisces",
    "PUP" => "Puppis",
    "PYX" => "Pyxis",
    "RET" => "Reticulum",
    "SCL" => "Sculptor",
    "SCO" => "Scorpius",
    "SCT" => "Scutum",
    "SER" => "Serpens",
    "SEX" => "Sextans",
    "SGE" => "Sagitta",
    "SGR" => "Sagittarius",
    "TAU" => "Taurus",
    "TEL" => "Telescopium",
    "TRA" => "Triangulum Australe",
    "TRI" => "Triangulum",
    "TUC" => "Tucana",
    "UMA" => "Ursa Major",
    "UMI" => "Ursa Minor",
    "VEL" => "Vela",
    "VIR" => "Virgo",
    "VOL" => "Volans",
    "VUL" => "Vulpecula",
};

/// Full name for an IAU abbreviation; falls back to the abbreviation.
pub fn constellation_name(abbreviation: &str) -> &str {
    CONSTELLATION_NAMES
        .get(abbreviation)
        .copied()
        .unwrap_or(abbreviation)
}

fn parse_figures_from_reader<R: std::io::Read>(
    mut rdr: Reader<R>,
) -> Result<Vec<ConstellationFigure>> {
    // (constellation, segment) -> polyline, in first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut segments: HashMap<String, Vec<(u32, Vec<GeocentricCoords>)>> = HashMap::new();

    for rec in rdr.records() {
        let row = rec?;
        let con = row.get(0).unwrap_or("").to_owned();
        if con.is_empty() {
            continue;
        }
        let seg: u32 = parse_or(row.get(1).unwrap_or("0"), 0);
        let ra_h: f32 = parse_or(row.get(2).unwrap_or("0"), 0.0);
        let dec: f32 = parse_or(row.get(3).unwrap_or("0"), 0.0);
        let vertex = GeocentricCoords::from_hours(ra_h, dec);

        let entry = segments.entry(con.clone()).or_insert_with(|| {
            order.push(con.clone());
            Vec::new()
        });
        match entry.iter_mut().find(|(s, _)| *s == seg) {
            Some((_, polyline)) => polyline.push(vertex),
            None => entry.push((seg, vec![vertex])),
        }
    }

    Ok(order
        .into_iter()
        .map(|con| {
            let mut segs = segments.remove(&con).unwrap_or_default();
            segs.sort_by_key(|(s, _)| *s);
            ConstellationFigure {
                name: constellation_name(&con).to_owned(),
                id: con,
                polylines: segs.into_iter().map(|(_, p)| p).collect(),
            }
        })
        .collect())
}

/// In-memory constellation figures loaded once at startup.
pub struct FigureCatalog {
    figures: Vec<ConstellationFigure>,
}

impl FigureCatalog {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let figures = if let Some(p) = path {
            let rdr = ReaderBuilder::new().trim(Trim::All).from_path(p)?;
            parse_figures_from_reader(rdr)?
        } else {
            let rdr = ReaderBuilder::new()
                .trim(Trim::All)
                .from_reader(CONSTELLATIONS_CSV.as_bytes());
            parse_figures_from_reader(rdr)?
        };
        log::info!("loaded {} constellation figures", figures.len());
        Ok(Self { figures })
    }
}

impl ConstellationSource for FigureCatalog {
    fn constellations(&self) -> Vec<ConstellationFigure> {
        self.figures.clone()
    }

    fn find_by_id(&self, id: &str) -> Option<ConstellationFigure> {
        self.figures.iter().find(|f| f.id == id).cloned()
    }

    fn find_by_name(&self, name: &str) -> Vec<ConstellationFigure> {
        let needle = name.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.figures
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;

    #[test]
    fn embedded_figures_load_with_names_resolved() {
        let catalog = FigureCatalog::load(None).expect("embedded figures");
        let figures = catalog.constellations();
        assert!(figures.len() >= 5);

        let orion = catalog.find_by_id("ORI").expect("Orion");
        assert_eq!(orion.name, "Orion");
        // Belt plus the body outline
        assert_eq!(orion.polylines.len(), 2);
        assert_eq!(orion.polylines[0].len(), 3);
    }

    #[test]
    fn segments_group_into_polylines() {
        let csv = "\
con,seg,ra,dec
TST,0,1.0,10.0
TST,0,2.0,20.0
TST,1,3.0,30.0
TST,1,4.0,40.0
TST,1,5.0,50.0
";
        let rdr = ReaderBuilder::new().trim(Trim::All).from_reader(csv.as_bytes());
        let figures = parse_figures_from_reader(rdr).unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].polylines.len(), 2);
        assert_eq!(figures[0].polylines[0].len(), 2);
        assert_eq!(figures[0].polylines[1].len(), 3);
        // RA hours converted to degrees
        assert!(approx(figures[0].polylines[0][0].ra_deg(), 15.0, 1e-4));
    }

    #[test]
    fn name_lookup_is_partial_and_case_insensitive() {
        let catalog = FigureCatalog::load(None).unwrap();
        let hits = catalog.find_by_name("urs");
        assert!(hits.iter().any(|f| f.id == "UMA"));
        assert!(catalog.find_by_name("").is_empty());
    }

    #[test]
    fn abbreviation_table_resolves_and_falls_back() {
        assert_eq!(constellation_name("ORI"), "Orion");
        assert_eq!(constellation_name("CMA"), "Canis Major");
        assert_eq!(constellation_name("XYZ"), "XYZ");
    }
}
