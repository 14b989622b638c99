//! Solar-system layer: apparent positions of the Sun, Moon, and planets at
//! the layer's observation instant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::layers::{Layer, LayerStore, PopulateLayer, Primitives};
use crate::primitives::{LabelPrimitive, PointPrimitive};
use crate::types::{GeocentricCoords, Shape};

pub const LAYER_ID: &str = "layer_planets";
pub const LAYER_NAME: &str = "Planets";

/// Planets render on top of stars.
pub const DEPTH_ORDER: i32 = 40;

const LABEL_COLOR: u32 = 0xFFFFB74D;
const LABEL_FONT_SIZE: f32 = 13.0;
const LABEL_OFFSET: f32 = 0.03;

const PLANET_POINT_SIZE: u32 = 6;
const SUN_MOON_POINT_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolarSystemBody {
    Sun,
    Moon,
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl SolarSystemBody {
    pub const ALL: [SolarSystemBody; 11] = [
        SolarSystemBody::Sun,
        SolarSystemBody::Moon,
        SolarSystemBody::Mercury,
        SolarSystemBody::Venus,
        SolarSystemBody::Earth,
        SolarSystemBody::Mars,
        SolarSystemBody::Jupiter,
        SolarSystemBody::Saturn,
        SolarSystemBody::Uranus,
        SolarSystemBody::Neptune,
        SolarSystemBody::Pluto,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SolarSystemBody::Sun => "Sun",
            SolarSystemBody::Moon => "Moon",
            SolarSystemBody::Mercury => "Mercury",
            SolarSystemBody::Venus => "Venus",
            SolarSystemBody::Earth => "Earth",
            SolarSystemBody::Mars => "Mars",
            SolarSystemBody::Jupiter => "Jupiter",
            SolarSystemBody::Saturn => "Saturn",
            SolarSystemBody::Uranus => "Uranus",
            SolarSystemBody::Neptune => "Neptune",
            SolarSystemBody::Pluto => "Pluto",
        }
    }

    fn color(&self) -> u32 {
        match self {
            SolarSystemBody::Sun => 0xFFFFD700,
            SolarSystemBody::Moon => 0xFFF4F4F4,
            SolarSystemBody::Mercury => 0xFFB0B0B0,
            SolarSystemBody::Venus => 0xFFE6E6CC,
            SolarSystemBody::Earth => 0xFFFFFFFF,
            SolarSystemBody::Mars => 0xFFFF6347,
            SolarSystemBody::Jupiter => 0xFFD4A574,
            SolarSystemBody::Saturn => 0xFFF4D59E,
            SolarSystemBody::Uranus => 0xFFAFDBF5,
            SolarSystemBody::Neptune => 0xFF5B5DDF,
            SolarSystemBody::Pluto => 0xFFCCBBAA,
        }
    }

    /// Sun and Moon largest, the bright planets next.
    fn point_size(&self) -> u32 {
        match self {
            SolarSystemBody::Sun | SolarSystemBody::Moon => SUN_MOON_POINT_SIZE,
            SolarSystemBody::Venus | SolarSystemBody::Jupiter => PLANET_POINT_SIZE + 2,
            SolarSystemBody::Mars | SolarSystemBody::Saturn => PLANET_POINT_SIZE,
            _ => PLANET_POINT_SIZE - 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("no orbital elements for {0}")]
    UnsupportedBody(&'static str),
    #[error("Kepler solver did not converge for {body} (M={mean_anomaly_deg}°)")]
    NoConvergence {
        body: &'static str,
        mean_anomaly_deg: f64,
    },
}

/// Apparent-position provider for solar-system bodies. Must handle every
/// body except the observer's own.
pub trait Ephemeris: Send + Sync {
    fn apparent_position(
        &self,
        body: SolarSystemBody,
        instant: SystemTime,
    ) -> Result<GeocentricCoords, EphemerisError>;
}

pub struct PlanetsLayer<E> {
    store: LayerStore,
    ephemeris: E,
    /// Observation instant, milliseconds since the Unix epoch.
    observation_ms: AtomicU64,
    show_labels: bool,
}

impl<E: Ephemeris> PlanetsLayer<E> {
    pub fn new(ephemeris: E) -> Self {
        Self::at_time(ephemeris, SystemTime::now())
    }

    pub fn at_time(ephemeris: E, instant: SystemTime) -> Self {
        Self {
            store: LayerStore::new(LAYER_ID, LAYER_NAME, DEPTH_ORDER),
            ephemeris,
            observation_ms: AtomicU64::new(to_millis(instant)),
            show_labels: true,
        }
    }

    pub fn show_labels(mut self, show: bool) -> Self {
        self.show_labels = show;
        self
    }

    /// Change the observation instant and recompute every body.
    pub fn set_time(&self, instant: SystemTime) {
        self.observation_ms.store(to_millis(instant), Ordering::Release);
        self.redraw();
    }

    pub fn observation_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.observation_ms.load(Ordering::Acquire))
    }

    fn add_body(
        &self,
        buf: &mut Primitives,
        body: SolarSystemBody,
        instant: SystemTime,
    ) -> Result<(), EphemerisError> {
        let coords = self.ephemeris.apparent_position(body, instant)?;
        buf.add_point(PointPrimitive::new(
            coords,
            body.color(),
            body.point_size(),
            Shape::Circle,
        ));

        if self.show_labels {
            match LabelPrimitive::with_style(
                coords,
                body.display_name(),
                LABEL_COLOR,
                LABEL_FONT_SIZE,
                LABEL_OFFSET,
            ) {
                Ok(label) => buf.add_label(label),
                Err(err) => log::warn!("skipping label for {}: {err}", body.display_name()),
            }
        }
        Ok(())
    }
}

impl<E: Ephemeris> PopulateLayer for PlanetsLayer<E> {
    fn store(&self) -> &LayerStore {
        &self.store
    }

    fn populate(&self, buf: &mut Primitives) {
        let instant = self.observation_time();

        for body in SolarSystemBody::ALL {
            if body == SolarSystemBody::Earth {
                continue; // the observer's own body
            }
            // One bad body must not take the rest of the sky with it.
            if let Err(err) = self.add_body(buf, body, instant) {
                log::error!("error adding {}: {err}", body.display_name());
            }
        }
    }
}

fn to_millis(instant: SystemTime) -> u64 {
    instant
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
