//! Low-precision solar-system ephemeris from mean orbital elements.
//!
//! Positions come from classical mean elements with a Kepler-equation solve,
//! good to a fraction of a degree for the Sun and planets and a couple of
//! degrees for the Moon (perturbation terms are omitted) — plenty for
//! placing markers on a sky map.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::layers::planets::{Ephemeris, EphemerisError, SolarSystemBody};
use crate::types::GeocentricCoords;

/// Julian date of the Unix epoch.
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// Element epoch: 2000 January 0.0.
const JD_ELEMENT_EPOCH: f64 = 2_451_543.5;

const DEG: f64 = 180.0 / std::f64::consts::PI;

/// Days since the element epoch.
fn days_since_epoch(instant: SystemTime) -> f64 {
    let secs = match instant.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    };
    JD_UNIX_EPOCH + secs / 86_400.0 - JD_ELEMENT_EPOCH
}

/// Mean obliquity of the ecliptic at `d`, degrees.
fn obliquity(d: f64) -> f64 {
    23.4393 - 3.563e-7 * d
}

/// Osculating orbital elements; angles in degrees, distances in AU.
struct Elements {
    /// Longitude of the ascending node.
    n: f64,
    /// Inclination to the ecliptic.
    i: f64,
    /// Argument of perihelion.
    w: f64,
    /// Semi-major axis.
    a: f64,
    /// Eccentricity.
    e: f64,
    /// Mean anomaly.
    m: f64,
}

fn planet_elements(body: SolarSystemBody, d: f64) -> Option<Elements> {
    let el = match body {
        SolarSystemBody::Mercury => Elements {
            n: 48.3313 + 3.24587e-5 * d,
            i: 7.0047 + 5.0e-8 * d,
            w: 29.1241 + 1.01444e-5 * d,
            a: 0.387098,
            e: 0.205635 + 5.59e-10 * d,
            m: 168.6562 + 4.092_334_436_8 * d,
        },
        SolarSystemBody::Venus => Elements {
            n: 76.6799 + 2.4659e-5 * d,
            i: 3.3946 + 2.75e-8 * d,
            w: 54.8910 + 1.38374e-5 * d,
            a: 0.723330,
            e: 0.006773 - 1.302e-9 * d,
            m: 48.0052 + 1.602_130_224_4 * d,
        },
        SolarSystemBody::Mars => Elements {
            n: 49.5574 + 2.11081e-5 * d,
            i: 1.8497 - 1.78e-8 * d,
            w: 286.5016 + 2.92961e-5 * d,
            a: 1.523688,
            e: 0.093405 + 2.516e-9 * d,
            m: 18.6021 + 0.524_020_776_6 * d,
        },
        SolarSystemBody::Jupiter => Elements {
            n: 100.4542 + 2.76854e-5 * d,
            i: 1.3030 - 1.557e-7 * d,
            w: 273.8777 + 1.64505e-5 * d,
            a: 5.20256,
            e: 0.048498 + 4.469e-9 * d,
            m: 19.8950 + 0.083_085_300_1 * d,
        },
        SolarSystemBody::Saturn => Elements {
            n: 113.6634 + 2.3898e-5 * d,
            i: 2.4886 - 1.081e-7 * d,
            w: 339.3939 + 2.97661e-5 * d,
            a: 9.55475,
            e: 0.055546 - 9.499e-9 * d,
            m: 316.9670 + 0.033_444_228_2 * d,
        },
        SolarSystemBody::Uranus => Elements {
            n: 74.0005 + 1.3978e-5 * d,
            i: 0.7733 + 1.9e-8 * d,
            w: 96.6612 + 3.0565e-5 * d,
            a: 19.18171 - 1.55e-8 * d,
            e: 0.047318 + 7.45e-9 * d,
            m: 142.5905 + 0.011_725_806 * d,
        },
        SolarSystemBody::Neptune => Elements {
            n: 131.7806 + 3.0173e-5 * d,
            i: 1.7700 - 2.55e-7 * d,
            w: 272.8461 - 6.027e-6 * d,
            a: 30.05826 + 3.313e-8 * d,
            e: 0.008606 + 2.15e-9 * d,
            m: 260.2471 + 0.005_995_147 * d,
        },
        SolarSystemBody::Pluto => Elements {
            n: 110.297,
            i: 17.140,
            w: 113.768,
            a: 39.48,
            e: 0.2488,
            m: 14.53 + 0.003_964 * d,
        },
        _ => return None,
    };
    Some(el)
}

/// Solve Kepler's equation E − e·sin E = M by Newton iteration, degrees.
fn eccentric_anomaly(
    m: f64,
    e: f64,
    body: &'static str,
) -> Result<f64, EphemerisError> {
    let m = m.rem_euclid(360.0);
    let m_rad = m.to_radians();
    let mut ea = m + DEG * e * m_rad.sin() * (1.0 + e * m_rad.cos());

    for _ in 0..30 {
        let ea_rad = ea.to_radians();
        let delta = (ea - DEG * e * ea_rad.sin() - m) / (1.0 - e * ea_rad.cos());
        ea -= delta;
        if delta.abs() < 1e-7 {
            return Ok(ea);
        }
    }
    Err(EphemerisError::NoConvergence {
        body,
        mean_anomaly_deg: m,
    })
}

/// True anomaly and distance from the eccentric anomaly.
fn position_in_orbit(ea: f64, e: f64, a: f64) -> (f64, f64) {
    let ea_rad = ea.to_radians();
    let xv = a * (ea_rad.cos() - e);
    let yv = a * (1.0 - e * e).sqrt() * ea_rad.sin();
    (yv.atan2(xv).to_degrees(), xv.hypot(yv))
}

/// Heliocentric ecliptic rectangular coordinates.
fn heliocentric(el: &Elements, body: &'static str) -> Result<[f64; 3], EphemerisError> {
    let ea = eccentric_anomaly(el.m, el.e, body)?;
    let (v, r) = position_in_orbit(ea, el.e, el.a);

    let (sin_n, cos_n) = el.n.to_radians().sin_cos();
    let (sin_vw, cos_vw) = (v + el.w).to_radians().sin_cos();
    let (sin_i, cos_i) = el.i.to_radians().sin_cos();

    Ok([
        r * (cos_n * cos_vw - sin_n * sin_vw * cos_i),
        r * (sin_n * cos_vw + cos_n * sin_vw * cos_i),
        r * sin_vw * sin_i,
    ])
}

/// Geocentric ecliptic position of the Sun (z = 0), AU.
fn sun_geocentric(d: f64) -> Result<[f64; 3], EphemerisError> {
    let w = 282.9404 + 4.70935e-5 * d;
    let e = 0.016709 - 1.151e-9 * d;
    let m = 356.0470 + 0.985_600_258_5 * d;

    let ea = eccentric_anomaly(m, e, "Sun")?;
    let (v, r) = position_in_orbit(ea, e, 1.0);
    let lon = (v + w).to_radians();
    Ok([r * lon.cos(), r * lon.sin(), 0.0])
}

/// Geocentric ecliptic position of the Moon, Earth radii.
fn moon_geocentric(d: f64) -> Result<[f64; 3], EphemerisError> {
    let el = Elements {
        n: 125.1228 - 0.052_953_808_3 * d,
        i: 5.1454,
        w: 318.0634 + 0.164_357_322_3 * d,
        a: 60.2666,
        e: 0.054900,
        m: 115.3654 + 13.064_992_950_9 * d,
    };
    heliocentric(&el, "Moon")
}

/// Rotate ecliptic rectangular coordinates to equatorial RA/Dec.
fn ecliptic_to_equatorial(pos: [f64; 3], d: f64) -> GeocentricCoords {
    let (sin_e, cos_e) = obliquity(d).to_radians().sin_cos();
    let [x, y, z] = pos;
    let xe = x;
    let ye = y * cos_e - z * sin_e;
    let ze = y * sin_e + z * cos_e;

    let ra = ye.atan2(xe).to_degrees().rem_euclid(360.0);
    let dec = ze.atan2(xe.hypot(ye)).to_degrees();
    GeocentricCoords::from_degrees(ra as f32, dec as f32)
}

/// Mean-elements ephemeris for all catalog bodies except Earth.
#[derive(Debug, Default)]
pub struct MeanElementsEphemeris;

impl MeanElementsEphemeris {
    pub fn new() -> Self {
        Self
    }
}

impl Ephemeris for MeanElementsEphemeris {
    fn apparent_position(
        &self,
        body: SolarSystemBody,
        instant: SystemTime,
    ) -> Result<GeocentricCoords, EphemerisError> {
        let d = days_since_epoch(instant);

        let geocentric = match body {
            SolarSystemBody::Earth => {
                return Err(EphemerisError::UnsupportedBody("Earth"));
            }
            SolarSystemBody::Sun => sun_geocentric(d)?,
            SolarSystemBody::Moon => moon_geocentric(d)?,
            planet => {
                let el = planet_elements(planet, d)
                    .ok_or(EphemerisError::UnsupportedBody(planet.display_name()))?;
                let helio = heliocentric(&el, planet.display_name())?;
                let sun = sun_geocentric(d)?;
                [helio[0] + sun[0], helio[1] + sun[1], helio[2] + sun[2]]
            }
        };

        Ok(ecliptic_to_equatorial(geocentric, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;
    use std::time::Duration;

    /// 2000-01-01 12:00 UTC
    const J2000_UNIX: u64 = 946_728_000;
    /// 2000-03-20 07:35 UTC, the March equinox
    const EQUINOX_2000_UNIX: u64 = 953_537_700;

    fn at(unix: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(unix)
    }

    fn position(body: SolarSystemBody, unix: u64) -> GeocentricCoords {
        MeanElementsEphemeris::new()
            .apparent_position(body, at(unix))
            .unwrap()
    }

    #[test]
    fn sun_position_at_j2000_matches_the_almanac() {
        let sun = position(SolarSystemBody::Sun, J2000_UNIX);
        assert!(approx(sun.ra_deg(), 281.29, 0.5), "ra = {}", sun.ra_deg());
        assert!(approx(sun.dec_deg(), -23.03, 0.5), "dec = {}", sun.dec_deg());
    }

    #[test]
    fn sun_crosses_the_equator_at_the_march_equinox() {
        let sun = position(SolarSystemBody::Sun, EQUINOX_2000_UNIX);
        let equinox_point = GeocentricCoords::from_degrees(0.0, 0.0);
        assert!(
            sun.angular_distance_to(&equinox_point) < 1.5,
            "sun at ({}, {})",
            sun.ra_deg(),
            sun.dec_deg()
        );
    }

    #[test]
    fn every_body_except_earth_resolves() {
        let eph = MeanElementsEphemeris::new();
        for body in SolarSystemBody::ALL {
            let result = eph.apparent_position(body, at(J2000_UNIX));
            if body == SolarSystemBody::Earth {
                assert!(matches!(result, Err(EphemerisError::UnsupportedBody(_))));
            } else {
                let coords = result.unwrap_or_else(|e| panic!("{body:?}: {e}"));
                assert!(coords.ra_deg().is_finite());
                assert!(coords.dec_deg().is_finite());
            }
        }
    }

    #[test]
    fn inner_planets_stay_near_the_sun() {
        // Maximum elongation: Mercury ~28°, Venus ~47°
        for unix in (0..8).map(|k| J2000_UNIX + k * 73 * 86_400) {
            let sun = position(SolarSystemBody::Sun, unix);
            let mercury = position(SolarSystemBody::Mercury, unix);
            let venus = position(SolarSystemBody::Venus, unix);
            assert!(sun.angular_distance_to(&mercury) < 30.0);
            assert!(sun.angular_distance_to(&venus) < 48.5);
        }
    }

    #[test]
    fn moon_advances_roughly_thirteen_degrees_per_day() {
        let day = 86_400u64;
        for k in 0..5 {
            let t0 = J2000_UNIX + k * 6 * day;
            let m0 = position(SolarSystemBody::Moon, t0);
            let m1 = position(SolarSystemBody::Moon, t0 + day);
            let step = m0.angular_distance_to(&m1);
            assert!((10.0..18.0).contains(&step), "daily motion {step}");
        }
    }

    #[test]
    fn planets_keep_to_the_zodiac_band() {
        for unix in (0..6).map(|k| J2000_UNIX + k * 400 * 86_400) {
            for body in [
                SolarSystemBody::Mercury,
                SolarSystemBody::Venus,
                SolarSystemBody::Mars,
                SolarSystemBody::Jupiter,
                SolarSystemBody::Saturn,
                SolarSystemBody::Uranus,
                SolarSystemBody::Neptune,
            ] {
                let p = position(body, unix);
                assert!(p.dec_deg().abs() < 33.0, "{body:?} dec {}", p.dec_deg());
            }
            // Pluto's orbit is far more inclined
            let pluto = position(SolarSystemBody::Pluto, unix);
            assert!(pluto.dec_deg().abs() < 48.0);
        }
    }

    #[test]
    fn kepler_solver_converges_for_high_eccentricity() {
        let ea = eccentric_anomaly(5.0, 0.6, "test").unwrap();
        // E − e·sin E reproduces M
        let residual = ea - DEG * 0.6 * ea.to_radians().sin() - 5.0;
        assert!(approx(residual as f32, 0.0, 1e-5));
    }
}
