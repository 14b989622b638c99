use glam::Vec3;

/// Equatorial coordinates on the celestial sphere.
///
/// Right ascension is stored in degrees, normalized to `[0, 360)`; declination
/// is stored in degrees, clamped to `[-90, 90]`. Out-of-range constructor
/// inputs are coerced rather than rejected, so a value of this type is always
/// a valid position on the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocentricCoords {
    ra_deg: f32,
    dec_deg: f32,
}

impl GeocentricCoords {
    pub fn from_degrees(ra_deg: f32, dec_deg: f32) -> Self {
        Self {
            ra_deg: normalize_ra(ra_deg),
            dec_deg: dec_deg.clamp(-90.0, 90.0),
        }
    }

    /// RA given in hours (24h = 360°).
    pub fn from_hours(ra_hours: f32, dec_deg: f32) -> Self {
        Self::from_degrees(hours_to_degrees(ra_hours), dec_deg)
    }

    pub fn from_radians(ra_rad: f32, dec_rad: f32) -> Self {
        Self::from_degrees(ra_rad.to_degrees(), dec_rad.to_degrees())
    }

    /// Recover RA/Dec from a direction vector.
    ///
    /// The vector is assumed to be close to unit length. At the poles
    /// (x = y = 0) the RA is indeterminate and comes back as 0.
    pub fn from_vector3(v: Vec3) -> Self {
        let dec = v.z.clamp(-1.0, 1.0).asin().to_degrees();
        let ra = v.y.atan2(v.x).to_degrees();
        Self::from_degrees(ra, dec)
    }

    pub fn ra_deg(&self) -> f32 {
        self.ra_deg
    }

    pub fn ra_hours(&self) -> f32 {
        self.ra_deg / 15.0
    }

    pub fn ra_radians(&self) -> f32 {
        self.ra_deg.to_radians()
    }

    pub fn dec_deg(&self) -> f32 {
        self.dec_deg
    }

    pub fn dec_radians(&self) -> f32 {
        self.dec_deg.to_radians()
    }

    /// Unit vector in the celestial frame: +X toward (RA 0, Dec 0), +Y toward
    /// (RA 90°, Dec 0), +Z toward the north celestial pole.
    pub fn to_vector3(&self) -> Vec3 {
        let ra = self.ra_deg.to_radians();
        let dec = self.dec_deg.to_radians();
        Vec3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
    }

    /// Great-circle separation in degrees (Haversine), in `[0, 180]`.
    pub fn angular_distance_to(&self, other: &GeocentricCoords) -> f32 {
        let ra1 = self.ra_deg.to_radians() as f64;
        let dec1 = self.dec_deg.to_radians() as f64;
        let ra2 = other.ra_deg.to_radians() as f64;
        let dec2 = other.dec_deg.to_radians() as f64;

        let d_ra = ra2 - ra1;
        let d_dec = dec2 - dec1;
        let a = (d_dec / 2.0).sin().powi(2)
            + dec1.cos() * dec2.cos() * (d_ra / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        c.to_degrees() as f32
    }
}

fn normalize_ra(ra: f32) -> f32 {
    let r = ra.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}

/// Billboard shape tag carried by point primitives and resolved in the
/// fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Star,
    Diamond,
    Square,
    Triangle,
    Cross,
}

impl Shape {
    /// Shader-side shape code.
    pub fn code(&self) -> u32 {
        match self {
            Shape::Circle => 0,
            Shape::Star => 1,
            Shape::Diamond => 2,
            Shape::Square => 3,
            Shape::Triangle => 4,
            Shape::Cross => 5,
        }
    }
}

/// Unpack a packed `0xAARRGGBB` color into normalized `[r, g, b, a]`.
pub fn unpack_argb(color: u32) -> [f32; 4] {
    [
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        (color & 0xFF) as f32 / 255.0,
        ((color >> 24) & 0xFF) as f32 / 255.0,
    ]
}

// Small helpers used by multiple modules
pub fn parse_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    s.parse::<T>().unwrap_or(default)
}

pub fn hours_to_degrees(hours: f32) -> f32 {
    hours * 15.0
}
