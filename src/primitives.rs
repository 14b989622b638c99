//! Renderable primitives produced by layers and consumed by the batch
//! renderers: points (stars, planets), polylines (grid, figures), and text
//! labels.

use thiserror::Error;

use crate::types::{GeocentricCoords, Shape};

pub const DEFAULT_POINT_COLOR: u32 = 0xFFFFFFFF;
pub const DEFAULT_POINT_SIZE: u32 = 3;
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

#[derive(Debug, Error, PartialEq)]
pub enum PrimitiveError {
    #[error("label text must not be empty")]
    EmptyLabelText,
}

/// A single point on the sphere: location, packed ARGB color, diameter hint
/// in pixels at the default zoom, and a shape tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPrimitive {
    location: GeocentricCoords,
    color: u32,
    size: u32,
    shape: Shape,
}

impl PointPrimitive {
    pub fn new(location: GeocentricCoords, color: u32, size: u32, shape: Shape) -> Self {
        Self {
            location,
            color,
            size,
            shape,
        }
    }

    pub fn from_degrees(ra_deg: f32, dec_deg: f32, color: u32, size: u32) -> Self {
        Self::new(
            GeocentricCoords::from_degrees(ra_deg, dec_deg),
            color,
            size,
            Shape::Circle,
        )
    }

    pub fn location(&self) -> GeocentricCoords {
        self.location
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn with_color(self, color: u32) -> Self {
        Self { color, ..self }
    }

    pub fn with_alpha(self, alpha: u8) -> Self {
        Self {
            color: ((alpha as u32) << 24) | (self.color & 0x00FF_FFFF),
            ..self
        }
    }
}

impl Default for PointPrimitive {
    fn default() -> Self {
        Self::new(
            GeocentricCoords::from_degrees(0.0, 0.0),
            DEFAULT_POINT_COLOR,
            DEFAULT_POINT_SIZE,
            Shape::Circle,
        )
    }
}

/// An ordered polyline on the sphere. Vertices are appended during layer
/// population; a line with n vertices renders as n − 1 segments.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrimitive {
    vertices: Vec<GeocentricCoords>,
    color: u32,
    width: f32,
}

impl LinePrimitive {
    pub fn new(color: u32, width: f32) -> Self {
        Self {
            vertices: Vec::new(),
            color,
            width,
        }
    }

    pub fn with_vertices(color: u32, width: f32, vertices: Vec<GeocentricCoords>) -> Self {
        Self {
            vertices,
            color,
            width,
        }
    }

    pub fn add_vertex(&mut self, ra_deg: f32, dec_deg: f32) {
        self.vertices
            .push(GeocentricCoords::from_degrees(ra_deg, dec_deg));
    }

    pub fn push(&mut self, vertex: GeocentricCoords) {
        self.vertices.push(vertex);
    }

    pub fn vertices(&self) -> &[GeocentricCoords] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }
}

/// A text label anchored to a sphere position. The offset displaces the
/// rendered billboard in the "down" tangent direction so the text clears the
/// point it annotates.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPrimitive {
    location: GeocentricCoords,
    text: String,
    color: u32,
    font_size: f32,
    offset: f32,
}

impl LabelPrimitive {
    pub fn new(
        location: GeocentricCoords,
        text: impl Into<String>,
        color: u32,
    ) -> Result<Self, PrimitiveError> {
        Self::with_style(location, text, color, DEFAULT_FONT_SIZE, 0.0)
    }

    pub fn with_style(
        location: GeocentricCoords,
        text: impl Into<String>,
        color: u32,
        font_size: f32,
        offset: f32,
    ) -> Result<Self, PrimitiveError> {
        let text = text.into();
        if text.is_empty() {
            return Err(PrimitiveError::EmptyLabelText);
        }
        Ok(Self {
            location,
            text,
            color,
            font_size,
            offset,
        })
    }

    pub fn location(&self) -> GeocentricCoords {
        self.location
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;

    #[test]
    fn point_accessors_and_with_color() {
        let p = PointPrimitive::from_degrees(10.0, 20.0, 0xFF112233, 5);
        assert!(approx(p.location().ra_deg(), 10.0, 1e-5));
        assert_eq!(p.size(), 5);
        assert_eq!(p.shape(), Shape::Circle);
        assert_eq!(p.with_color(0xFF445566).color(), 0xFF445566);
    }

    #[test]
    fn point_with_alpha_preserves_rgb() {
        let p = PointPrimitive::from_degrees(0.0, 0.0, 0xFF112233, 3).with_alpha(0x20);
        assert_eq!(p.color(), 0x20112233);
    }

    #[test]
    fn line_segment_count_is_vertices_minus_one() {
        let mut line = LinePrimitive::new(0x40FFFFFF, 1.0);
        assert_eq!(line.segment_count(), 0);
        line.add_vertex(0.0, 0.0);
        assert_eq!(line.segment_count(), 0);
        line.add_vertex(10.0, 0.0);
        line.add_vertex(20.0, 0.0);
        assert_eq!(line.vertex_count(), 3);
        assert_eq!(line.segment_count(), 2);
    }

    #[test]
    fn line_vertices_are_normalized_on_insert() {
        let mut line = LinePrimitive::new(0x40FFFFFF, 1.0);
        line.add_vertex(370.0, 100.0);
        let v = line.vertices()[0];
        assert!(approx(v.ra_deg(), 10.0, 1e-4));
        assert!(approx(v.dec_deg(), 90.0, 1e-6));
    }

    #[test]
    fn empty_label_text_is_rejected_at_construction() {
        let loc = GeocentricCoords::from_degrees(0.0, 0.0);
        let err = LabelPrimitive::new(loc, "", 0xFFFFFFFF);
        assert_eq!(err.unwrap_err(), PrimitiveError::EmptyLabelText);
    }

    #[test]
    fn label_styling_is_carried() {
        let loc = GeocentricCoords::from_degrees(0.0, 0.0);
        let label = LabelPrimitive::with_style(loc, "Sirius", 0xFFCCCCCC, 18.0, 0.01).unwrap();
        assert_eq!(label.text(), "Sirius");
        assert!(approx(label.font_size(), 18.0, 1e-6));
        assert!(approx(label.offset(), 0.01, 1e-6));
        assert_eq!(label.with_color(0xFF0000FF).color(), 0xFF0000FF);
    }
}
