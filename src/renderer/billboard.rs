//! CPU-side billboard geometry for the batch renderers.
//!
//! Every point and label becomes a quad spanned by two tangent vectors at its
//! unit-sphere position, so the quad faces outward from the sphere center —
//! which is where the camera sits, making the quads effectively camera-facing.
//! Line segments become quads widened along a perpendicular that also faces
//! outward. All of it is plain math over `glam` vectors so it can be tested
//! without a GPU.

use glam::Vec3;

use crate::primitives::{LinePrimitive, PointPrimitive};
use crate::types::unpack_argb;

/// World units per size-hint unit for point billboards.
pub const POINT_WORLD_SCALE: f32 = 0.001;

/// World units per width unit for line quads.
pub const LINE_WORLD_SCALE: f32 = 0.001;

/// World units per atlas pixel for label billboards.
pub const LABEL_WORLD_SCALE: f32 = 0.0001;

/// Below this length a perpendicular is considered degenerate.
const DEGENERATE_EPSILON: f32 = 1e-4;

/// Vertex layout for the point pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
    pub size: f32,
    pub shape: u32,
}

/// Shared vertex layout for the line and label pipelines.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

/// Two unit tangents spanning the billboard plane at `normal`.
///
/// The first axis comes from a cross product with the fixed Y reference;
/// positions nearly aligned with that reference fall back to the X axis so
/// the result is never degenerate.
pub fn billboard_axes(normal: Vec3) -> (Vec3, Vec3) {
    let u = if normal.y.abs() > 0.99 {
        Vec3::X
    } else {
        Vec3::new(normal.z, 0.0, -normal.x).normalize()
    };
    let v = u.cross(normal);
    (u, v)
}

/// Quad corners in BL, TL, BR, TR order around `center`.
pub fn quad_corners(center: Vec3, half_u: Vec3, half_v: Vec3) -> [Vec3; 4] {
    [
        center - half_u - half_v,
        center - half_u + half_v,
        center + half_u - half_v,
        center + half_u + half_v,
    ]
}

/// Index pattern for the `n`-th quad: two CCW triangles over four vertices.
pub fn quad_indices(quad_index: u32) -> [u32; 6] {
    let base = quad_index * 4;
    [base, base + 1, base + 2, base + 1, base + 3, base + 2]
}

/// Four vertices for one point billboard. `size_factor` is the renderer's
/// global scale applied at rebuild time.
pub fn point_vertices(point: &PointPrimitive, size_factor: f32) -> [PointVertex; 4] {
    let center = point.location().to_vector3();
    let (u, v) = billboard_axes(center);
    let half = point.size() as f32 * size_factor * POINT_WORLD_SCALE;
    let corners = quad_corners(center, u * half, v * half);

    let color = unpack_argb(point.color());
    let size = point.size() as f32 * size_factor;
    let shape = point.shape().code();
    let uv = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];

    std::array::from_fn(|i| PointVertex {
        position: corners[i].to_array(),
        color,
        tex_coord: uv[i],
        size,
        shape,
    })
}

/// Perpendicular for a line-segment quad: the cross product of the segment
/// direction with its midpoint pushes the quad to face outward from the
/// sphere. A degenerate cross product falls back to a fixed direction so the
/// geometry never contains NaNs.
pub fn segment_perpendicular(start: Vec3, end: Vec3, half_width: f32) -> Vec3 {
    let direction = end - start;
    let midpoint = (start + end) * 0.5;
    let perp = direction.cross(midpoint);
    let len = perp.length();
    if len < DEGENERATE_EPSILON {
        Vec3::Y * half_width
    } else {
        perp / len * half_width
    }
}

/// Four vertices for one line segment, widened by the perpendicular. UV v
/// runs across the width for the fragment stage's edge falloff.
pub fn segment_vertices(
    start: Vec3,
    end: Vec3,
    color: [f32; 4],
    half_width: f32,
) -> [TexturedVertex; 4] {
    let perp = segment_perpendicular(start, end, half_width);
    let corners = [start - perp, start + perp, end - perp, end + perp];
    let uv = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    std::array::from_fn(|i| TexturedVertex {
        position: corners[i].to_array(),
        color,
        tex_coord: uv[i],
    })
}

/// Expand a polyline into per-segment quads, appending to `vertices` and
/// `indices`. `width_factor` is the renderer's global line-width scale.
pub fn append_line_geometry(
    line: &LinePrimitive,
    width_factor: f32,
    vertices: &mut Vec<TexturedVertex>,
    indices: &mut Vec<u32>,
) {
    if line.vertex_count() < 2 {
        return;
    }
    let color = unpack_argb(line.color());
    let half_width = line.width() * width_factor * LINE_WORLD_SCALE;

    let points = line.vertices();
    for pair in points.windows(2) {
        let start = pair[0].to_vector3();
        let end = pair[1].to_vector3();
        let quad = (vertices.len() / 4) as u32;
        vertices.extend(segment_vertices(start, end, color, half_width));
        indices.extend(quad_indices(quad));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;
    use crate::types::{GeocentricCoords, Shape};

    fn assert_finite(v: Vec3) {
        assert!(v.x.is_finite() && v.y.is_finite() && v.z.is_finite(), "{v:?}");
    }

    #[test]
    fn axes_are_orthonormal_to_the_position() {
        for (ra, dec) in [(0.0, 0.0), (45.0, 30.0), (200.0, -60.0), (350.0, 85.0)] {
            let n = GeocentricCoords::from_degrees(ra, dec).to_vector3();
            let (u, v) = billboard_axes(n);
            assert!(approx(u.length(), 1.0, 1e-5));
            assert!(approx(v.length(), 1.0, 1e-5));
            assert!(approx(u.dot(n), 0.0, 1e-5));
            assert!(approx(v.dot(n), 0.0, 1e-5));
            assert!(approx(u.dot(v), 0.0, 1e-5));
        }
    }

    #[test]
    fn axes_fall_back_near_the_reference_axis() {
        let (u, v) = billboard_axes(Vec3::Y);
        assert_eq!(u, Vec3::X);
        assert_finite(v);
        assert!(approx(v.length(), 1.0, 1e-5));

        let (u_neg, v_neg) = billboard_axes(-Vec3::Y);
        assert_eq!(u_neg, Vec3::X);
        assert_finite(v_neg);
    }

    #[test]
    fn point_quad_is_centered_and_sized() {
        let point = PointPrimitive::new(
            GeocentricCoords::from_degrees(30.0, 40.0),
            0xFF8040C0,
            4,
            Shape::Star,
        );
        let verts = point_vertices(&point, 1.0);
        let center = point.location().to_vector3();

        // Corner average recovers the center
        let mut sum = Vec3::ZERO;
        for v in &verts {
            sum += Vec3::from_array(v.position);
        }
        let mean = sum / 4.0;
        assert!(approx(mean.distance(center), 0.0, 1e-5));

        // Diagonal spans 2·half√2
        let bl = Vec3::from_array(verts[0].position);
        let tr = Vec3::from_array(verts[3].position);
        let half = 4.0 * POINT_WORLD_SCALE;
        assert!(approx(bl.distance(tr), 2.0 * half * 2f32.sqrt(), 1e-5));

        // Attributes carried through
        assert_eq!(verts[0].shape, Shape::Star.code());
        assert!(approx(verts[0].size, 4.0, 1e-6));
        assert!(approx(verts[0].color[3], 1.0, 1e-6));
        assert_eq!(verts[0].tex_coord, [0.0, 0.0]);
        assert_eq!(verts[3].tex_coord, [1.0, 1.0]);
    }

    #[test]
    fn size_factor_scales_the_quad() {
        let point = PointPrimitive::from_degrees(10.0, 10.0, 0xFFFFFFFF, 4);
        let small = point_vertices(&point, 1.0);
        let large = point_vertices(&point, 2.0);
        let d = |v: &[PointVertex; 4]| {
            Vec3::from_array(v[0].position).distance(Vec3::from_array(v[3].position))
        };
        assert!(approx(d(&large), 2.0 * d(&small), 1e-5));
    }

    #[test]
    fn segment_perpendicular_faces_outward_and_scales() {
        let start = GeocentricCoords::from_degrees(0.0, 0.0).to_vector3();
        let end = GeocentricCoords::from_degrees(10.0, 0.0).to_vector3();
        let perp = segment_perpendicular(start, end, 0.5);
        assert!(approx(perp.length(), 0.5, 1e-5));
        // Equatorial segment: the outward-facing perpendicular is polar
        assert!(approx(perp.x, 0.0, 1e-4));
        assert!(approx(perp.y, 0.0, 1e-4));
        assert!(approx(perp.z.abs(), 0.5, 1e-4));
    }

    #[test]
    fn degenerate_segment_uses_the_fallback_direction() {
        let p = GeocentricCoords::from_degrees(10.0, 20.0).to_vector3();
        let perp = segment_perpendicular(p, p, 0.25);
        assert_finite(perp);
        assert_eq!(perp, Vec3::Y * 0.25);

        // Antipodal through the origin also degenerates (midpoint ≈ 0)
        let perp2 = segment_perpendicular(Vec3::X, -Vec3::X, 0.25);
        assert_finite(perp2);
        assert_eq!(perp2, Vec3::Y * 0.25);
    }

    #[test]
    fn quad_indices_follow_the_two_triangle_pattern() {
        assert_eq!(quad_indices(0), [0, 1, 2, 1, 3, 2]);
        assert_eq!(quad_indices(2), [8, 9, 10, 9, 11, 10]);
        // Index space is u32 so quads past the u16 limit keep working
        assert_eq!(quad_indices(20_000)[0], 80_000);
    }

    #[test]
    fn line_geometry_produces_one_quad_per_segment() {
        let mut line = LinePrimitive::new(0x80FF0000, 2.0);
        line.add_vertex(0.0, 0.0);
        line.add_vertex(10.0, 0.0);
        line.add_vertex(20.0, 10.0);

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        append_line_geometry(&line, 1.0, &mut vertices, &mut indices);

        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 12);
        for v in &vertices {
            assert_finite(Vec3::from_array(v.position));
            assert!(approx(v.color[0], 1.0, 1e-6)); // red
            assert!(approx(v.color[3], 128.0 / 255.0, 1e-6));
        }
        // Second quad indexes past the first
        assert_eq!(indices[6], 4);
    }

    #[test]
    fn single_vertex_line_emits_nothing() {
        let mut line = LinePrimitive::new(0xFFFFFFFF, 1.0);
        line.add_vertex(0.0, 0.0);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        append_line_geometry(&line, 1.0, &mut vertices, &mut indices);
        assert!(vertices.is_empty());
        assert!(indices.is_empty());
    }
}
