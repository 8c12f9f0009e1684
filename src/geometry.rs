use kurbo::{Point, Rect};

use crate::{
    config::RenderConfig,
    error::{MapgifError, MapgifResult},
    map::{RawVertex, VertexId},
};

/// Integer pixel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Vertex arena in canvas space, plus the canvas size it was fitted to.
#[derive(Clone, Debug)]
pub struct NormalizedMap {
    points: Vec<PixelPoint>,
    pub width: u32,
    pub height: u32,
    pub border: u32,
    pub scale: f64,
}

impl NormalizedMap {
    /// Normalized position (border excluded); minimum coordinate on each axis is 0.
    pub fn point(&self, v: VertexId) -> PixelPoint {
        self.points[v.index()]
    }

    /// Position on the canvas, border included.
    pub fn canvas_point(&self, v: VertexId) -> PixelPoint {
        let b = self.border as i32;
        self.point(v).offset(b, b)
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }
}

/// Fit raw level vertices into an `image_width`-wide canvas with uniform aspect.
///
/// The larger axis spans exactly `image_width - 2 * border` pixels and the vertical axis is
/// flipped so that level "up" is canvas "up". The input slice is left untouched.
pub fn normalize(vertices: &[RawVertex], cfg: &RenderConfig) -> MapgifResult<NormalizedMap> {
    let flipped = |v: &RawVertex| Point::new(f64::from(v.x), -f64::from(v.y));

    let mut iter = vertices.iter().map(flipped);
    let Some(first) = iter.next() else {
        return Err(MapgifError::geometry("map has no vertices"));
    };
    let bounds = iter.fold(Rect::from_points(first, first), |r, p| r.union_pt(p));

    let extent = bounds.width().max(bounds.height());
    if extent <= 0.0 {
        return Err(MapgifError::geometry(format!(
            "map has zero extent (all {} vertices at {},{})",
            vertices.len(),
            first.x,
            -first.y
        )));
    }

    let scale = f64::from(cfg.inner_width()) / extent;
    let points: Vec<PixelPoint> = vertices
        .iter()
        .map(|v| {
            let p = flipped(v);
            PixelPoint::new(
                ((p.x - bounds.x0) * scale).round() as i32,
                ((p.y - bounds.y0) * scale).round() as i32,
            )
        })
        .collect();

    let y_extent = (bounds.height() * scale).round() as u32;

    Ok(NormalizedMap {
        points,
        width: cfg.image_width,
        // A map lying on one horizontal line has no y extent; without a border that is no rows.
        height: (y_extent + cfg.border * 2).max(1),
        border: cfg.border,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: i32, y: i32) -> RawVertex {
        RawVertex { x, y }
    }

    fn cfg(width: u32, border: u32) -> RenderConfig {
        RenderConfig {
            image_width: width,
            border,
            ..RenderConfig::default()
        }
    }

    fn extents(n: &NormalizedMap) -> (i32, i32, i32, i32) {
        let xs = n.points().iter().map(|p| p.x);
        let ys = n.points().iter().map(|p| p.y);
        (
            xs.clone().min().unwrap(),
            xs.max().unwrap(),
            ys.clone().min().unwrap(),
            ys.max().unwrap(),
        )
    }

    #[test]
    fn wide_map_fills_inner_width() {
        let verts = [v(-500, 30), v(1500, 30), v(1500, 1030), v(-500, 1030)];
        let n = normalize(&verts, &cfg(1024, 8)).unwrap();
        let (x0, x1, y0, y1) = extents(&n);
        assert_eq!((x0, y0), (0, 0));
        assert_eq!(x1, 1008);
        assert_eq!(y1, 504);
        assert_eq!(n.height, 504 + 16);
        assert_eq!(n.width, 1024);
    }

    #[test]
    fn tall_map_uses_vertical_extent_for_scale() {
        let verts = [v(0, 0), v(10, 0), v(10, 333), v(0, 333)];
        let n = normalize(&verts, &cfg(200, 4)).unwrap();
        let (x0, _, y0, y1) = extents(&n);
        assert_eq!((x0, y0), (0, 0));
        assert_eq!(y1, 192);
        assert_eq!(n.height, 200);
    }

    #[test]
    fn vertical_axis_is_inverted() {
        let verts = [v(0, 0), v(0, 100), v(100, 0)];
        let n = normalize(&verts, &cfg(116, 8)).unwrap();
        assert_eq!(n.point(VertexId(1)), PixelPoint::new(0, 0));
        assert_eq!(n.point(VertexId(0)), PixelPoint::new(0, 100));
        assert_eq!(n.canvas_point(VertexId(2)), PixelPoint::new(108, 108));
    }

    #[test]
    fn odd_extents_still_hit_exact_width() {
        let verts = [v(-37, 11), v(1234, -999), v(17, 5)];
        for (w, b) in [(1024, 8), (640, 3), (333, 0), (97, 12)] {
            let n = normalize(&verts, &cfg(w, b)).unwrap();
            let (x0, x1, y0, y1) = extents(&n);
            assert_eq!((x0, y0), (0, 0));
            assert_eq!((x1 - x0).max(y1 - y0), (w - 2 * b) as i32);
        }
    }

    #[test]
    fn flat_map_without_border_keeps_one_row() {
        let verts = [v(0, 0), v(64, 0)];
        let n = normalize(&verts, &cfg(64, 0)).unwrap();
        assert_eq!(n.height, 1);
        assert_eq!(n.point(VertexId(1)), PixelPoint::new(64, 0));
    }

    #[test]
    fn degenerate_maps_are_geometry_errors() {
        assert!(matches!(
            normalize(&[], &cfg(64, 2)),
            Err(MapgifError::Geometry(_))
        ));
        assert!(matches!(
            normalize(&[v(5, 5), v(5, 5)], &cfg(64, 2)),
            Err(MapgifError::Geometry(_))
        ));
    }

    #[test]
    fn single_axis_maps_are_fine() {
        let n = normalize(&[v(0, 7), v(50, 7)], &cfg(60, 5)).unwrap();
        assert_eq!(n.height, 10);
        assert_eq!(n.point(VertexId(1)), PixelPoint::new(50, 0));
    }
}
