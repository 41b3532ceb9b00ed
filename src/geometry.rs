use float_ord::FloatOrd;
use geo::{BoundingRect, Coord, LineString, Polygon};

/// Four corner points of a detected region, not necessarily axis-aligned.
pub type Quad = [Coord<f32>; 4];

/// Axis-aligned box in image pixel coordinates.
///
/// Always has positive width and height; constructors return `None` instead
/// of producing a degenerate box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Option<Self> {
        // Written so that NaN coordinates are rejected as well.
        if !(right > left && bottom > top) {
            return None;
        }
        Some(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Box spanning a whole image of the given size.
    pub fn page(width: u32, height: u32) -> Option<Self> {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Enclosing axis-aligned box of a quad, `None` when it has no area.
pub fn quad_to_bbox(quad: &Quad) -> Option<BoundingBox> {
    let rect = LineString::from(quad.to_vec()).bounding_rect()?;
    BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
}

/// Box from `[x1, y1, x2, y2]` corners, `None` when it has no area.
pub fn box_array_to_bbox(corners: &[f32; 4]) -> Option<BoundingBox> {
    let [x1, y1, x2, y2] = *corners;
    BoundingBox::new(x1, y1, x2, y2)
}

/// Median angle in degrees of the top edges (vertex 0 to vertex 1) of the
/// given polygons.
///
/// Edges spanning less than one pixel horizontally are ignored. Returns 0.0
/// when no edge qualifies.
pub fn estimate_skew_angle(polygons: &[Polygon<f32>]) -> f32 {
    let mut angles = polygons
        .iter()
        .filter_map(|poly| {
            let coords = &poly.exterior().0;
            if coords.len() < 2 {
                return None;
            }
            let dx = coords[1].x - coords[0].x;
            let dy = coords[1].y - coords[0].y;
            (dx.abs() >= 1.0).then(|| dy.atan2(dx).to_degrees())
        })
        .collect::<Vec<_>>();

    if angles.is_empty() {
        return 0.0;
    }

    angles.sort_by_key(|angle| FloatOrd(*angle));
    let mid = angles.len() / 2;
    if angles.len() % 2 == 0 {
        (angles[mid - 1] + angles[mid]) / 2.0
    } else {
        angles[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: f32, y: f32) -> Coord<f32> {
        Coord { x, y }
    }

    fn top_edge(dx: f32, dy: f32) -> Polygon<f32> {
        Polygon::new(
            LineString::new(vec![
                coord(100.0, 100.0),
                coord(100.0 + dx, 100.0 + dy),
                coord(100.0 + dx, 130.0 + dy),
                coord(100.0, 130.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn quad_encloses_rotated_points() {
        let quad = [
            coord(12.0, 5.0),
            coord(40.0, 9.0),
            coord(38.0, 30.0),
            coord(10.0, 26.0),
        ];
        let bbox = quad_to_bbox(&quad).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                left: 10.0,
                top: 5.0,
                right: 40.0,
                bottom: 30.0
            }
        );
    }

    #[test]
    fn degenerate_quads_are_none() {
        let flat = [
            coord(0.0, 10.0),
            coord(20.0, 10.0),
            coord(20.0, 10.0),
            coord(0.0, 10.0),
        ];
        assert!(quad_to_bbox(&flat).is_none());

        let point = [coord(5.0, 5.0); 4];
        assert!(quad_to_bbox(&point).is_none());
    }

    #[test]
    fn box_array_degeneracy() {
        assert!(box_array_to_bbox(&[10.0, 10.0, 10.0, 40.0]).is_none());
        assert!(box_array_to_bbox(&[10.0, 40.0, 200.0, 10.0]).is_none());
        assert!(box_array_to_bbox(&[200.0, 10.0, 10.0, 40.0]).is_none());

        let bbox = box_array_to_bbox(&[10.0, 10.0, 200.0, 40.0]).unwrap();
        assert!(bbox.right > bbox.left && bbox.bottom > bbox.top);
        assert_eq!(bbox.width(), 190.0);
        assert_eq!(bbox.height(), 30.0);
    }

    #[test]
    fn skew_of_nothing_is_zero() {
        assert_eq!(estimate_skew_angle(&[]), 0.0);
    }

    #[test]
    fn horizontal_edges_have_no_skew() {
        let polys = vec![top_edge(50.0, 0.0), top_edge(120.0, 0.0)];
        assert_eq!(estimate_skew_angle(&polys), 0.0);
    }

    #[test]
    fn diagonal_edge_is_45_degrees() {
        let angle = estimate_skew_angle(&[top_edge(10.0, 10.0)]);
        assert!((angle - 45.0).abs() < 1e-4);
    }

    #[test]
    fn median_ignores_outlier() {
        let mut polys = (0..9).map(|_| top_edge(80.0, 0.0)).collect::<Vec<_>>();
        let rad = 80f32.to_radians();
        polys.push(top_edge(50.0 * rad.cos(), 50.0 * rad.sin()));
        assert_eq!(estimate_skew_angle(&polys), 0.0);
    }

    #[test]
    fn even_count_averages_middle_values() {
        let polys = vec![
            top_edge(10.0, 0.0),
            top_edge(10.0, 10.0),
            top_edge(10.0, -10.0),
            top_edge(10.0, 10.0),
        ];
        // Sorted: -45, 0, 45, 45.
        assert!((estimate_skew_angle(&polys) - 22.5).abs() < 1e-4);
    }

    #[test]
    fn near_vertical_edges_are_skipped() {
        let polys = vec![top_edge(0.5, 40.0), top_edge(0.0, 40.0)];
        assert_eq!(estimate_skew_angle(&polys), 0.0);

        let polys = vec![top_edge(0.5, 40.0), top_edge(10.0, 10.0)];
        assert!((estimate_skew_angle(&polys) - 45.0).abs() < 1e-4);
    }
}
