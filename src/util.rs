use std::path::Path;

use float_ord::FloatOrd;
use geo::{
    point, Area, BoundingRect, Contains, Coord, EuclideanLength, HasDimensions, LineString,
    MapCoords, MinimumRotatedRect, Polygon, Translate,
};
use geo_clipper::{Clipper, EndType, JoinType};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, Rgb};
use imageproc::point::Point;
use ndarray::{s, Array3, ArrayView2, Axis};
use ort::{GraphOptimizationLevel, Session};
use tracing::instrument;

use crate::{error::PredictError, result::TextBox};

pub(crate) fn build_session(path: &Path, num_threads: usize) -> ort::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_parallel_execution(true)?
        .with_inter_threads(num_threads)?
        .with_intra_threads(num_threads)?
        .commit_from_file(path)?;
    log::debug!("{} inputs: {:?}", path.display(), session.inputs);
    log::debug!("{} outputs: {:?}", path.display(), session.outputs);
    Ok(session)
}

pub(crate) fn no_outputs() -> PredictError {
    PredictError::data_shape("model produced no outputs")
}

#[instrument(level = "debug", skip(image))]
pub(crate) fn subtract_mean_normalize(
    image: &DynamicImage,
    mean_vals: &[f32; 3],
    norm_vals: &[f32; 3],
) -> Array3<f32> {
    let mut image = image.to_rgb32f();
    let norm = Rgb::<f32>(*norm_vals);
    let mean_vals = Rgb::<f32>(*mean_vals).map2(&norm, |c1, c2| c1 * c2);
    for pixel in image.pixels_mut() {
        *pixel = pixel
            .map2(&norm, |c1, c2| c1 * c2)
            .map2(&mean_vals, |c1, c2| c1 - c2);
    }
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(ch, y, x)| image.get_pixel(x as u32, y as u32).channels()[ch],
    )
}

pub(crate) fn to_luma_image(data: ArrayView2<f32>) -> Result<GrayImage, PredictError> {
    let height = data.len_of(Axis(0));
    let width = data.len_of(Axis(1));
    let pixel_data = data
        .axis_iter(Axis(0))
        .flat_map(|it| it.into_iter())
        .map(|p| (p * 255.0) as u8)
        .collect::<Vec<u8>>();
    ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
        .ok_or_else(|| PredictError::data_shape("probability map does not fit its dimensions"))
}

pub(crate) fn to_geo_poly(points: &[Point<i32>]) -> Polygon<f32> {
    let points = points
        .iter()
        .map(|point| Coord {
            x: point.x as f32,
            y: point.y as f32,
        })
        .collect();
    Polygon::new(LineString::new(points), vec![])
}

pub(crate) fn max_side(rect: &Polygon<f32>) -> f32 {
    rect.exterior()
        .lines()
        .map(|it| it.euclidean_length() as i32)
        .max()
        .unwrap_or(0) as f32
}

pub(crate) fn box_score_fast(rect: &Polygon<f32>, pred_data: ArrayView2<f32>) -> f32 {
    let Some(bounds) = rect.bounding_rect() else {
        return 0.0;
    };
    let (height, width) = pred_data.dim();
    let min_x = (bounds.min().x.max(0.0) as usize).min(width);
    let min_y = (bounds.min().y.max(0.0) as usize).min(height);
    let max_x = (bounds.max().x.max(0.0) as usize).clamp(min_x, width);
    let max_y = (bounds.max().y.max(0.0) as usize).clamp(min_y, height);

    let sliced = pred_data.slice(s![min_y..max_y, min_x..max_x]);
    let local_rect = rect.translate(-(min_x as f32), -(min_y as f32));

    let contained_values = sliced
        .indexed_iter()
        .filter(|((y, x), _)| local_rect.contains(&point![x: *x as f32, y: *y as f32]))
        .map(|(_, value)| *value)
        .collect::<Vec<_>>();

    if contained_values.is_empty() {
        return 0.0;
    }
    let len = contained_values.len() as f32;
    contained_values.into_iter().sum::<f32>() / len
}

pub(crate) fn unclip(rect: Polygon<f32>, unclip_ratio: f32) -> Option<Polygon<f32>> {
    let distance = (rect.unsigned_area() * unclip_ratio) / rect.exterior().euclidean_length();

    let clipped_rect = rect.offset(distance, JoinType::Round(0.25), EndType::ClosedPolygon, 1.0);

    if clipped_rect.is_empty() {
        None
    } else {
        clipped_rect.minimum_rotated_rect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub factor_x: f32,
    pub factor_y: f32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Detector input size: longest side capped at `target_size`, both sides
/// floored to a multiple of 32.
pub fn scale_normalized(image: &DynamicImage, target_size: u32) -> Scale {
    let aspect_ratio = image.width() as f32 / image.height() as f32;
    let (mut target_width, mut target_height) = if aspect_ratio >= 1.0 {
        let width = image.width().min(target_size);
        let height = (width as f32 / aspect_ratio) as u32;
        (width, height)
    } else {
        let height = image.height().min(target_size);
        let width = (height as f32 * aspect_ratio) as u32;
        (width, height)
    };
    if target_width % 32 != 0 {
        let new_width = (target_width / 32 * 32).max(32);
        log::debug!(
            "Target width of {target_width} wasn't a multiple of 32, flooring to {new_width}."
        );
        target_width = new_width;
    }
    if target_height % 32 != 0 {
        let new_height = (target_height / 32 * 32).max(32);
        log::debug!(
            "Target height of {target_height} wasn't a multiple of 32, flooring to {new_height}."
        );
        target_height = new_height;
    }
    let scale_x = image.width() as f32 / target_width as f32;
    let scale_y = image.height() as f32 / target_height as f32;
    log::debug!("Resize will change image dimensions from (w: {}, h: {}) to (w: {target_width}, h: {target_height}) with scaling factor ({scale_x}, {scale_y}).", image.width(), image.height());
    Scale {
        target_width,
        target_height,
        factor_x: scale_x,
        factor_y: scale_y,
    }
}

/// Reorders the corners of a rotated rectangle to top-left, top-right,
/// bottom-right, bottom-left so that edge 0 to 1 is the top of the text.
pub(crate) fn order_corners(rect: &Polygon<f32>) -> Polygon<f32> {
    let mut corners = rect.exterior().0.iter().copied().take(4).collect::<Vec<_>>();
    if corners.len() < 4 {
        return rect.clone();
    }
    corners.sort_by_key(|corner| FloatOrd(corner.x));
    let upper_first = |a: Coord<f32>, b: Coord<f32>| {
        if a.y <= b.y {
            (a, b)
        } else {
            (b, a)
        }
    };
    let (top_left, bottom_left) = upper_first(corners[0], corners[1]);
    let (top_right, bottom_right) = upper_first(corners[2], corners[3]);
    Polygon::new(
        LineString::new(vec![top_left, top_right, bottom_right, bottom_left]),
        vec![],
    )
}

/// Clamps every vertex of a detection polygon into the image.
pub(crate) fn clamp_to_image(rect: &Polygon<f32>, width: u32, height: u32) -> Polygon<f32> {
    rect.map_coords(|Coord { x, y }| Coord {
        x: x.clamp(0.0, width as f32),
        y: y.clamp(0.0, height as f32),
    })
}

/// `[x1, y1, x2, y2]` corners of the axis-aligned box around a polygon.
pub(crate) fn enclosing_box(rect: &Polygon<f32>) -> [f32; 4] {
    match rect.bounding_rect() {
        Some(bounds) => [
            bounds.min().x,
            bounds.min().y,
            bounds.max().x,
            bounds.max().y,
        ],
        None => [0.0; 4],
    }
}

/// Orders boxes top to bottom, then left to right within a row.
pub(crate) fn sort_reading_order(boxes: &mut [TextBox]) {
    const SAME_ROW: f32 = 10.0;

    let top_left = |text_box: &TextBox| {
        text_box
            .rect
            .bounding_rect()
            .map(|bounds| bounds.min())
            .unwrap_or_else(Coord::zero)
    };
    boxes.sort_by_key(|text_box| {
        let corner = top_left(text_box);
        (FloatOrd(corner.y), FloatOrd(corner.x))
    });
    for i in 0..boxes.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let (current, next) = (top_left(&boxes[j]), top_left(&boxes[j + 1]));
            if (next.y - current.y).abs() < SAME_ROW && next.x < current.x {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}

pub(crate) fn part_image(image: &DynamicImage, b_box: &Polygon<f32>) -> DynamicImage {
    let Some(rect) = b_box.bounding_rect() else {
        return image.crop_imm(0, 0, 0, 0);
    };
    let x = (rect.min().x.max(0.0) as u32).min(image.width());
    let y = (rect.min().y.max(0.0) as u32).min(image.height());
    let width = (rect.width() as u32).min(image.width() - x);
    let height = (rect.height() as u32).min(image.height() - y);
    log::trace!("Slicing subimage to {rect:?}");
    image.crop_imm(x, y, width, height)
}
