use std::path::Path;

use geo::{Coord, MinimumRotatedRect, Scale};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use imageproc::{
    contours::find_contours,
    contrast::{threshold_mut, ThresholdType},
    distance_transform::Norm,
    morphology::dilate_mut,
};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    error::PredictError,
    result::TextBox,
    util::{
        self, box_score_fast, build_session, max_side, no_outputs, subtract_mean_normalize,
        order_corners, to_geo_poly, to_luma_image, unclip,
    },
};

const MEAN_VALUES: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_VALUES: [f32; 3] = [1.0 / 0.229, 1.0 / 0.224, 1.0 / 0.225];

const LONG_SIDE_THRESHOLD: f32 = 3.0;
const MAX_CANDIDATES: usize = 1000;

/// Thresholds applied to the detector's probability map.
#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    pub box_score_threshold: f32,
    pub box_threshold: f32,
    pub unclip_ratio: f32,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            box_score_threshold: 0.5,
            box_threshold: 0.3,
            unclip_ratio: 1.6,
        }
    }
}

/// Text region detector producing rotated rectangles in image coordinates.
pub struct DbNet {
    session: Session,
}

impl DbNet {
    #[instrument(level = "debug")]
    pub fn init(path: &Path, num_threads: usize) -> ort::Result<Self> {
        Ok(Self {
            session: build_session(path, num_threads)?,
        })
    }

    #[instrument(skip(self, image), level = "debug")]
    pub fn get_text_boxes(
        &self,
        image: &DynamicImage,
        scale: util::Scale,
        options: DetectionOptions,
    ) -> Result<Vec<TextBox>, PredictError> {
        let image =
            image.resize_exact(scale.target_width, scale.target_height, FilterType::Nearest);
        let input_values =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input_values]?)?;
        let pred_mat = outputs
            .first_key_value()
            .ok_or_else(no_outputs)?
            .1
            .try_extract_tensor::<f32>()?;

        if pred_mat.ndim() != 4 {
            return Err(PredictError::data_shape(format!(
                "expected a 4d probability map, got shape {:?}",
                pred_mat.shape()
            )));
        }
        let width = pred_mat.len_of(Axis(3));
        let height = pred_mat.len_of(Axis(2));

        let pred_data = pred_mat
            .to_owned()
            .remove_axis(Axis(0))
            .remove_axis(Axis(0));
        let pred_data = pred_data.to_shape((height, width))?;

        let bitmap = binarize(pred_data.view(), options)?;
        Ok(find_rs_boxes(pred_data.view(), bitmap, scale, options))
    }
}

fn binarize(
    pred_data: ArrayView2<f32>,
    options: DetectionOptions,
) -> Result<GrayImage, PredictError> {
    let mut bitmap = to_luma_image(pred_data)?;
    let threshold = (options.box_threshold * 255.0) as u8;
    threshold_mut(&mut bitmap, threshold, ThresholdType::Binary);
    dilate_mut(&mut bitmap, Norm::L1, 2);
    Ok(bitmap)
}

#[instrument(skip(pred_data, bitmap), level = "trace")]
fn find_rs_boxes(
    pred_data: ArrayView2<f32>,
    bitmap: GrayImage,
    util::Scale {
        factor_x, factor_y, ..
    }: util::Scale,
    options: DetectionOptions,
) -> Vec<TextBox> {
    find_contours::<i32>(&bitmap)
        .into_iter()
        .take(MAX_CANDIDATES)
        .filter(|it| it.points.len() > 2)
        .filter_map(|it| to_geo_poly(&it.points).minimum_rotated_rect())
        .filter(|rect| max_side(rect) >= LONG_SIDE_THRESHOLD)
        .map(|rect| {
            let score = box_score_fast(&rect, pred_data.view());
            (rect, score)
        })
        .filter(|(_, score)| *score >= options.box_score_threshold)
        .filter_map(|(rect, score)| Some((unclip(rect, options.unclip_ratio)?, score)))
        .filter(|(clip_rect, _)| max_side(clip_rect) >= LONG_SIDE_THRESHOLD + 2.0)
        .map(|(rect, score)| TextBox {
            score,
            rect: order_corners(&rect.scale_around_point(factor_x, factor_y, Coord::zero())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::geometry::estimate_skew_angle;

    const WIDTH: usize = 320;
    const HEIGHT: usize = 128;

    /// Probability map with a 14px text band per entry of `starts`, each
    /// running from x = 20 to x = 300 at `degrees` below horizontal.
    fn probability_map(starts: &[f32], degrees: f32) -> Array2<f32> {
        let slope = degrees.to_radians().tan();
        Array2::from_shape_fn((HEIGHT, WIDTH), |(y, x)| {
            let on_band = (20..300).contains(&x)
                && starts.iter().any(|start| {
                    let center = start + (x as f32 - 20.0) * slope;
                    (y as f32 - center).abs() <= 7.0
                });
            if on_band {
                1.0
            } else {
                0.0
            }
        })
    }

    fn detect(pred: &Array2<f32>) -> Vec<TextBox> {
        let options = DetectionOptions::default();
        let scale = util::Scale {
            factor_x: 1.0,
            factor_y: 1.0,
            target_width: WIDTH as u32,
            target_height: HEIGHT as u32,
        };
        let bitmap = binarize(pred.view(), options).unwrap();
        find_rs_boxes(pred.view(), bitmap, scale, options)
    }

    #[test]
    fn level_lines_have_horizontal_top_edges() {
        let boxes = detect(&probability_map(&[20.0, 70.0], 0.0));
        assert_eq!(boxes.len(), 2);
        for text_box in &boxes {
            let corners = &text_box.rect.exterior().0;
            let (dx, dy) = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
            assert!(dx > 200.0, "top edge spans {dx}px");
            assert!(dy.abs() < 1.0);
            assert!(corners[3].y > corners[0].y);
        }

        let polys = boxes.into_iter().map(|it| it.rect).collect::<Vec<_>>();
        assert!(estimate_skew_angle(&polys).abs() < 0.5);
    }

    #[test]
    fn tilted_lines_report_their_skew() {
        let boxes = detect(&probability_map(&[15.0, 70.0], 5.0));
        assert_eq!(boxes.len(), 2);

        let polys = boxes.into_iter().map(|it| it.rect).collect::<Vec<_>>();
        let skew = estimate_skew_angle(&polys);
        assert!((skew - 5.0).abs() < 0.5, "skew was {skew}");
    }
}
