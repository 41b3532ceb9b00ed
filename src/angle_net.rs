use std::path::Path;

use float_ord::FloatOrd;
use image::DynamicImage;
use ndarray::Axis;
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    error::PredictError,
    result::Angle,
    util::{build_session, no_outputs, subtract_mean_normalize},
};

const DEST_WIDTH: u32 = 192;
const DEST_HEIGHT: u32 = 48;

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

/// Text-line orientation classifier: index 0 is upright, 1 is upside down.
pub struct AngleNet {
    session: Session,
}

impl AngleNet {
    #[instrument(level = "debug")]
    pub fn init(path: &Path, num_threads: usize) -> ort::Result<Self> {
        Ok(Self {
            session: build_session(path, num_threads)?,
        })
    }

    /// With `most_angle` every line takes the majority orientation.
    #[instrument(level = "debug", skip(self, images))]
    pub fn get_angles(
        &self,
        images: &[DynamicImage],
        most_angle: bool,
    ) -> Result<Vec<Angle>, PredictError> {
        let mut angles = images
            .iter()
            .map(|image| self.get_angle(image))
            .collect::<Result<Vec<_>, _>>()?;

        if most_angle && !angles.is_empty() {
            let sum = angles.iter().map(|angle| angle.index).sum::<usize>() as f32;
            let half_percent = angles.len() as f32 / 2.0;
            let most_angle_index = if sum < half_percent { 0 } else { 1 };

            for angle in angles.iter_mut() {
                angle.index = most_angle_index;
            }
        }

        Ok(angles)
    }

    #[instrument(level = "trace", skip(self, image))]
    fn get_angle(&self, image: &DynamicImage) -> Result<Angle, PredictError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Angle {
                index: 0,
                score: 0.0,
            });
        }
        let image = image.resize_exact(
            DEST_WIDTH,
            DEST_HEIGHT,
            image::imageops::FilterType::Nearest,
        );
        let image =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => image]?)?;
        let output = outputs
            .first_key_value()
            .ok_or_else(no_outputs)?
            .1
            .try_extract_tensor::<f32>()?;

        output
            .iter()
            .enumerate()
            .max_by_key(|(_, score)| FloatOrd(**score))
            .map(|(index, score)| Angle {
                index,
                score: *score,
            })
            .ok_or_else(|| PredictError::data_shape("angle classifier returned no scores"))
    }
}
