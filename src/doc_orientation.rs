use std::path::Path;

use float_ord::FloatOrd;
use image::imageops::FilterType;
use ndarray::Axis;
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    engine::OrientationClassifier,
    error::PredictError,
    result::OrientationPrediction,
    util::{build_session, no_outputs, subtract_mean_normalize},
};

const DEST_SIZE: u32 = 224;

const MEAN_VALUES: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_VALUES: [f32; 3] = [1.0 / 0.229, 1.0 / 0.224, 1.0 / 0.225];

const LABELS: [&str; 4] = ["0", "90", "180", "270"];

/// Whole-page orientation classifier over the four right-angle rotations.
pub struct DocOrientationNet {
    session: Session,
}

impl DocOrientationNet {
    #[instrument(level = "debug")]
    pub fn init(path: &Path, num_threads: usize) -> ort::Result<Self> {
        Ok(Self {
            session: build_session(path, num_threads)?,
        })
    }
}

impl OrientationClassifier for DocOrientationNet {
    #[instrument(level = "debug", skip(self))]
    fn predict(&self, image: &Path) -> Result<Vec<OrientationPrediction>, PredictError> {
        let image = image::open(image)?.resize_exact(DEST_SIZE, DEST_SIZE, FilterType::Triangle);
        let input =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input]?)?;
        let output = outputs
            .first_key_value()
            .ok_or_else(no_outputs)?
            .1
            .try_extract_tensor::<f32>()?;

        let scores = output.iter().copied().collect::<Vec<_>>();
        if scores.len() != LABELS.len() {
            return Err(PredictError::data_shape(format!(
                "expected {} orientation scores, got {}",
                LABELS.len(),
                scores.len()
            )));
        }
        Ok(vec![rank(&scores)])
    }
}

/// Labels sorted by descending probability.
fn rank(scores: &[f32]) -> OrientationPrediction {
    let probabilities = if is_distribution(scores) {
        scores.to_vec()
    } else {
        softmax(scores)
    };
    let mut ranked = LABELS
        .iter()
        .zip(probabilities)
        .map(|(label, score)| (label.to_string(), score))
        .collect::<Vec<_>>();
    ranked.sort_by_key(|(_, score)| std::cmp::Reverse(FloatOrd(*score)));
    let (label_names, scores) = ranked.into_iter().unzip();
    OrientationPrediction {
        label_names,
        scores,
    }
}

fn is_distribution(scores: &[f32]) -> bool {
    scores.iter().all(|score| (0.0..=1.0).contains(score))
        && (scores.iter().sum::<f32>() - 1.0).abs() < 1e-3
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .max_by_key(|score| FloatOrd(*score))
        .unwrap_or(0.0);
    let exp = scores
        .iter()
        .map(|score| (score - max).exp())
        .collect::<Vec<_>>();
    let sum = exp.iter().sum::<f32>();
    exp.into_iter().map(|value| value / sum).collect()
}
