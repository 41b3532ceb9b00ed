use std::path::Path;

use float_ord::FloatOrd;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    error::{Error, PredictError},
    result::TextLine,
    util::{build_session, no_outputs, subtract_mean_normalize},
};

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

const DEST_HEIGHT: u32 = 48;

/// CTC text recognizer for single cropped lines.
pub struct CrnnNet {
    session: Session,
    keys: Vec<String>,
}

impl CrnnNet {
    #[instrument(level = "debug")]
    pub fn init(model_path: &Path, keys_path: &Path, num_threads: usize) -> Result<Self, Error> {
        let session = build_session(model_path, num_threads)?;

        // Index 0 is the CTC blank, the dictionary is followed by a space.
        let keys = std::fs::read_to_string(keys_path)?;
        let keys = ["#".to_string()]
            .into_iter()
            .chain(keys.lines().map(|line| line.to_string()))
            .chain([" ".to_string()])
            .collect();

        Ok(Self { session, keys })
    }

    #[instrument(level = "debug", skip(self, images))]
    pub fn get_text_lines(&self, images: &[DynamicImage]) -> Result<Vec<TextLine>, PredictError> {
        images
            .iter()
            .map(|image| self.get_text_line(image))
            .collect()
    }

    #[instrument(level = "trace", skip(self, image))]
    fn get_text_line(&self, image: &DynamicImage) -> Result<TextLine, PredictError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(TextLine {
                text: String::new(),
                character_scores: Vec::new(),
                columns: Vec::new(),
                seq_len: 0,
            });
        }
        let scale = DEST_HEIGHT as f32 / image.height() as f32;
        let dest_width = ((image.width() as f32 * scale) as u32).clamp(1, u16::MAX as u32);
        let image = image.resize_exact(dest_width, DEST_HEIGHT, FilterType::Nearest);

        let tensor_values =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => tensor_values]?)?;
        let output_tensor = outputs
            .first_key_value()
            .ok_or_else(no_outputs)?
            .1
            .try_extract_tensor::<f32>()?;

        log::trace!("Output tensor size: {:?}", output_tensor.dim());
        if output_tensor.ndim() != 3 {
            return Err(PredictError::data_shape(format!(
                "expected a 3d recognition output, got shape {:?}",
                output_tensor.shape()
            )));
        }
        let seq_len = output_tensor.len_of(Axis(1));
        let classes = output_tensor.len_of(Axis(2));

        let output_tensor = output_tensor.remove_axis(Axis(0));
        let output = output_tensor.to_shape((seq_len, classes))?;

        Ok(self.decode(output.view()))
    }

    /// Greedy CTC decoding: per timestep argmax, dropping blanks and repeats.
    #[instrument(level = "trace", skip(self, data))]
    fn decode(&self, data: ArrayView2<f32>) -> TextLine {
        let keys_size = self.keys.len();
        let mut text = String::new();
        let mut character_scores = Vec::new();
        let mut columns = Vec::new();
        let mut previous = 0;

        for (column, scores) in data.outer_iter().enumerate() {
            let Some((index, score)) = scores
                .indexed_iter()
                .max_by_key(|(_, value)| FloatOrd(**value))
                .map(|(index, value)| (index, *value))
            else {
                continue;
            };
            let repeated = index == previous;
            previous = index;
            if index == 0 || index >= keys_size || repeated {
                continue;
            }
            // Characters of a multi-character entry share its timestep.
            let key = &self.keys[index];
            for ch in key.chars() {
                text.push(ch);
                character_scores.push(score);
                columns.push(column);
            }
        }

        TextLine {
            text,
            character_scores,
            columns,
            seq_len: data.len_of(Axis(0)),
        }
    }
}
