use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::{
    angle_net::AngleNet,
    crnn_net::CrnnNet,
    dbnet::{DbNet, DetectionOptions},
    doc_orientation::DocOrientationNet,
    engine::{EngineConfig, EngineFactory, TextEngine},
    error::{Error, PredictError, Result},
    result::PageResult,
    util::{clamp_to_image, enclosing_box, part_image, scale_normalized, sort_reading_order},
    word_box::split_words,
};

const INSTALL_HINT: &str = "Install ONNX Runtime (set ORT_DYLIB_PATH to libonnxruntime) and \
     place the PaddleOCR ONNX models in the model directory: det.onnx, cls.onnx, doc_ori.onnx, \
     rec/<lang>.onnx and rec/<lang>_dict.txt";

/// ONNX Runtime backend. Loads models lazily, one engine per language.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    model_dir: PathBuf,
    det_path: Option<PathBuf>,
    cls_path: Option<PathBuf>,
    doc_orientation_path: Option<PathBuf>,
    threads: usize,
    max_side_len: u32,
    most_angle: bool,
    detection: DetectionOptions,
}

impl NativeBackend {
    pub fn builder() -> NativeBackendBuilder {
        NativeBackendBuilder::default()
    }

    fn det_path(&self) -> PathBuf {
        self.det_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("det.onnx"))
    }

    fn cls_path(&self) -> PathBuf {
        self.cls_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("cls.onnx"))
    }

    fn doc_orientation_path(&self) -> PathBuf {
        self.doc_orientation_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("doc_ori.onnx"))
    }

    fn rec_paths(&self, lang: &str) -> (PathBuf, PathBuf) {
        let rec_dir = self.model_dir.join("rec");
        (
            rec_dir.join(format!("{lang}.onnx")),
            rec_dir.join(format!("{lang}_dict.txt")),
        )
    }
}

pub struct NativeBackendBuilder {
    model_dir: PathBuf,
    det_path: Option<PathBuf>,
    cls_path: Option<PathBuf>,
    doc_orientation_path: Option<PathBuf>,
    threads: usize,
    max_side_len: u32,
    most_angle: bool,
    detection: DetectionOptions,
}

impl NativeBackendBuilder {
    pub fn model_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_dir = path.into();
        self
    }

    pub fn det_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.det_path = Some(path.into());
        self
    }

    pub fn cls_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.cls_path = Some(path.into());
        self
    }

    pub fn doc_orientation_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.doc_orientation_path = Some(path.into());
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn max_side_len(mut self, max_side_len: u32) -> Self {
        self.max_side_len = max_side_len;
        self
    }

    pub fn most_angle(mut self, most_angle: bool) -> Self {
        self.most_angle = most_angle;
        self
    }

    pub fn detection_options(mut self, options: DetectionOptions) -> Self {
        self.detection = options;
        self
    }

    pub fn build(self) -> NativeBackend {
        NativeBackend {
            model_dir: self.model_dir,
            det_path: self.det_path,
            cls_path: self.cls_path,
            doc_orientation_path: self.doc_orientation_path,
            threads: self.threads,
            max_side_len: self.max_side_len,
            most_angle: self.most_angle,
            detection: self.detection,
        }
    }
}

impl Default for NativeBackendBuilder {
    fn default() -> Self {
        Self {
            model_dir: "models".into(),
            det_path: None,
            cls_path: None,
            doc_orientation_path: None,
            threads: 4,
            max_side_len: 1024,
            most_angle: false,
            detection: DetectionOptions::default(),
        }
    }
}

impl EngineFactory for NativeBackend {
    type Engine = NativeEngine;
    type Classifier = DocOrientationNet;

    #[instrument(skip(self))]
    fn create(&self, config: &EngineConfig) -> Result<NativeEngine> {
        let (rec_path, keys_path) = self.rec_paths(&config.lang);
        let cls_model = if config.use_textline_orientation {
            Some(AngleNet::init(&self.cls_path(), self.threads)?)
        } else {
            None
        };
        Ok(NativeEngine {
            det_model: DbNet::init(&self.det_path(), self.threads)?,
            cls_model,
            rec_model: CrnnNet::init(&rec_path, &keys_path, self.threads)?,
            max_side_len: self.max_side_len,
            most_angle: self.most_angle,
            detection: self.detection,
        })
    }

    fn create_orientation_classifier(&self) -> Result<DocOrientationNet> {
        Ok(DocOrientationNet::init(
            &self.doc_orientation_path(),
            self.threads,
        )?)
    }

    fn version(&self) -> String {
        format!("{} (ONNX Runtime)", env!("CARGO_PKG_VERSION"))
    }

    fn check_available(&self) -> Result<()> {
        let mut missing = [self.det_path(), self.cls_path(), self.doc_orientation_path()]
            .into_iter()
            .filter(|path| !path.is_file())
            .collect::<Vec<_>>();
        if !self.model_dir.join("rec").is_dir() {
            missing.push(self.model_dir.join("rec"));
        }
        if let Some(dylib) = std::env::var_os("ORT_DYLIB_PATH") {
            let dylib = PathBuf::from(dylib);
            if !dylib.is_file() {
                missing.push(dylib);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        let missing = missing
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::MissingDependency {
            message: format!("PaddleOCR models or runtime not found ({missing}). {INSTALL_HINT}"),
        })
    }
}

/// Loaded detection, line orientation and recognition models for one
/// language.
pub struct NativeEngine {
    det_model: DbNet,
    cls_model: Option<AngleNet>,
    rec_model: CrnnNet,
    max_side_len: u32,
    most_angle: bool,
    detection: DetectionOptions,
}

impl TextEngine for NativeEngine {
    #[instrument(skip(self))]
    fn predict(
        &self,
        image_path: &Path,
        return_word_box: bool,
    ) -> Result<Vec<PageResult>, PredictError> {
        let image = image::open(image_path)?;
        let scale = if self.max_side_len > 0 {
            scale_normalized(&image, self.max_side_len)
        } else {
            scale_normalized(&image, u32::MAX)
        };
        let mut boxes = self
            .det_model
            .get_text_boxes(&image, scale, self.detection)?;
        for text_box in boxes.iter_mut() {
            text_box.rect = clamp_to_image(&text_box.rect, image.width(), image.height());
        }
        sort_reading_order(&mut boxes);

        let mut part_images = boxes
            .iter()
            .map(|it| part_image(&image, &it.rect))
            .collect::<Vec<_>>();

        let mut rotated = vec![false; part_images.len()];
        if let Some(angle_net) = &self.cls_model {
            let angles = angle_net.get_angles(&part_images, self.most_angle)?;
            let crops = part_images.iter_mut().zip(rotated.iter_mut());
            for ((image, flipped), angle) in crops.zip(angles) {
                if angle.index == 1 {
                    *image = image.rotate180();
                    *flipped = true;
                }
            }
        }

        let text_lines = self.rec_model.get_text_lines(&part_images)?;

        let mut result = PageResult::default();
        for ((text_box, line), rotated) in boxes.into_iter().zip(text_lines).zip(rotated) {
            let corners = enclosing_box(&text_box.rect);
            if return_word_box {
                let (tokens, quads) = split_words(&line, &corners, rotated)?;
                result.text_word.push(tokens);
                result.text_word_region.push(quads);
            }
            result.rec_scores.push(line.score());
            result.rec_texts.push(line.text);
            result.rec_boxes.push(corners);
            result.dt_polys.push(text_box.rect);
        }
        log::debug!(
            "Recognized {} lines in {}",
            result.rec_texts.len(),
            image_path.display()
        );
        Ok(vec![result])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_paths_follow_language() {
        let backend = NativeBackend::builder().model_dir("/opt/paddle").build();
        let (rec, keys) = backend.rec_paths("korean");
        assert_eq!(rec, PathBuf::from("/opt/paddle/rec/korean.onnx"));
        assert_eq!(keys, PathBuf::from("/opt/paddle/rec/korean_dict.txt"));
        assert_eq!(backend.det_path(), PathBuf::from("/opt/paddle/det.onnx"));
    }

    #[test]
    fn missing_models_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = NativeBackend::builder().model_dir(dir.path()).build();

        match backend.check_available() {
            Err(Error::MissingDependency { message }) => {
                assert!(message.contains("det.onnx"));
                assert!(message.contains("ORT_DYLIB_PATH"));
            }
            other => panic!("expected a missing dependency error, got {other:?}"),
        }
    }
}
