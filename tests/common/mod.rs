#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    path::{Path, PathBuf},
    rc::Rc,
};

use rapidocr_layer::{
    EngineConfig, EngineFactory, OrientationClassifier, OrientationPrediction, PageResult,
    PredictError, TextEngine,
};

pub type Outcome = Result<Vec<PageResult>, PredictError>;

/// Backend replaying scripted predict outcomes.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub outcomes: Rc<RefCell<VecDeque<Outcome>>>,
    pub orientation: Rc<RefCell<Vec<OrientationPrediction>>>,
    pub builds: Rc<Cell<usize>>,
    pub on_build: Option<Rc<dyn Fn(&EngineConfig)>>,
}

impl ScriptedBackend {
    pub fn then(&self, outcome: Outcome) -> &Self {
        self.outcomes.borrow_mut().push_back(outcome);
        self
    }
}

pub struct ScriptedEngine {
    outcomes: Rc<RefCell<VecDeque<Outcome>>>,
}

impl TextEngine for ScriptedEngine {
    fn predict(&self, _image: &Path, _return_word_box: bool) -> Outcome {
        self.outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![PageResult::default()]))
    }
}

pub struct ScriptedClassifier(Vec<OrientationPrediction>);

impl OrientationClassifier for ScriptedClassifier {
    fn predict(&self, _image: &Path) -> Result<Vec<OrientationPrediction>, PredictError> {
        Ok(self.0.clone())
    }
}

impl EngineFactory for ScriptedBackend {
    type Engine = ScriptedEngine;
    type Classifier = ScriptedClassifier;

    fn create(&self, config: &EngineConfig) -> rapidocr_layer::Result<ScriptedEngine> {
        if let Some(on_build) = &self.on_build {
            on_build(config);
        }
        self.builds.set(self.builds.get() + 1);
        Ok(ScriptedEngine {
            outcomes: self.outcomes.clone(),
        })
    }

    fn create_orientation_classifier(&self) -> rapidocr_layer::Result<ScriptedClassifier> {
        Ok(ScriptedClassifier(self.orientation.borrow().clone()))
    }

    fn version(&self) -> String {
        "test".to_string()
    }
}

/// Writes a white PNG with a pHYs chunk of `dpi` dots per inch.
pub fn blank_page(dir: &Path, width: u32, height: u32, dpi: f32) -> PathBuf {
    let path = dir.join("blank.png");
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let ppm = (dpi / 0.0254).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header().unwrap();
    let data = vec![255u8; (width * height * 3) as usize];
    writer.write_image_data(&data).unwrap();
    writer.finish().unwrap();
    path
}
