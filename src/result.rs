use geo::Polygon;

use crate::geometry::Quad;

/// Raw per-image output of a text engine `predict` call.
///
/// Vectors indexed by recognized line run in parallel. `text_word` and
/// `text_word_region` are only filled when word boxes were requested.
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub rec_texts: Vec<String>,
    pub rec_scores: Vec<f32>,
    pub rec_boxes: Vec<[f32; 4]>,
    pub dt_polys: Vec<Polygon<f32>>,
    pub text_word: Vec<Vec<String>>,
    pub text_word_region: Vec<Vec<Quad>>,
}

impl PageResult {
    pub fn is_empty(&self) -> bool {
        self.rec_texts.is_empty()
            && self.rec_scores.is_empty()
            && self.rec_boxes.is_empty()
            && self.dt_polys.is_empty()
            && self.text_word.is_empty()
            && self.text_word_region.is_empty()
    }

    pub fn has_word_boxes(&self) -> bool {
        !self.text_word.is_empty() && !self.text_word_region.is_empty()
    }
}

/// Raw output of a page orientation classifier, labels ranked by score.
#[derive(Debug, Clone, Default)]
pub struct OrientationPrediction {
    pub label_names: Vec<String>,
    pub scores: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl PageRotation {
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

/// Page orientation with confidence on a 0..=15 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationResult {
    pub angle: PageRotation,
    pub confidence: f32,
}

// Intermediate values of the native pipeline.

#[derive(Debug, Clone)]
pub struct TextBox {
    pub score: f32,
    pub rect: Polygon<f32>,
}

#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub character_scores: Vec<f32>,
    /// CTC timestep of every decoded character.
    pub columns: Vec<usize>,
    /// Total number of CTC timesteps for the line.
    pub seq_len: usize,
}

impl TextLine {
    pub fn score(&self) -> f32 {
        if self.character_scores.is_empty() {
            return 0.0;
        }
        self.character_scores.iter().sum::<f32>() / self.character_scores.len() as f32
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Angle {
    pub index: usize,
    pub score: f32,
}
