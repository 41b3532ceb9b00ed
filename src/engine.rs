use std::path::Path;

use crate::{
    error::{PredictError, Result},
    result::{OrientationPrediction, PageResult},
};

/// Construction parameters handed to an [`EngineFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub lang: String,
    pub use_doc_orientation_classify: bool,
    pub use_doc_unwarping: bool,
    pub use_textline_orientation: bool,
}

impl EngineConfig {
    pub fn for_language(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            use_doc_orientation_classify: false,
            use_doc_unwarping: false,
            use_textline_orientation: true,
        }
    }
}

/// A loaded text detection and recognition engine.
///
/// Implementations are not expected to tolerate concurrent calls; callers
/// serialize all access through a single [`crate::EngineCache`].
pub trait TextEngine {
    fn predict(&self, image: &Path, return_word_box: bool)
        -> Result<Vec<PageResult>, PredictError>;
}

/// Standalone page orientation classifier.
pub trait OrientationClassifier {
    fn predict(&self, image: &Path) -> Result<Vec<OrientationPrediction>, PredictError>;
}

/// Builds engines and classifiers, and describes the backend behind them.
pub trait EngineFactory {
    type Engine: TextEngine;
    type Classifier: OrientationClassifier;

    fn create(&self, config: &EngineConfig) -> Result<Self::Engine>;

    fn create_orientation_classifier(&self) -> Result<Self::Classifier>;

    fn version(&self) -> String {
        "unknown".to_string()
    }

    /// Verifies that the runtime and models are installed.
    fn check_available(&self) -> Result<()> {
        Ok(())
    }
}
