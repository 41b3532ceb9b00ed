use std::{collections::BTreeSet, fmt, path::Path};

use tracing::instrument;

use crate::{
    assembler,
    cache::EngineCache,
    element::OcrElement,
    engine::EngineFactory,
    error::{Error, Result},
    lang, probe,
    result::OrientationResult,
};

/// Options the host pipeline passes to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOptions {
    /// Tesseract-style language codes, the first one selects the model.
    pub languages: Vec<String>,
    /// Number of pages the host may process concurrently.
    pub jobs: usize,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string()],
            jobs: 1,
        }
    }
}

/// Startup check: fails when the backend's runtime or models are missing.
pub fn initialize<F: EngineFactory>(factory: &F) -> Result<()> {
    factory.check_available().map_err(|err| match err {
        Error::MissingDependency { .. } => err,
        other => Error::MissingDependency {
            message: other.to_string(),
        },
    })
}

/// The native engine must not run concurrently, so any other job count is
/// reduced to one.
pub fn check_options(options: &mut OcrOptions) {
    if options.jobs != 1 {
        log::info!(
            "PaddleOCR: forcing jobs=1 (inference engine is not multi-process/thread safe)"
        );
        options.jobs = 1;
    }
}

/// Host-facing OCR engine. Owns the cached inference engine; one instance
/// serves a whole document run from a single worker.
pub struct PaddleOcrEngine<F: EngineFactory> {
    cache: EngineCache<F>,
}

impl<F: EngineFactory> PaddleOcrEngine<F> {
    pub fn new(factory: F) -> Self {
        Self {
            cache: EngineCache::new(factory),
        }
    }

    pub fn version(&self) -> String {
        self.cache.factory().version()
    }

    pub fn creator_tag(&self) -> String {
        self.to_string()
    }

    pub fn languages(&self) -> BTreeSet<&'static str> {
        lang::supported_languages()
    }

    pub fn get_orientation(&self, image: &Path) -> Result<OrientationResult> {
        probe::detect_orientation(self.cache.factory(), image)
    }

    pub fn get_deskew(&mut self, image: &Path, options: &OcrOptions) -> Result<f32> {
        probe::detect_skew(&mut self.cache, image, &options.languages)
    }

    pub fn supports_generate_ocr(&self) -> bool {
        true
    }

    #[instrument(skip(self, options))]
    pub fn generate_ocr(
        &mut self,
        image: &Path,
        options: &OcrOptions,
        page_number: usize,
    ) -> Result<(OcrElement, String)> {
        assembler::run(&mut self.cache, image, &options.languages, page_number)
    }

    pub fn generate_hocr(
        &mut self,
        _image: &Path,
        _output_hocr: &Path,
        _output_text: &Path,
        _options: &OcrOptions,
    ) -> Result<()> {
        Err(Error::Unimplemented {
            operation: "generate_hocr",
        })
    }

    pub fn generate_pdf(
        &mut self,
        _image: &Path,
        _output_pdf: &Path,
        _output_text: &Path,
        _options: &OcrOptions,
    ) -> Result<()> {
        Err(Error::Unimplemented {
            operation: "generate_pdf",
        })
    }
}

impl<F: EngineFactory> fmt::Display for PaddleOcrEngine<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaddleOCR {}", self.version())
    }
}
