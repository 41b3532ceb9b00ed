use std::path::Path;

use tracing::instrument;

use crate::{
    cache::EngineCache,
    element::OcrElement,
    engine::{EngineFactory, TextEngine},
    error::{Error, PredictError, Result},
    geometry::{box_array_to_bbox, quad_to_bbox, BoundingBox},
    lang::select_language,
    resolution::read_dpi,
    result::PageResult,
};

pub const DEFAULT_DPI: f32 = 300.0;

/// Size and resolution of an input page image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub dpi: f32,
}

impl PageImage {
    pub fn probe(path: &Path) -> Result<Self> {
        let (width, height) = image::image_dimensions(path)?;
        let dpi = read_dpi(path).unwrap_or(DEFAULT_DPI);
        Ok(Self { width, height, dpi })
    }

    pub fn bbox(&self, path: &Path) -> Result<BoundingBox> {
        BoundingBox::page(self.width, self.height).ok_or_else(|| Error::EmptyImage {
            path: path.to_path_buf(),
        })
    }
}

/// Where the prediction retry sequence currently stands. Each recovery path
/// can be taken at most once and only from the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    WithoutWordBoxes,
    RebuiltEngine,
}

impl Attempt {
    fn word_boxes(self) -> bool {
        !matches!(self, Attempt::WithoutWordBoxes)
    }
}

fn predict_with_recovery<F: EngineFactory>(
    cache: &mut EngineCache<F>,
    lang: &str,
    image: &Path,
) -> Result<Vec<PageResult>> {
    let mut attempt = Attempt::First;
    loop {
        let engine = cache.acquire(lang)?;
        let err = match engine.predict(image, attempt.word_boxes()) {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };
        attempt = match (attempt, err) {
            (Attempt::First, PredictError::DataShape(source)) => {
                log::debug!("Word box extraction failed ({source}), retrying without word boxes");
                Attempt::WithoutWordBoxes
            }
            (Attempt::First, PredictError::Execution(source)) => {
                log::debug!("Inference failed ({source}), recreating engine");
                cache.invalidate();
                Attempt::RebuiltEngine
            }
            (_, err) => return Err(err.into()),
        };
    }
}

/// Runs the engine on one page image and folds its output into a
/// page → line → word tree plus the page text, one line per row.
#[instrument(skip(cache, languages))]
pub fn run<F: EngineFactory>(
    cache: &mut EngineCache<F>,
    image: &Path,
    languages: &[String],
    page_number: usize,
) -> Result<(OcrElement, String)> {
    let page_image = PageImage::probe(image)?;
    let page = OcrElement::page(page_image.bbox(image)?, page_image.dpi, page_number);

    let lang = select_language(languages);
    let result = predict_with_recovery(cache, lang, image)?;

    match result.into_iter().next() {
        Some(ocr_data) if !ocr_data.is_empty() => Ok(assemble(page, ocr_data)),
        _ => Ok((page, String::new())),
    }
}

fn assemble(mut page: OcrElement, ocr_data: PageResult) -> (OcrElement, String) {
    if ocr_data.rec_texts.is_empty() {
        return (page, String::new());
    }

    let has_word_boxes = ocr_data.has_word_boxes();
    let mut text_parts = Vec::new();

    let lines = ocr_data
        .rec_texts
        .iter()
        .zip(&ocr_data.rec_scores)
        .zip(&ocr_data.rec_boxes)
        .enumerate();
    for (i, ((text, &score), corners)) in lines {
        if text.trim().is_empty() {
            continue;
        }
        let Some(line_bbox) = box_array_to_bbox(corners) else {
            continue;
        };
        let mut line = OcrElement::line(line_bbox);

        let words = if has_word_boxes {
            ocr_data
                .text_word
                .get(i)
                .zip(ocr_data.text_word_region.get(i))
                .filter(|(tokens, _)| !tokens.is_empty())
        } else {
            None
        };

        match words {
            Some((tokens, quads)) => {
                for (token, quad) in tokens.iter().zip(quads) {
                    let token = token.trim();
                    if token.is_empty() {
                        continue;
                    }
                    let Some(word_bbox) = quad_to_bbox(quad) else {
                        continue;
                    };
                    line.children
                        .push(OcrElement::word(word_bbox, token, score));
                }
            }
            None => line
                .children
                .push(OcrElement::word(line_bbox, text.as_str(), score)),
        }

        if !line.children.is_empty() {
            page.children.push(line);
            text_parts.push(text.as_str());
        }
    }

    let text = text_parts.join("\n");
    (page, text)
}
