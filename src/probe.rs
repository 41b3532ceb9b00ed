use std::path::Path;

use tracing::instrument;

use crate::{
    cache::EngineCache,
    engine::{EngineFactory, OrientationClassifier, TextEngine},
    error::Result,
    geometry::estimate_skew_angle,
    lang::select_language,
    result::{OrientationPrediction, OrientationResult, PageRotation},
};

/// Classifier scores are probabilities; callers expect confidence on 0..=15.
pub const CONFIDENCE_SCALE: f32 = 15.0;

/// Classifies page orientation with a freshly built classifier.
#[instrument(skip(factory))]
pub fn detect_orientation<F: EngineFactory>(
    factory: &F,
    image: &Path,
) -> Result<OrientationResult> {
    let classifier = factory.create_orientation_classifier()?;
    let predictions = classifier.predict(image)?;
    let orientation = predictions
        .first()
        .and_then(top_orientation)
        .unwrap_or_default();
    log::debug!("Orientation of {}: {orientation:?}", image.display());
    Ok(orientation)
}

fn top_orientation(prediction: &OrientationPrediction) -> Option<OrientationResult> {
    let label = prediction.label_names.first()?;
    let score = *prediction.scores.first()?;
    let Some(angle) = label.trim().parse().ok().and_then(PageRotation::from_degrees) else {
        log::warn!("Ignoring unknown orientation label {label:?}");
        return None;
    };
    Some(OrientationResult {
        angle,
        confidence: score.clamp(0.0, 1.0) * CONFIDENCE_SCALE,
    })
}

/// Skew of the page in degrees, from the raw detection polygons.
#[instrument(skip(cache, languages))]
pub fn detect_skew<F: EngineFactory>(
    cache: &mut EngineCache<F>,
    image: &Path,
    languages: &[String],
) -> Result<f32> {
    let engine = cache.acquire(select_language(languages))?;
    let result = engine.predict(image, false)?;
    let angle = match result.first() {
        Some(ocr_data) if !ocr_data.is_empty() && !ocr_data.dt_polys.is_empty() => {
            estimate_skew_angle(&ocr_data.dt_polys)
        }
        _ => 0.0,
    };
    log::debug!("Skew of {}: {angle}", image.display());
    Ok(angle)
}
