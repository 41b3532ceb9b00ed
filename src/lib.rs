//! Turns page-level text detection and recognition output into a
//! page → line → word tree with validated bounding boxes, ready to be laid
//! over a scanned page as a searchable text layer.
//!
//! [`PaddleOcrEngine`] is the entry point for a host pipeline. It owns an
//! [`EngineCache`] holding the single live inference engine, built by an
//! [`EngineFactory`]; [`NativeBackend`] is the ONNX Runtime implementation.
//! The engine is not safe for concurrent use: run [`check_options`] at
//! startup and drive one `PaddleOcrEngine` from a single worker.

mod angle_net;
mod assembler;
mod cache;
mod crnn_net;
pub mod dbnet;
mod doc_orientation;
mod element;
mod engine;
mod error;
pub mod geometry;
pub mod lang;
mod native;
mod plugin;
mod probe;
mod resolution;
mod result;
pub mod util;
mod word_box;

pub use assembler::{run, PageImage, DEFAULT_DPI};
pub use cache::{EngineCache, EnvVarGuard, THREAD_LIMIT_VAR};
pub use doc_orientation::DocOrientationNet;
pub use element::{OcrClass, OcrElement};
pub use engine::{EngineConfig, EngineFactory, OrientationClassifier, TextEngine};
pub use error::{Error, PredictError, Result};
pub use geometry::{BoundingBox, Quad};
pub use native::{NativeBackend, NativeBackendBuilder, NativeEngine};
pub use plugin::{check_options, initialize, OcrOptions, PaddleOcrEngine};
pub use probe::{detect_orientation, detect_skew, CONFIDENCE_SCALE};
pub use result::*;

pub use ort as runtime;
