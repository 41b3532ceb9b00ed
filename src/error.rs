use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of a single `predict` call on an inference engine.
///
/// The variant decides the recovery path taken by the assembler: shape faults
/// fall back to a prediction without word boxes, execution faults rebuild the
/// engine once, image faults are returned as-is.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("unexpected result shape")]
    DataShape(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("inference execution failed")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to read input image")]
    Image(#[from] image::ImageError),
}

impl PredictError {
    pub fn data_shape(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::DataShape(err.into())
    }

    pub fn execution(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Execution(err.into())
    }
}

impl From<ort::Error> for PredictError {
    fn from(err: ort::Error) -> Self {
        Self::Execution(Box::new(err))
    }
}

impl From<ndarray::ShapeError> for PredictError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::DataShape(Box::new(err))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing dependency: {message}")]
    MissingDependency { message: String },
    #[error("{operation} is not implemented, use generate_ocr instead")]
    Unimplemented { operation: &'static str },
    #[error("image has no pixels: {}", path.display())]
    EmptyImage { path: PathBuf },
    #[error("failed to read image")]
    Image(#[from] image::ImageError),
    #[error("failed to read model files")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Runtime(#[from] ort::Error),
    #[error(transparent)]
    Predict(#[from] PredictError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn read_failures_name_what_was_read() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.to_string(), "failed to read model files");
        assert!(err.source().is_some());

        let err = Error::from(image::ImageError::IoError(std::io::Error::from(
            std::io::ErrorKind::UnexpectedEof,
        )));
        assert_eq!(err.to_string(), "failed to read image");
    }
}
