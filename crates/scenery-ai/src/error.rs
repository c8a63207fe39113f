use scenery_core::{LabelError, TensorError};
use thiserror::Error;

/// Failure reported by a [`ModelProvider`](crate::ModelProvider) or its model.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("model construction failed: {0}")]
    Construction(String),

    #[error("no weights configured")]
    NoWeights,

    #[error("weights file not found: {0}")]
    WeightsNotFound(std::path::PathBuf),

    #[error("weights could not be loaded: {0}")]
    Weights(String),

    #[error("input shape {actual:?} does not match expected {expected:?}")]
    InputShape {
        expected: [usize; 4],
        actual: [usize; 4],
    },

    #[error("model runtime error: {0}")]
    Runtime(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a model load or a prediction, as seen by the session's caller.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0}")]
    Construction(#[source] ProviderError),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid input tensor: {0}")]
    Tensor(#[from] TensorError),

    #[error("prediction failed: {0}")]
    Prediction(#[source] ProviderError),

    #[error("label configuration error: {0}")]
    Config(#[from] LabelError),
}
