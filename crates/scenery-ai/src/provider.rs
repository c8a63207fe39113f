//! The seam between the inference session and whatever runs the network.
//!
//! A provider builds a model in two steps: the architecture (which must
//! succeed) and its pre-trained weights (which may fail, leaving the model
//! usable but untrained).

use async_trait::async_trait;
use scenery_core::InputTensor;

use crate::ProviderError;

/// A model ready to score input tensors.
pub trait Model: Send + Sync {
    /// Score one input batch, returning one value per output class.
    ///
    /// The tensor is consumed; its buffer is released when the call returns.
    fn predict(&self, input: InputTensor) -> Result<Vec<f32>, ProviderError>;
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    type Model: Model;

    /// Build the network architecture with default-initialised parameters.
    async fn create_model(&self) -> Result<Self::Model, ProviderError>;

    /// Apply pre-trained weights to `model`.
    ///
    /// On error `model` must be left as it was before the call.
    async fn load_weights(&self, model: &mut Self::Model) -> Result<(), ProviderError>;
}
