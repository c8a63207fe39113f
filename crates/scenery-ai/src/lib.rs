//! Local scene inference: image preprocessing, the model provider seam, and
//! the session that sequences a prediction. The burn-backed network sits
//! behind the `burn` feature.

mod error;
pub mod preprocess;
pub mod provider;
pub mod session;

#[cfg(feature = "burn")]
pub mod scene_net;

pub use error::{InferenceError, ProviderError};
pub use preprocess::{INPUT_SIZE, Preprocessor, decode};
pub use provider::{Model, ModelProvider};
pub use session::{InferenceSession, LoadedModel};

#[cfg(feature = "burn")]
pub use scene_net::{BurnModel, BurnProvider, SceneNet, SceneNetConfig};
