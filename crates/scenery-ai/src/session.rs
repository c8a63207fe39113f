//! Inference session: owns the model handle and sequences one prediction.
//!
//! The model is built lazily, at most once per session. Concurrent callers
//! wait on the same in-flight load; a failed construction leaves the session
//! empty so the next call tries again. A failure to load pre-trained weights
//! is logged and the untrained model is used.

use image::DynamicImage;
use scenery_core::{LabelSet, Ranking, Scores, View};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::preprocess::{self, Preprocessor};
use crate::provider::{Model, ModelProvider};
use crate::InferenceError;

/// A constructed model and whether pre-trained weights were applied to it.
#[derive(Debug)]
pub struct LoadedModel<M> {
    model: M,
    pretrained: bool,
}

impl<M: Model> LoadedModel<M> {
    pub fn model(&self) -> &M {
        &self.model
    }

    /// `false` when weight loading failed and the model is untrained.
    pub fn is_pretrained(&self) -> bool {
        self.pretrained
    }
}

pub struct InferenceSession<P: ModelProvider> {
    provider: P,
    labels: LabelSet,
    preprocessor: Preprocessor,
    model: OnceCell<LoadedModel<P::Model>>,
}

impl<P: ModelProvider> InferenceSession<P> {
    pub fn new(provider: P, labels: LabelSet) -> Self {
        Self {
            provider,
            labels,
            preprocessor: Preprocessor::default(),
            model: OnceCell::new(),
        }
    }

    /// Override the square input size; it must match what the provider's
    /// network expects.
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.preprocessor = Preprocessor::new(size);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The model, if a load has already succeeded.
    pub fn loaded_model(&self) -> Option<&LoadedModel<P::Model>> {
        self.model.get()
    }

    /// Ensure the model exists, building it on first use.
    pub async fn acquire_model<V: View + ?Sized>(
        &self,
        view: &mut V,
    ) -> Result<&LoadedModel<P::Model>, InferenceError> {
        // Futures are lazy: `load` only runs if the cell is still empty.
        let load = self.load_model(view);
        self.model.get_or_try_init(|| load).await
    }

    /// Classify a decoded image and report the outcome on `view`.
    ///
    /// Errors are rendered into the results area as well as returned. The
    /// loading indicator is hidden and the results area shown on every path.
    pub async fn predict<V: View + ?Sized>(
        &self,
        image: &DynamicImage,
        view: &mut V,
    ) -> Result<Ranking, InferenceError> {
        let guard = PredictionView::begin(view);
        let outcome = self.classify(image, &mut *guard.view).await;
        finish(outcome, guard)
    }

    /// Decode `bytes` and classify the result, as [`predict`](Self::predict).
    pub async fn predict_encoded<V: View + ?Sized>(
        &self,
        bytes: &[u8],
        view: &mut V,
    ) -> Result<Ranking, InferenceError> {
        let guard = PredictionView::begin(view);
        let outcome = match preprocess::decode(bytes) {
            Ok(image) => self.classify(&image, &mut *guard.view).await,
            Err(e) => Err(e),
        };
        finish(outcome, guard)
    }

    async fn classify<V: View + ?Sized>(
        &self,
        image: &DynamicImage,
        view: &mut V,
    ) -> Result<Ranking, InferenceError> {
        view.show_preview(image.width(), image.height());
        let loaded = self.acquire_model(view).await?;
        let input = self.preprocessor.normalize(image)?;
        let raw = loaded
            .model
            .predict(input)
            .map_err(InferenceError::Prediction)?;
        let scores = Scores::validate(raw, &self.labels)?;
        Ok(Ranking::from_scores(&scores, &self.labels))
    }

    async fn load_model<V: View + ?Sized>(
        &self,
        view: &mut V,
    ) -> Result<LoadedModel<P::Model>, InferenceError> {
        view.set_loading(true);
        view.loading_message("Creating model architecture...");

        let mut model = match self.provider.create_model().await {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, "error loading model");
                view.loading_message(&format!("Error loading model: {e}"));
                return Err(InferenceError::Construction(e));
            }
        };

        view.loading_message("Loading pre-trained weights...");
        let pretrained = match self.provider.load_weights(&mut model).await {
            Ok(()) => {
                info!("model ready with pre-trained weights");
                true
            }
            Err(e) => {
                warn!(error = %e, "using model without pre-trained weights");
                false
            }
        };

        view.set_loading(false);
        Ok(LoadedModel { model, pretrained })
    }
}

/// Holds the view for the length of one prediction.
///
/// Dropping it hides the loading indicator and shows the results area, so the
/// view is restored even when the prediction future is cancelled.
struct PredictionView<'v, V: View + ?Sized> {
    view: &'v mut V,
}

impl<'v, V: View + ?Sized> PredictionView<'v, V> {
    fn begin(view: &'v mut V) -> Self {
        view.set_loading(true);
        view.set_results_visible(false);
        Self { view }
    }
}

impl<V: View + ?Sized> Drop for PredictionView<'_, V> {
    fn drop(&mut self) {
        self.view.set_loading(false);
        self.view.set_results_visible(true);
    }
}

fn finish<V: View + ?Sized>(
    outcome: Result<Ranking, InferenceError>,
    guard: PredictionView<'_, V>,
) -> Result<Ranking, InferenceError> {
    match &outcome {
        Ok(ranking) => {
            if let Some(top) = ranking.top() {
                info!(label = %top.label, probability = top.probability, "prediction complete");
            }
            guard.view.render(ranking);
        }
        Err(e) => {
            error!(error = %e, "error during prediction");
            guard
                .view
                .render_error(&format!("Error: Could not process the image. {e}"));
        }
    }
    outcome
}
