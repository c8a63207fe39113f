//! Reading a chosen image file and handing it to the session.

use std::path::Path;

use anyhow::Context;
use scenery_ai::{InferenceSession, ModelProvider};
use scenery_core::{Ranking, View};
use tracing::info;

/// Read `path` and classify its contents, reporting on `view`.
///
/// A file that cannot be read is reported in the results area like any other
/// failure.
pub async fn classify_file<P, V>(
    session: &InferenceSession<P>,
    path: &Path,
    view: &mut V,
) -> anyhow::Result<Ranking>
where
    P: ModelProvider,
    V: View + ?Sized,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            view.render_error(&format!("Error: Could not read {}. {e}", path.display()));
            view.set_results_visible(true);
            return Err(e).with_context(|| format!("reading {}", path.display()));
        }
    };
    info!(path = %path.display(), bytes = bytes.len(), "read image file");

    session
        .predict_encoded(&bytes, view)
        .await
        .with_context(|| format!("classifying {}", path.display()))
}
