mod display;
mod upload;

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use scenery_ai::{BurnProvider, InferenceSession, ModelProvider};
use scenery_core::{LabelSet, Ranking, View, ViewState};
use serde::Serialize;
use tracing::{info, warn};

use display::{BarAnimation, TerminalView};

/// Classify scene photographs as buildings, forest, glacier, mountain, sea or street.
#[derive(Parser, Debug)]
#[command(name = "scenery", version)]
struct Cli {
    /// Image files, classified one after another.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Pre-trained weights (burn record file, `.mpk`).
    #[arg(long, env = "SCENERY_WEIGHTS")]
    weights: Option<PathBuf>,

    /// Print one JSON object per image instead of bar charts.
    #[arg(long)]
    json: bool,

    /// Draw the bars without the fill animation.
    #[arg(long)]
    no_animate: bool,
}

/// One line of `--json` output.
#[derive(Debug, Serialize)]
struct Report {
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    predictions: Option<Ranking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    pretrained: bool,
}

impl Report {
    fn failed(&self) -> bool {
        self.predictions.is_none()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();
    info!("scenery v{}", env!("CARGO_PKG_VERSION"));

    let labels = LabelSet::scenes();
    let mut provider = BurnProvider::new(labels.len());
    if let Some(path) = &cli.weights {
        provider = provider.with_weights(path);
    }
    let session = InferenceSession::new(provider, labels);

    let failures = if cli.json {
        run_json(&session, &cli.images, &mut io::stdout()).await?
    } else {
        run_terminal(&session, &cli).await
    };

    if failures > 0 {
        anyhow::bail!(
            "{failures} of {} images could not be classified",
            cli.images.len()
        );
    }
    Ok(())
}

/// Build the model up front; a failure here is retried by the first prediction.
async fn warm_up<P: ModelProvider, V: View + ?Sized>(session: &InferenceSession<P>, view: &mut V) {
    match session.acquire_model(view).await {
        Ok(loaded) if !loaded.is_pretrained() => {
            warn!("no pre-trained weights applied; predictions come from an untrained network")
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "model not ready at startup"),
    }
}

async fn run_terminal<P: ModelProvider>(session: &InferenceSession<P>, cli: &Cli) -> usize {
    let animation = (!cli.no_animate && io::stdout().is_terminal()).then(BarAnimation::default);
    let mut view = TerminalView::new(io::stdout(), animation);
    warm_up(session, &mut view).await;

    let mut failures = 0;
    for path in &cli.images {
        view.heading(&path.display().to_string());
        if upload::classify_file(session, path, &mut view).await.is_err() {
            failures += 1;
        }
    }
    failures
}

async fn run_json<P: ModelProvider>(
    session: &InferenceSession<P>,
    images: &[PathBuf],
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let mut view = ViewState::new();
    warm_up(session, &mut view).await;

    let mut failures = 0;
    for path in images {
        let report = report_image(session, path, &mut view).await;
        if report.failed() {
            failures += 1;
        }
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    }
    Ok(failures)
}

async fn report_image<P: ModelProvider>(
    session: &InferenceSession<P>,
    path: &Path,
    view: &mut ViewState,
) -> Report {
    let outcome = upload::classify_file(session, path, view).await;
    Report {
        image: path.display().to_string(),
        predictions: outcome.ok(),
        error: view.error().map(str::to_owned),
        pretrained: session
            .loaded_model()
            .is_some_and(|loaded| loaded.is_pretrained()),
    }
}
