//! The surface a prediction is reported on.
//!
//! The inference session drives a [`View`]: it toggles the loading indicator,
//! updates its text, and fills the results area with either a ranking or an
//! error message. Each render replaces whatever the results area held before.

use serde::Serialize;

use crate::ranking::Ranking;

pub trait View {
    /// Show or hide the loading indicator.
    fn set_loading(&mut self, visible: bool);

    /// Replace the loading indicator text.
    fn loading_message(&mut self, message: &str);

    /// Show or hide the results area.
    fn set_results_visible(&mut self, visible: bool);

    /// Replace the results area with a ranking.
    fn render(&mut self, ranking: &Ranking);

    /// Replace the results area with an error message.
    fn render_error(&mut self, message: &str);

    /// Show the decoded image before it is classified.
    fn show_preview(&mut self, _width: u32, _height: u32) {}
}

/// What the results area currently holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Results {
    #[default]
    Empty,
    Ranking(Ranking),
    Error(String),
}

/// In-memory view that records the latest state, for headless callers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub loading: bool,
    pub loading_text: String,
    pub results_visible: bool,
    pub results: Results,
    /// Every loading message shown, oldest first.
    pub loading_history: Vec<String>,
    /// Number of renders (ranking or error) so far.
    pub renders: usize,
    /// Dimensions of the last previewed image.
    pub preview: Option<(u32, u32)>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranking(&self) -> Option<&Ranking> {
        match &self.results {
            Results::Ranking(ranking) => Some(ranking),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.results {
            Results::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl View for ViewState {
    fn set_loading(&mut self, visible: bool) {
        self.loading = visible;
    }

    fn loading_message(&mut self, message: &str) {
        self.loading_text = message.to_string();
        self.loading_history.push(message.to_string());
    }

    fn set_results_visible(&mut self, visible: bool) {
        self.results_visible = visible;
    }

    fn render(&mut self, ranking: &Ranking) {
        self.results = Results::Ranking(ranking.clone());
        self.renders += 1;
    }

    fn render_error(&mut self, message: &str) {
        self.results = Results::Error(message.to_string());
        self.renders += 1;
    }

    fn show_preview(&mut self, width: u32, height: u32) {
        self.preview = Some((width, height));
    }
}
