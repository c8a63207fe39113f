//! Terminal view: ranked predictions as rows of label, percentage and bar.
//!
//! Loading messages go to stderr. Results are held back while the results
//! area is hidden and written once it is shown. Only the latest render is
//! held, so a newer result replaces an unshown older one.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use scenery_core::{Ranking, View};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::warn;

/// Width of a full (100%) bar, in cells.
pub const BAR_WIDTH: usize = 30;

/// Number of filled cells for `probability` on a bar of `width` cells.
pub fn filled_cells(probability: f32, width: usize) -> usize {
    if !probability.is_finite() {
        return 0;
    }
    let cells = (f64::from(probability.clamp(0.0, 1.0)) * width as f64).round() as usize;
    cells.min(width)
}

fn bar(filled: usize, width: usize) -> String {
    let mut s = String::with_capacity(width + 2);
    s.push('|');
    s.extend(std::iter::repeat_n('█', filled));
    s.extend(std::iter::repeat_n(' ', width - filled));
    s.push('|');
    s
}

/// One line per entry. `progress` scales every bar (0.0 empty, 1.0 final).
pub fn rows(ranking: &Ranking, width: usize, progress: f32) -> Vec<String> {
    let label_width = ranking.iter().map(|e| e.label.len()).max().unwrap_or(0);
    ranking
        .iter()
        .map(|entry| {
            let filled = filled_cells(entry.probability * progress, width);
            format!(
                "{:<label_width$}  {:>7}  {}",
                entry.label,
                entry.percent(),
                bar(filled, width)
            )
        })
        .collect()
}

/// Draws the bars empty, waits, then redraws them filled in place.
#[derive(Debug, Clone, Copy)]
pub struct BarAnimation {
    pub delay: Duration,
}

impl Default for BarAnimation {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(120),
        }
    }
}

impl BarAnimation {
    pub fn play(&self, out: &mut impl Write, ranking: &Ranking, width: usize) -> io::Result<()> {
        let start = rows(ranking, width, 0.0);
        for line in &start {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        pause(self.delay);

        // Move the cursor back to the first row and overwrite.
        write!(out, "\x1b[{}A", start.len())?;
        for line in rows(ranking, width, 1.0) {
            writeln!(out, "\r{line}")?;
        }
        out.flush()
    }
}

/// Sleep without stalling other tasks on a multi-threaded runtime.
fn pause(delay: Duration) {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| thread::sleep(delay));
        }
        _ => thread::sleep(delay),
    }
}

enum Pending {
    Ranking(Ranking),
    Error(String),
}

pub struct TerminalView<W: Write> {
    out: W,
    animation: Option<BarAnimation>,
    loading: bool,
    results_visible: bool,
    pending: Option<Pending>,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, animation: Option<BarAnimation>) -> Self {
        Self {
            out,
            animation,
            loading: false,
            results_visible: false,
            pending: None,
        }
    }

    /// Print a section heading (the file being classified).
    pub fn heading(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "\n{text}") {
            warn!(error = %e, "failed to write heading");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let result = match &pending {
            Pending::Ranking(ranking) => match self.animation {
                Some(animation) => animation.play(&mut self.out, ranking, BAR_WIDTH),
                None => rows(ranking, BAR_WIDTH, 1.0)
                    .iter()
                    .try_for_each(|line| writeln!(self.out, "{line}")),
            },
            Pending::Error(message) => writeln!(self.out, "{message}"),
        };
        if let Err(e) = result.and_then(|()| self.out.flush()) {
            warn!(error = %e, "failed to write results");
        }
    }
}

impl<W: Write> View for TerminalView<W> {
    fn set_loading(&mut self, visible: bool) {
        self.loading = visible;
    }

    fn loading_message(&mut self, message: &str) {
        if self.loading {
            eprintln!("{message}");
        }
    }

    fn set_results_visible(&mut self, visible: bool) {
        self.results_visible = visible;
        if visible {
            self.flush_pending();
        }
    }

    fn render(&mut self, ranking: &Ranking) {
        self.pending = Some(Pending::Ranking(ranking.clone()));
        if self.results_visible {
            self.flush_pending();
        }
    }

    fn render_error(&mut self, message: &str) {
        self.pending = Some(Pending::Error(message.to_string()));
        if self.results_visible {
            self.flush_pending();
        }
    }

    fn show_preview(&mut self, width: u32, height: u32) {
        eprintln!("decoded {width}x{height} image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_core::{LabelSet, Scores};

    fn reference() -> Ranking {
        let labels = LabelSet::scenes();
        let scores =
            Scores::validate(vec![0.05, 0.02, 0.83, 0.01, 0.04, 0.05], &labels).unwrap();
        Ranking::from_scores(&scores, &labels)
    }

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn bar_fill_is_proportional() {
        assert_eq!(filled_cells(0.0, 30), 0);
        assert_eq!(filled_cells(0.5, 30), 15);
        assert_eq!(filled_cells(0.83, 30), 25);
        assert_eq!(filled_cells(1.0, 30), 30);
        assert_eq!(filled_cells(1.5, 30), 30);
        assert_eq!(filled_cells(f32::NAN, 30), 0);
    }

    #[test]
    fn rows_follow_ranking_order() {
        let lines = rows(&reference(), 10, 1.0);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("glacier "));
        assert!(lines[0].contains("83.00%"));
        assert!(lines[1].starts_with("buildings"));
        assert!(lines[2].starts_with("street "));
        assert!(lines[3].starts_with("sea "));
        assert!(lines[4].starts_with("forest "));
        assert!(lines[5].starts_with("mountain "));
        assert!(lines[5].contains("1.00%"));
    }

    #[test]
    fn rows_at_zero_progress_are_empty_bars() {
        for line in rows(&reference(), 10, 0.0) {
            assert!(line.ends_with(&format!("|{}|", " ".repeat(10))));
        }
    }

    #[test]
    fn results_wait_until_visible() {
        let mut view = TerminalView::new(Vec::new(), None);
        view.set_results_visible(false);
        view.render(&reference());
        assert!(view.out.is_empty());

        view.set_results_visible(true);
        let text = output(view);
        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().next().unwrap().starts_with("glacier"));
    }

    #[test]
    fn error_replaces_pending_ranking() {
        let mut view = TerminalView::new(Vec::new(), None);
        view.render(&reference());
        view.render_error("Error: Could not process the image. truncated file");
        view.set_results_visible(true);

        assert_eq!(
            output(view),
            "Error: Could not process the image. truncated file\n"
        );
    }

    #[test]
    fn animation_redraws_in_place() {
        let animation = BarAnimation {
            delay: Duration::ZERO,
        };
        let mut view = TerminalView::new(Vec::new(), Some(animation));
        view.set_results_visible(true);
        view.render(&reference());

        let text = output(view);
        assert!(text.contains("\x1b[6A"));
        let final_frame = text.split("\x1b[6A").nth(1).unwrap();
        assert!(final_frame.contains(&"█".repeat(filled_cells(0.83, BAR_WIDTH))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn animation_runs_inside_runtime() {
        let animation = BarAnimation {
            delay: Duration::from_millis(5),
        };
        let mut view = TerminalView::new(Vec::new(), Some(animation));
        view.set_results_visible(true);
        view.render(&reference());

        assert!(output(view).contains("\x1b[6A"));
    }
}
