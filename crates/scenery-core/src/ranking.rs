//! Ranking of raw model scores against a label set.
//!
//! The ranking is pure data: pairing each score with its label and index,
//! then a stable descending sort. How the ranking is drawn is up to a
//! [`View`](crate::View).

use serde::Serialize;

use crate::labels::LabelSet;
use crate::tensor::Scores;

/// One label with its probability and its position in the model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPrediction {
    pub label: String,
    pub probability: f32,
    pub original_index: usize,
}

impl RankedPrediction {
    /// Probability as a percentage string, e.g. `82.73%`.
    pub fn percent(&self) -> String {
        format_percent(self.probability)
    }
}

/// Predictions ordered by descending probability.
///
/// Equal probabilities keep their original output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ranking {
    entries: Vec<RankedPrediction>,
}

impl Ranking {
    pub fn from_scores(scores: &Scores, labels: &LabelSet) -> Self {
        let mut entries: Vec<RankedPrediction> = scores
            .as_slice()
            .iter()
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (&probability, label))| RankedPrediction {
                label: label.to_string(),
                probability,
                original_index: i,
            })
            .collect();

        // `sort_by` is stable, so ties stay in output order.
        entries.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));

        Self { entries }
    }

    /// Highest-probability entry.
    pub fn top(&self) -> Option<&RankedPrediction> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[RankedPrediction] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedPrediction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in ranked order.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }
}

/// NaN scores sort after every real score.
fn sort_key(entry: &RankedPrediction) -> f32 {
    if entry.probability.is_nan() {
        f32::NEG_INFINITY
    } else {
        entry.probability
    }
}

/// Render a probability as `NN.NN%`.
///
/// The value is widened to `f64`, scaled by 100 and rounded to two decimals
/// by the standard float formatter (nearest, ties to even).
pub fn format_percent(probability: f32) -> String {
    format!("{:.2}%", f64::from(probability) * 100.0)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn rank(values: &[f32]) -> Ranking {
        let labels = LabelSet::scenes();
        let scores = Scores::validate(values.to_vec(), &labels).unwrap();
        Ranking::from_scores(&scores, &labels)
    }

    #[test]
    fn ranks_reference_vector() {
        let ranking = rank(&[0.05, 0.02, 0.83, 0.01, 0.04, 0.05]);

        let rendered: Vec<(String, String)> = ranking
            .iter()
            .map(|e| (e.label.clone(), e.percent()))
            .collect();
        let expected = [
            ("glacier", "83.00%"),
            ("buildings", "5.00%"),
            ("street", "5.00%"),
            ("sea", "4.00%"),
            ("forest", "2.00%"),
            ("mountain", "1.00%"),
        ];
        assert_eq!(rendered.len(), expected.len());
        for ((label, pct), (want_label, want_pct)) in rendered.iter().zip(expected) {
            assert_eq!(label, want_label);
            assert_eq!(pct, want_pct);
        }
    }

    #[test]
    fn ties_keep_output_order() {
        let ranking = rank(&[0.05, 0.02, 0.83, 0.01, 0.04, 0.05]);
        let tied: Vec<usize> = ranking
            .iter()
            .filter(|e| e.probability == 0.05)
            .map(|e| e.original_index)
            .collect();
        assert_eq!(tied, vec![0, 5]);

        let flat = rank(&[0.5; 6]);
        let order: Vec<usize> = flat.iter().map(|e| e.original_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }

    proptest! {
        #[test]
        fn ranking_is_a_sorted_permutation(values in prop::array::uniform6(0.0f32..=1.0)) {
            let ranking = rank(&values);
            prop_assert_eq!(ranking.len(), 6);

            for pair in ranking.entries().windows(2) {
                prop_assert!(pair[0].probability >= pair[1].probability);
            }

            let mut indices: Vec<usize> = ranking.iter().map(|e| e.original_index).collect();
            indices.sort_unstable();
            prop_assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);

            let scenes = LabelSet::scenes();
            for entry in ranking.iter() {
                prop_assert_eq!(entry.probability, values[entry.original_index]);
                prop_assert_eq!(
                    Some(entry.label.as_str()),
                    scenes.get(entry.original_index)
                );
            }
        }

        #[test]
        fn ranking_twice_is_identical(values in prop::array::uniform6(0.0f32..=1.0)) {
            let first = rank(&values);
            let second = rank(&values);
            prop_assert_eq!(first.labels(), second.labels());
        }
    }

    #[test]
    fn nan_sorts_last() {
        let ranking = rank(&[0.1, f32::NAN, 0.7, 0.0, 0.1, 0.1]);
        assert_eq!(ranking.len(), 6);
        assert_eq!(ranking.top().map(|e| e.original_index), Some(2));
        assert_eq!(ranking.entries()[5].original_index, 1);
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(0.8273), "82.73%");
        assert_eq!(format_percent(0.05), "5.00%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(0.123456), "12.35%");
    }

    #[test]
    fn top_is_highest() {
        let ranking = rank(&[0.1, 0.6, 0.1, 0.1, 0.05, 0.05]);
        assert_eq!(ranking.top().map(|e| e.label.as_str()), Some("forest"));
    }

    #[test]
    fn serializes_as_list() {
        let ranking = rank(&[0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let json = serde_json::to_value(&ranking).unwrap();
        let first = &json.as_array().unwrap()[0];
        assert_eq!(first["label"], "glacier");
        assert_eq!(first["original_index"], 2);
    }
}
