//! Core types shared by the Scenery crates: the label set, tensors and scores,
//! ranked predictions, and the view seam the pipeline reports through.

pub mod labels;
pub mod ranking;
pub mod tensor;
pub mod view;

pub use labels::{LabelError, LabelSet, SCENE_LABELS};
pub use ranking::{RankedPrediction, Ranking, format_percent};
pub use tensor::{InputTensor, Scores, TensorError};
pub use view::{Results, View, ViewState};
