//! Structured content models: the generated post and its critique.

mod critique;
mod post;

pub use critique::{CritiqueResult, QualityScore, SubScores};
pub use post::GeneratedPost;
