use crate::{SimilarityMatch, UniquenessLevel};

/// Scores at or below this are high uniqueness.
pub const HIGH_UNIQUENESS_MAX: f64 = 20.0;
/// Scores at or below this (and above [`HIGH_UNIQUENESS_MAX`]) are medium.
pub const MEDIUM_UNIQUENESS_MAX: f64 = 50.0;

/// Mean similarity of unreferenced matches, or 0 when there are none.
pub fn overall_score(matches: &[SimilarityMatch]) -> f64 {
    let unreferenced: Vec<f64> = matches
        .iter()
        .filter(|m| !m.is_referenced)
        .map(|m| m.similarity_percentage)
        .collect();
    if unreferenced.is_empty() {
        return 0.0;
    }
    unreferenced.iter().sum::<f64>() / unreferenced.len() as f64
}

pub fn uniqueness_level(score: f64) -> UniquenessLevel {
    if score <= HIGH_UNIQUENESS_MAX {
        UniquenessLevel::High
    } else if score <= MEDIUM_UNIQUENESS_MAX {
        UniquenessLevel::Medium
    } else {
        UniquenessLevel::Low
    }
}

/// Overall score and its uniqueness level.
pub fn aggregate(matches: &[SimilarityMatch]) -> (f64, UniquenessLevel) {
    let score = overall_score(matches);
    (score, uniqueness_level(score))
}
