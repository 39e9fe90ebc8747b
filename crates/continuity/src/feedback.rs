//! Relevance feedback.

use chatty_core::memory::clamp_score;
use serde::{Deserialize, Serialize};

const HELPFUL_DELTA: f32 = 0.1;
const UNHELPFUL_DELTA: f32 = -0.05;
const CONTEXT_WEIGHT: f32 = 0.1;
const USER_FEEDBACK_WEIGHT: f32 = 0.2;

/// How useful an injected memory turned out to be.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RelevanceFeedback {
    pub was_helpful: bool,
    /// How well the memory fit the turn, usually in `[0, 1]`
    #[serde(default)]
    pub context_relevance: f32,
    /// Explicit rating from the user, usually in `[-1, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<f32>,
}

impl RelevanceFeedback {
    pub fn helpful() -> Self {
        Self {
            was_helpful: true,
            ..Default::default()
        }
    }

    /// New relevance for a memory currently scored `current`. The score is
    /// clamped to `[0, 1]` after each term.
    pub fn adjusted_relevance(&self, current: f32) -> f32 {
        let helpful = if self.was_helpful {
            HELPFUL_DELTA
        } else {
            UNHELPFUL_DELTA
        };
        let mut relevance = clamp_score(current);
        relevance = clamp_score(relevance + helpful);
        relevance = clamp_score(relevance + self.context_relevance * CONTEXT_WEIGHT);
        clamp_score(relevance + self.user_feedback.unwrap_or(0.0) * USER_FEEDBACK_WEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpful_raises_by_a_tenth() {
        let next = RelevanceFeedback::helpful().adjusted_relevance(0.5);
        assert!((next - 0.6).abs() < 1e-6);
    }

    #[test]
    fn unhelpful_lowers_slightly() {
        let feedback = RelevanceFeedback::default();
        assert!((feedback.adjusted_relevance(0.5) - 0.45).abs() < 1e-6);
        assert_eq!(feedback.adjusted_relevance(0.0), 0.0);
    }

    #[test]
    fn all_terms_combine_and_clamp() {
        let feedback = RelevanceFeedback {
            was_helpful: true,
            context_relevance: 1.0,
            user_feedback: Some(1.0),
        };
        assert!((feedback.adjusted_relevance(0.2) - 0.6).abs() < 1e-6);
        assert_eq!(feedback.adjusted_relevance(0.95), 1.0);

        let harsh = RelevanceFeedback {
            was_helpful: false,
            context_relevance: 0.0,
            user_feedback: Some(-1.0),
        };
        assert_eq!(harsh.adjusted_relevance(0.1), 0.0);
    }

    #[test]
    fn nan_inputs_do_not_escape() {
        let feedback = RelevanceFeedback {
            was_helpful: true,
            context_relevance: f32::NAN,
            user_feedback: None,
        };
        let next = feedback.adjusted_relevance(0.5);
        assert!((0.0..=1.0).contains(&next));
    }
}
