//! Interaction scoring
//!
//! Maps a raw interaction signal (like, watch time, optional duration,
//! "don't suggest" flag, comment presence) to a bounded reward in [0, 1].
//! Pure computation: no state, safe to call from any number of concurrent
//! callers.

use reco_core::{validate_duration, validate_watch_time, RecoError};
use serde::{Deserialize, Serialize};

/// Watch ratios at or above this are treated as a full watch, to tolerate
/// trailing-edge playback noise.
pub const NEAR_FULL_WATCH: f32 = 0.98;

/// Scoring weights, overridable per call.
///
/// `count_comments` gates the comment bonus term entirely; the original
/// product decision was to ignore comments, so it defaults to off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub watch: f32,
    pub like_bonus: f32,
    pub comment_bonus: f32,
    pub dont_suggest_penalty: f32,
    pub count_comments: bool,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            watch: 0.6,
            like_bonus: 0.4,
            comment_bonus: 0.05,
            dont_suggest_penalty: -0.6,
            count_comments: false,
        }
    }
}

/// One user↔item interaction event, as submitted by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: u64,
    pub item_id: u64,
    #[serde(default)]
    pub like: bool,
    #[serde(default)]
    pub watch_time: f32,
    #[serde(default)]
    pub duration: Option<f32>,
    #[serde(default)]
    pub dont_suggest: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub weights: Option<ScoreWeights>,
}

impl Interaction {
    /// Reject malformed payloads before they reach the update path.
    pub fn validate(&self) -> Result<(), RecoError> {
        validate_watch_time(self.watch_time)?;
        validate_duration(self.duration)?;
        Ok(())
    }

    fn has_comment(&self) -> bool {
        self.comment
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }

    /// The bounded reward for this interaction, using per-call weight
    /// overrides when supplied.
    pub fn reward(&self) -> f32 {
        let weights = self.weights.unwrap_or_default();
        interaction_score(
            self.like,
            self.watch_time,
            self.duration,
            self.dont_suggest,
            self.has_comment(),
            &weights,
        )
    }
}

/// Compute the interaction reward in [0, 1].
///
/// The watch ratio is `watch_time / duration` when a positive duration is
/// given. Without a duration, `watch_time` itself is treated as a ratio; a
/// value above 1.0 is assumed to be raw seconds and softly saturated via
/// `r / (r + 60)`.
pub fn interaction_score(
    like: bool,
    watch_time: f32,
    duration: Option<f32>,
    dont_suggest: bool,
    has_comment: bool,
    weights: &ScoreWeights,
) -> f32 {
    let mut watch_ratio = match duration {
        Some(d) if d > 0.0 => watch_time / d,
        _ => {
            if watch_time > 1.0 {
                watch_time / (watch_time + 60.0)
            } else {
                watch_time
            }
        }
    };

    watch_ratio = watch_ratio.clamp(0.0, 1.0);
    if watch_ratio >= NEAR_FULL_WATCH {
        watch_ratio = 1.0;
    }

    let mut score = weights.watch * watch_ratio;
    if like {
        score += weights.like_bonus;
    }
    if has_comment && weights.count_comments {
        score += weights.comment_bonus;
    }
    if dont_suggest {
        score += weights.dont_suggest_penalty;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(like: bool, watch_time: f32, duration: Option<f32>) -> Interaction {
        Interaction {
            user_id: 1,
            item_id: 2,
            like,
            watch_time,
            duration,
            dont_suggest: false,
            comment: None,
            weights: None,
        }
    }

    #[test]
    fn test_full_watch_with_like_is_one() {
        let w = ScoreWeights::default();
        let score = interaction_score(true, 600.0, Some(600.0), false, false, &w);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_zero_watch_without_like_is_zero() {
        let w = ScoreWeights::default();
        let score = interaction_score(false, 0.0, Some(600.0), false, false, &w);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_near_full_watch_snaps_to_one() {
        let w = ScoreWeights::default();
        let snapped = interaction_score(false, 590.0, Some(600.0), false, false, &w);
        assert_eq!(snapped, w.watch);

        let not_snapped = interaction_score(false, 570.0, Some(600.0), false, false, &w);
        assert!(not_snapped < w.watch);
    }

    #[test]
    fn test_missing_duration_ratio_passthrough() {
        let w = ScoreWeights::default();
        let score = interaction_score(false, 0.5, None, false, false, &w);
        assert!((score - w.watch * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_missing_duration_seconds_saturation() {
        let w = ScoreWeights::default();
        // 120 seconds without a duration: compressed to 120/(120+60) = 2/3
        let score = interaction_score(false, 120.0, None, false, false, &w);
        assert!((score - w.watch * (120.0 / 180.0)).abs() < 1e-6);
    }

    #[test]
    fn test_dont_suggest_penalty_floors_at_zero() {
        let w = ScoreWeights::default();
        let score = interaction_score(false, 300.0, Some(600.0), true, false, &w);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_comment_bonus_disabled_by_default() {
        let w = ScoreWeights::default();
        let with_comment = interaction_score(false, 300.0, Some(600.0), false, true, &w);
        let without = interaction_score(false, 300.0, Some(600.0), false, false, &w);
        assert_eq!(with_comment, without);

        let counting = ScoreWeights { count_comments: true, ..Default::default() };
        let with_comment = interaction_score(false, 300.0, Some(600.0), false, true, &counting);
        assert!((with_comment - (without + counting.comment_bonus)).abs() < 1e-6);
    }

    #[test]
    fn test_score_is_always_bounded() {
        let heavy = ScoreWeights { watch: 5.0, like_bonus: 5.0, ..Default::default() };
        let score = interaction_score(true, 600.0, Some(600.0), false, false, &heavy);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_interaction_reward_and_validation() {
        let i = interaction(true, 600.0, Some(600.0));
        assert!(i.validate().is_ok());
        assert_eq!(i.reward(), 1.0);

        let bad = interaction(false, -1.0, None);
        assert!(bad.validate().is_err());

        let bad = interaction(false, 10.0, Some(0.0));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_blank_comment_is_no_comment() {
        let mut i = interaction(false, 300.0, Some(600.0));
        i.comment = Some("   ".to_string());
        i.weights = Some(ScoreWeights { count_comments: true, ..Default::default() });
        let blank = i.reward();

        i.comment = Some("great".to_string());
        let real = i.reward();
        assert!(real > blank);
    }
}
