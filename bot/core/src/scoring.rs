//! Score Policy
//!
//! The pseudo-random score/multiplier selection is a policy stub standing in
//! for real remote game scoring. It lives behind [`ScorePolicy`] so it can
//! be swapped without touching the state machine.

use rand::Rng;

use crate::config::GameConfig;

/// A play result to submit: score plus multiplier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Play {
    /// The score to report
    pub score: u32,
    /// The multiplier to report
    pub multiplier: String,
}

/// Source of play results for the orchestrator
pub trait ScorePolicy: Send {
    /// Produce the next play to submit
    fn next_play(&mut self) -> Play;
}

/// Draws scores uniformly from an inclusive range with a fixed multiplier
#[derive(Clone, Debug)]
pub struct UniformScorePolicy {
    score_min: u32,
    score_max: u32,
    multiplier: String,
}

impl UniformScorePolicy {
    /// Create a policy for the given inclusive score range
    ///
    /// An inverted range is normalized rather than rejected.
    pub fn new(score_min: u32, score_max: u32, multiplier: impl Into<String>) -> Self {
        let (score_min, score_max) = if score_min <= score_max {
            (score_min, score_max)
        } else {
            (score_max, score_min)
        };
        Self {
            score_min,
            score_max,
            multiplier: multiplier.into(),
        }
    }

    /// Create a policy from the game configuration
    #[must_use]
    pub fn from_config(game: &GameConfig) -> Self {
        Self::new(game.score_min, game.score_max, game.multiplier.clone())
    }
}

impl ScorePolicy for UniformScorePolicy {
    fn next_play(&mut self) -> Play {
        let score = rand::thread_rng().gen_range(self.score_min..=self.score_max);
        Play {
            score,
            multiplier: self.multiplier.clone(),
        }
    }
}
