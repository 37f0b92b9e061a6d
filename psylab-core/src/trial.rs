use crate::stimulus::{Letter, LetterStimulus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trial state machine steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// "Trial i/N" banner before a main-block trial
    Progress,
    Fixation,
    Stimulus,
    /// Correct / wrong message after a practice trial
    Feedback,
    /// Shown when a main-block trial times out
    TooSlow,
    Blank,
    Complete,
}

/// One entry of a trial list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationTrial {
    pub angle: u16,
    pub same: bool,
    pub letter: Letter,
}

impl RotationTrial {
    pub fn reference(&self) -> LetterStimulus {
        LetterStimulus::reference(self.letter)
    }

    pub fn comparison(&self) -> LetterStimulus {
        LetterStimulus::comparison(self.letter, self.angle, self.same)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKey {
    Same,
    Mirror,
}

/// A same/mirror judgement is correct when the key matches the trial condition.
/// No response is never correct.
pub fn score(same: bool, response: Option<ResponseKey>) -> bool {
    matches!(
        (response, same),
        (Some(ResponseKey::Same), true) | (Some(ResponseKey::Mirror), false)
    )
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based position within its block
    pub trial: usize,
    pub angle: u16,
    pub same: bool,
    pub letter: Letter,
    pub response: Option<ResponseKey>,
    /// Seconds from stimulus onset, capped at the response timeout
    pub rt: f64,
    pub correct: bool,
}

impl TrialRecord {
    pub fn new(trial: usize, spec: &RotationTrial, response: Option<ResponseKey>, rt: f64) -> Self {
        Self {
            trial,
            angle: spec.angle,
            same: spec.same,
            letter: spec.letter,
            response,
            rt,
            correct: score(spec.same, response),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Outcome of the image-preference task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub participant: String,
    pub left_image: String,
    pub right_image: String,
    pub choice: Side,
    pub key: char,
    /// Seconds from onset of the image pair
    pub rt: f64,
}
