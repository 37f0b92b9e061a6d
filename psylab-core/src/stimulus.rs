use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation angles (degrees, clockwise) used by the main block
pub const ANGLES: [u16; 7] = [0, 30, 60, 90, 120, 150, 180];

/// Defines stimuli and their render data
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    /// Identifies the glyph pixmap a renderer can reuse for this stimulus
    fn cache_key(&self) -> usize;
    fn is_mirrored(&self) -> bool;
}

/// Capital letters with no axis of symmetry, so a mirror image can never be
/// rotated back onto the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    F,
    G,
    J,
    K,
    L,
    P,
    Q,
    R,
    S,
    Z,
}

impl Letter {
    pub const ALL: [Letter; 10] = [
        Letter::F,
        Letter::G,
        Letter::J,
        Letter::K,
        Letter::L,
        Letter::P,
        Letter::Q,
        Letter::R,
        Letter::S,
        Letter::Z,
    ];

    pub fn as_char(&self) -> char {
        match self {
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::J => 'J',
            Letter::K => 'K',
            Letter::L => 'L',
            Letter::P => 'P',
            Letter::Q => 'Q',
            Letter::R => 'R',
            Letter::S => 'S',
            Letter::Z => 'Z',
        }
    }

    pub fn index(&self) -> usize {
        Letter::ALL
            .iter()
            .position(|l| l == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Checks an angle against the 30 degree grid of the task
pub fn validate_angle(angle: u16) -> Result<u16, CoreError> {
    if angle <= 180 && angle % 30 == 0 {
        Ok(angle)
    } else {
        Err(CoreError::InvalidAngle(angle))
    }
}

/// One letter drawn as a shadow + main glyph pair, rotated and optionally
/// mirrored about its vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterStimulus {
    pub letter: Letter,
    pub angle: u16,
    pub mirrored: bool,
}

impl LetterStimulus {
    /// Upright, unmirrored copy shown on the left
    pub fn reference(letter: Letter) -> Self {
        Self {
            letter,
            angle: 0,
            mirrored: false,
        }
    }

    pub fn comparison(letter: Letter, angle: u16, same: bool) -> Self {
        Self {
            letter,
            angle,
            mirrored: !same,
        }
    }
}

impl Stimulus for LetterStimulus {
    fn cache_key(&self) -> usize {
        self.letter.index()
    }

    fn is_mirrored(&self) -> bool {
        self.mirrored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_index_matches_table() {
        for (i, l) in Letter::ALL.iter().enumerate() {
            assert_eq!(l.index(), i);
        }
    }

    #[test]
    fn comparison_is_mirrored_only_for_different_trials() {
        let same = LetterStimulus::comparison(Letter::R, 90, true);
        let mirror = LetterStimulus::comparison(Letter::R, 90, false);
        assert!(!same.is_mirrored());
        assert!(mirror.is_mirrored());
        assert_eq!(same.cache_key(), mirror.cache_key());
        assert_eq!(LetterStimulus::reference(Letter::R).angle, 0);
    }

    #[test]
    fn angle_grid() {
        for a in ANGLES {
            assert_eq!(validate_angle(a), Ok(a));
        }
        assert_eq!(validate_angle(45), Err(CoreError::InvalidAngle(45)));
        assert_eq!(validate_angle(210), Err(CoreError::InvalidAngle(210)));
    }
}
