use crate::stimulus::LetterStimulus;

/// Straight (non-premultiplied) RGBA
pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];
pub const GRAY: Rgba = [128, 128, 128, 255];
pub const RED: Rgba = [255, 0, 0, 255];
pub const GREEN: Rgba = [0, 128, 0, 255];
pub const YELLOW: Rgba = [255, 255, 0, 255];
pub const LIGHT_GREEN: Rgba = [144, 238, 144, 255];

/// Everything the renderer needs to draw one frame.
///
/// Offsets are pixels from the window centre with y growing downwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Scene {
    Blank,
    Message {
        text: String,
        size: f32,
        color: Rgba,
        offset: (f32, f32),
    },
    Fixation {
        opacity: f32,
    },
    /// Upright reference on the left, comparison on the right
    LetterPair {
        reference: LetterStimulus,
        comparison: LetterStimulus,
        offset_x: f32,
    },
    ImagePair {
        prompt: String,
        offset_x: f32,
        prompt_y: f32,
    },
}

impl Scene {
    pub fn message(text: impl Into<String>, size: f32, color: Rgba) -> Self {
        Scene::Message {
            text: text.into(),
            size,
            color,
            offset: (0.0, 0.0),
        }
    }

    pub fn message_at(text: impl Into<String>, size: f32, color: Rgba, offset: (f32, f32)) -> Self {
        Scene::Message {
            text: text.into(),
            size,
            color,
            offset,
        }
    }

    pub fn shows_stimulus(&self) -> bool {
        matches!(self, Scene::LetterPair { .. } | Scene::ImagePair { .. })
    }
}
