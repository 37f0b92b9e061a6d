use crate::error::ExperimentError;
use psylab_core::{ANGLES, Key, Letter, ResponseKey, Side, validate_angle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mental-rotation task parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub angles: Vec<u16>,
    pub letters: Vec<Letter>,
    /// Trials per angle for each of the same / mirror conditions
    pub repeats_per_condition: usize,
    pub practice_trials: usize,
    pub response_timeout_ms: u64,
    /// Presented frames of the pulsing fixation cross
    pub fixation_frames: u32,
    /// Opacity is |sin(frame * pulse_rate)|
    pub pulse_rate: f32,
    pub progress_ms: u64,
    pub feedback_ms: u64,
    pub too_slow_ms: u64,
    pub blank_ms: u64,
    pub debrief_ms: u64,
    pub same_key: char,
    pub mirror_key: char,
    /// Horizontal distance of each letter from the centre
    pub letter_offset_px: f32,
    pub window_size: (u32, u32),
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            angles: ANGLES.to_vec(),
            letters: Letter::ALL.to_vec(),
            repeats_per_condition: 4,
            practice_trials: 8,
            response_timeout_ms: 5000,
            fixation_frames: 30,
            pulse_rate: 0.2,
            progress_ms: 1000,
            feedback_ms: 1000,
            too_slow_ms: 1000,
            blank_ms: 500,
            debrief_ms: 4000,
            same_key: 'f',
            mirror_key: 'j',
            letter_offset_px: 250.0,
            window_size: (1024, 768),
        }
    }
}

impl RotationConfig {
    pub fn main_trial_count(&self) -> usize {
        self.angles.len() * 2 * self.repeats_per_condition
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn response_key(&self, key: Key) -> Option<ResponseKey> {
        match key.as_char() {
            Some(c) if c == self.same_key => Some(ResponseKey::Same),
            Some(c) if c == self.mirror_key => Some(ResponseKey::Mirror),
            _ => None,
        }
    }

    pub fn key_char(&self, key: ResponseKey) -> char {
        match key {
            ResponseKey::Same => self.same_key,
            ResponseKey::Mirror => self.mirror_key,
        }
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.angles.is_empty() {
            return Err(ExperimentError::InvalidConfig("no rotation angles".into()));
        }
        for &angle in &self.angles {
            validate_angle(angle).map_err(|e| ExperimentError::InvalidConfig(e.to_string()))?;
        }
        if self.letters.is_empty() {
            return Err(ExperimentError::InvalidConfig("no stimulus letters".into()));
        }
        if self.repeats_per_condition == 0 {
            return Err(ExperimentError::InvalidConfig(
                "repeats_per_condition must be at least 1".into(),
            ));
        }
        if self.response_timeout_ms == 0 {
            return Err(ExperimentError::InvalidConfig(
                "response_timeout_ms must be positive".into(),
            ));
        }
        check_keys(self.same_key, self.mirror_key)
    }
}

/// Image-preference task parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceConfig {
    pub left_image: PathBuf,
    pub right_image: PathBuf,
    /// Displayed width of each image; height follows the aspect ratio
    pub target_width_px: f32,
    pub image_offset_px: f32,
    pub prompt: String,
    pub prompt_y: f32,
    pub left_key: char,
    pub right_key: char,
    pub result_hold_ms: u64,
    pub window_size: (u32, u32),
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            left_image: PathBuf::from("left.jpg"),
            right_image: PathBuf::from("right.jpg"),
            target_width_px: 300.0,
            image_offset_px: 400.0,
            prompt: "Which of the two do you resemble more? Press N for the left image, M for the right image"
                .to_string(),
            prompt_y: 300.0,
            left_key: 'n',
            right_key: 'm',
            result_hold_ms: 2000,
            window_size: (1280, 720),
        }
    }
}

impl PreferenceConfig {
    pub fn side_for(&self, key: Key) -> Option<Side> {
        match key.as_char() {
            Some(c) if c == self.left_key => Some(Side::Left),
            Some(c) if c == self.right_key => Some(Side::Right),
            _ => None,
        }
    }

    /// Both images must exist before any window is opened
    pub fn check_images(&self) -> Result<(), ExperimentError> {
        let missing: Vec<PathBuf> = [&self.left_image, &self.right_image]
            .into_iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExperimentError::MissingImage(missing))
        }
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.target_width_px <= 0.0 {
            return Err(ExperimentError::InvalidConfig(
                "target_width_px must be positive".into(),
            ));
        }
        check_keys(self.left_key, self.right_key)
    }
}

fn check_keys(a: char, b: char) -> Result<(), ExperimentError> {
    if a.to_ascii_lowercase() == b.to_ascii_lowercase() {
        return Err(ExperimentError::InvalidConfig(format!(
            "response keys must differ (both are {a:?})"
        )));
    }
    // the window maps only the letter keys a-z
    if !a.is_ascii_lowercase() || !b.is_ascii_lowercase() {
        return Err(ExperimentError::InvalidConfig(format!(
            "response keys must be lower-case letters a-z (got {a:?} and {b:?})"
        )));
    }
    Ok(())
}

/// Settings file: every field is optional and falls back to the defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub rotation: RotationConfig,
    pub preference: PreferenceConfig,
}

impl TaskConfig {
    pub fn from_json(s: &str) -> Result<Self, ExperimentError> {
        let mut config: TaskConfig = serde_json::from_str(s)?;
        config.normalize_keys();
        config.rotation.validate()?;
        config.preference.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ExperimentError> {
        let text = std::fs::read_to_string(path).map_err(|source| ExperimentError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "loaded task config");
        Ok(config)
    }

    fn normalize_keys(&mut self) {
        self.rotation.same_key = self.rotation.same_key.to_ascii_lowercase();
        self.rotation.mirror_key = self.rotation.mirror_key.to_ascii_lowercase();
        self.preference.left_key = self.preference.left_key.to_ascii_lowercase();
        self.preference.right_key = self.preference.right_key.to_ascii_lowercase();
    }
}
