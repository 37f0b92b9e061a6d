pub mod error;
pub mod key;
pub mod phase;
pub mod scene;
pub mod stimulus;
pub mod trial;

pub use error::CoreError;
pub use key::Key;
pub use phase::{Phase, PreferencePhase, RotationPhase};
pub use scene::{Rgba, Scene};
pub use stimulus::{ANGLES, Letter, LetterStimulus, Stimulus, validate_angle};
pub use trial::{PreferenceRecord, ResponseKey, RotationTrial, Side, TrialRecord, TrialState, score};
