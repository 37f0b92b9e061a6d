pub mod config;
pub mod design;
pub mod error;
pub mod preference;
pub mod rotation;
pub mod trial;

pub use config::{PreferenceConfig, RotationConfig, TaskConfig};
pub use error::ExperimentError;
pub use preference::{PreferenceEvent, PreferenceStateMachine};
pub use rotation::{RotationEvent, RotationStateMachine};
pub use trial::{Trial, TrialTimestamps};
