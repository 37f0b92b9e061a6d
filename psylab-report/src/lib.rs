//! Session outputs: trial tables, the per-angle summary and the results figure.

pub mod csv;
pub mod error;
pub mod output;
pub mod plot;
pub mod summary;

pub use csv::{KeyLabels, write_preferences, write_trials};
pub use error::ReportError;
pub use output::{SessionPaths, date_stamp};
pub use plot::save_results_plot;
pub use summary::{AngleAccuracy, AngleRt, LinearFit, Summary};
