//! Trial tables in the layout analysis scripts expect: UTF-8 with a BOM,
//! `True`/`False` booleans, an empty cell for a missing response.

use crate::error::ReportError;
use psylab_core::{PreferenceRecord, ResponseKey, TrialRecord};
use std::fmt::Write as _;
use std::path::Path;

const BOM: &str = "\u{feff}";

pub const TRIAL_HEADER: &str = "trial,angle,same,letter,response,rt,correct";
pub const PREFERENCE_HEADER: &str = "participant,left_image,right_image,choice,key,rt";

/// The key characters written in the `response` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLabels {
    pub same: char,
    pub mirror: char,
}

impl Default for KeyLabels {
    fn default() -> Self {
        Self {
            same: 'f',
            mirror: 'j',
        }
    }
}

impl KeyLabels {
    fn label(&self, key: ResponseKey) -> char {
        match key {
            ResponseKey::Same => self.same,
            ResponseKey::Mirror => self.mirror,
        }
    }
}

pub fn trial_table(records: &[TrialRecord], keys: KeyLabels) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(BOM);
    out.push_str(TRIAL_HEADER);
    out.push('\n');
    for r in records {
        let response = r
            .response
            .map(|k| keys.label(k).to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            r.trial,
            r.angle,
            py_bool(r.same),
            r.letter,
            response,
            float_cell(r.rt),
            py_bool(r.correct),
        );
    }
    out
}

pub fn preference_table(records: &[PreferenceRecord]) -> String {
    let mut out = String::from(BOM);
    out.push_str(PREFERENCE_HEADER);
    out.push('\n');
    for r in records {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            field(&r.participant),
            field(&r.left_image),
            field(&r.right_image),
            r.choice,
            r.key,
            float_cell(r.rt),
        );
    }
    out
}

pub fn write_trials(path: &Path, records: &[TrialRecord], keys: KeyLabels) -> Result<(), ReportError> {
    std::fs::write(path, trial_table(records, keys)).map_err(|e| ReportError::io(path, e))?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote trial data");
    Ok(())
}

pub fn write_preferences(path: &Path, records: &[PreferenceRecord]) -> Result<(), ReportError> {
    std::fs::write(path, preference_table(records)).map_err(|e| ReportError::io(path, e))?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote preference data");
    Ok(())
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Shortest round-trip float, always with a fractional part (`5.0`, not `5`)
fn float_cell(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
