//! Per-angle aggregation of a mental-rotation block.

use crate::error::ReportError;
use psylab_core::TrialRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// RT statistics over the correct trials at one angle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleRt {
    pub angle: u16,
    pub mean: f64,
    /// Sample standard deviation, absent below two trials
    pub std: Option<f64>,
    pub count: usize,
}

/// Proportion correct over all trials at one angle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleAccuracy {
    pub angle: u16,
    pub mean: f64,
    pub std: Option<f64>,
    pub count: usize,
}

/// Least-squares line through the per-angle mean RTs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Seconds per degree
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub trials: usize,
    /// Over all trials, timeouts included at the timeout value
    pub mean_rt: f64,
    pub accuracy: f64,
    pub rt_by_angle: Vec<AngleRt>,
    pub accuracy_by_angle: Vec<AngleAccuracy>,
    pub fit: Option<LinearFit>,
}

impl Summary {
    pub fn from_records(records: &[TrialRecord]) -> Result<Self, ReportError> {
        if records.is_empty() {
            return Err(ReportError::Empty);
        }

        let mut correct_rts: BTreeMap<u16, Vec<f64>> = BTreeMap::new();
        let mut hits: BTreeMap<u16, Vec<f64>> = BTreeMap::new();
        for r in records {
            hits.entry(r.angle)
                .or_default()
                .push(if r.correct { 1.0 } else { 0.0 });
            if r.correct {
                correct_rts.entry(r.angle).or_default().push(r.rt);
            }
        }

        let rt_by_angle: Vec<AngleRt> = correct_rts
            .into_iter()
            .map(|(angle, rts)| AngleRt {
                angle,
                mean: mean(&rts),
                std: sample_std(&rts),
                count: rts.len(),
            })
            .collect();

        let accuracy_by_angle = hits
            .into_iter()
            .map(|(angle, values)| AngleAccuracy {
                angle,
                mean: mean(&values),
                std: sample_std(&values),
                count: values.len(),
            })
            .collect();

        let points: Vec<(f64, f64)> = rt_by_angle
            .iter()
            .map(|a| (a.angle as f64, a.mean))
            .collect();

        let rts: Vec<f64> = records.iter().map(|r| r.rt).collect();
        let correct = records.iter().filter(|r| r.correct).count();

        Ok(Summary {
            trials: records.len(),
            mean_rt: mean(&rts),
            accuracy: correct as f64 / records.len() as f64,
            rt_by_angle,
            accuracy_by_angle,
            fit: linear_fit(&points),
        })
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| ReportError::io(path, e))?;
        tracing::info!(path = %path.display(), "wrote summary");
        Ok(())
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with n - 1 in the denominator
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Degree-1 least squares; needs two distinct x values
pub fn linear_fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx = points.iter().map(|p| (p.0 - mx).powi(2)).sum::<f64>();
    if sxx == 0.0 {
        return None;
    }
    let sxy = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum::<f64>();
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: my - slope * mx,
    })
}
