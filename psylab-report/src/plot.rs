//! Two-panel results figure: RT and accuracy against rotation angle.

use crate::error::ReportError;
use crate::summary::{LinearFit, Summary};
use plotters::prelude::*;
use plotters::style::FontStyle;
use psylab_core::TrialRecord;
use std::error::Error;
use std::path::Path;

pub const PLOT_SIZE: (u32, u32) = (1600, 600);

const FONT: &str = "sans-serif";
const TRIAL_COLOR: RGBColor = RGBColor(0, 200, 255);
const MEAN_COLOR: RGBColor = RGBColor(255, 64, 64);
const FIT_COLOR: RGBColor = RGBColor(255, 165, 0);

pub fn register_plot_font() -> Result<(), ReportError> {
    let bytes = psylab_assets::font_bytes()?;
    plotters::style::register_font(FONT, FontStyle::Normal, bytes)
        .map_err(|_| ReportError::Plot("font could not be parsed".into()))
}

pub fn save_results_plot(
    path: &Path,
    records: &[TrialRecord],
    summary: &Summary,
) -> Result<(), ReportError> {
    register_plot_font()?;
    draw(path, records, summary).map_err(|e| ReportError::Plot(e.to_string()))?;
    tracing::info!(path = %path.display(), "saved results plot");
    Ok(())
}

fn draw(path: &Path, records: &[TrialRecord], summary: &Summary) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&BLACK)?;
    let panels = root.split_evenly((1, 2));

    let x_range = -10.0f64..190.0f64;
    let label_style = (FONT, 16).into_font().color(&WHITE);

    // RT panel
    let trial_points: Vec<(f64, f64)> = records
        .iter()
        .filter(|r| r.correct)
        .map(|r| (r.angle as f64, r.rt))
        .collect();
    let y_max = trial_points
        .iter()
        .map(|p| p.1)
        .chain(summary.rt_by_angle.iter().map(|a| a.mean + a.std.unwrap_or(0.0)))
        .fold(0.5f64, f64::max)
        * 1.15;

    let mut rt_chart = ChartBuilder::on(&panels[0])
        .caption("Reaction Time vs Rotation Angle", (FONT, 22).into_font().color(&WHITE))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), 0.0f64..y_max)?;
    rt_chart
        .configure_mesh()
        .x_desc("Rotation Angle (degrees)")
        .y_desc("Reaction Time (s)")
        .axis_style(WHITE)
        .light_line_style(WHITE.mix(0.08))
        .bold_line_style(WHITE.mix(0.2))
        .label_style(label_style.clone())
        .axis_desc_style(label_style.clone())
        .draw()?;

    rt_chart
        .draw_series(
            trial_points
                .iter()
                .map(|&p| Circle::new(p, 4, TRIAL_COLOR.mix(0.5).filled())),
        )?
        .label("Individual Trials")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, TRIAL_COLOR.filled()));

    rt_chart.draw_series(summary.rt_by_angle.iter().map(|a| {
        let spread = a.std.unwrap_or(0.0);
        let x = a.angle as f64;
        ErrorBar::new_vertical(x, a.mean - spread, a.mean, a.mean + spread, MEAN_COLOR.filled(), 10)
    }))?;
    rt_chart
        .draw_series(
            summary
                .rt_by_angle
                .iter()
                .map(|a| Circle::new((a.angle as f64, a.mean), 7, MEAN_COLOR.filled())),
        )?
        .label("Mean RT")
        .legend(|(x, y)| Circle::new((x + 10, y), 6, MEAN_COLOR.filled()));

    if let Some(fit) = summary.fit {
        rt_chart
            .draw_series(
                dashes(fit, 0.0, 180.0, 24)
                    .into_iter()
                    .map(|seg| PathElement::new(seg, FIT_COLOR.stroke_width(2))),
            )?
            .label(format!("Slope: {:.2} ms/degree", fit.slope * 1000.0))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], FIT_COLOR.stroke_width(2)));
    }

    rt_chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(BLACK.mix(0.8))
        .border_style(WHITE)
        .label_font(label_style.clone())
        .draw()?;

    // accuracy panel
    let mut acc_chart = ChartBuilder::on(&panels[1])
        .caption("Accuracy vs Rotation Angle", (FONT, 22).into_font().color(&WHITE))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, -0.05f64..1.1f64)?;
    acc_chart
        .configure_mesh()
        .x_desc("Rotation Angle (degrees)")
        .y_desc("Accuracy")
        .axis_style(WHITE)
        .light_line_style(WHITE.mix(0.08))
        .bold_line_style(WHITE.mix(0.2))
        .label_style(label_style.clone())
        .axis_desc_style(label_style)
        .draw()?;

    acc_chart.draw_series(
        records
            .iter()
            .map(|r| (r.angle as f64, if r.correct { 1.0 } else { 0.0 }))
            .map(|p| Circle::new(p, 4, TRIAL_COLOR.mix(0.3).filled())),
    )?;
    acc_chart.draw_series(summary.accuracy_by_angle.iter().map(|a| {
        let spread = a.std.unwrap_or(0.0);
        let x = a.angle as f64;
        ErrorBar::new_vertical(x, a.mean - spread, a.mean, a.mean + spread, MEAN_COLOR.filled(), 10)
    }))?;
    acc_chart.draw_series(
        summary
            .accuracy_by_angle
            .iter()
            .map(|a| Circle::new((a.angle as f64, a.mean), 7, MEAN_COLOR.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Splits the fitted line over `[from, to]` into `n` dash segments
fn dashes(fit: LinearFit, from: f64, to: f64, n: usize) -> Vec<Vec<(f64, f64)>> {
    let n = n.max(1);
    let step = (to - from) / (2 * n - 1) as f64;
    (0..n)
        .map(|i| {
            let a = from + step * (2 * i) as f64;
            let b = a + step;
            vec![(a, fit.at(a)), (b, fit.at(b))]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::{Letter, ResponseKey, RotationTrial};

    #[test]
    fn dashes_span_the_range() {
        let fit = LinearFit {
            slope: 0.01,
            intercept: 0.5,
        };
        let segs = dashes(fit, 0.0, 180.0, 10);
        assert_eq!(segs.len(), 10);
        assert_eq!(segs[0][0], (0.0, 0.5));
        let last = segs[9][1];
        assert!((last.0 - 180.0).abs() < 1e-9);
        assert!((last.1 - 2.3).abs() < 1e-9);
    }

    #[test]
    fn writes_png_when_a_font_is_available() {
        if psylab_assets::font_bytes().is_err() {
            eprintln!("no font available, skipping");
            return;
        }
        let records: Vec<TrialRecord> = [0u16, 60, 120, 180]
            .iter()
            .enumerate()
            .flat_map(|(i, &angle)| {
                let spec = RotationTrial {
                    angle,
                    same: true,
                    letter: Letter::G,
                };
                [
                    TrialRecord::new(2 * i + 1, &spec, Some(ResponseKey::Same), 0.5 + angle as f64 / 200.0),
                    TrialRecord::new(2 * i + 2, &spec, Some(ResponseKey::Same), 0.6 + angle as f64 / 200.0),
                ]
            })
            .collect();
        let summary = Summary::from_records(&records).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r_results.png");
        save_results_plot(&path, &records, &summary).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
