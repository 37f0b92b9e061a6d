//! Glue between the state machines, the renderer and the report writers.

use anyhow::{Context, Result};
use psylab_core::{Key, Scene, TrialRecord};
use psylab_experiment::rotation::session_means;
use psylab_experiment::{
    PreferenceConfig, PreferenceEvent, PreferenceStateMachine, RotationConfig, RotationEvent,
    RotationStateMachine,
};
use psylab_render::SkiaRenderer;
use psylab_report::{KeyLabels, SessionPaths, Summary, save_results_plot, write_preferences, write_trials};
use psylab_timing::Timer;

/// One runnable experiment as seen by the window loop
pub trait Task {
    fn title(&self) -> &'static str;
    fn window_size(&self) -> (u32, u32);
    /// Called once the renderer exists, before the first frame
    fn prepare(&mut self, _renderer: &mut SkiaRenderer) -> Result<()> {
        Ok(())
    }
    fn handle_key(&mut self, key: Key);
    /// Advances time-driven state and writes any finished outputs
    fn update(&mut self) -> Result<()>;
    fn scene(&self) -> Scene;
    fn frame_presented(&mut self);
    fn is_finished(&self) -> bool;
    /// Flushes whatever was collected before an early exit
    fn abort(&mut self) -> Result<()>;
}

pub struct RotationTask<T: Timer<Timestamp = u64>> {
    machine: RotationStateMachine<T>,
    paths: SessionPaths,
    keys: KeyLabels,
    practice_saved: bool,
    main_saved: bool,
}

impl<T: Timer<Timestamp = u64>> RotationTask<T> {
    pub fn new(machine: RotationStateMachine<T>, paths: SessionPaths) -> Self {
        let config: &RotationConfig = machine.config();
        let keys = KeyLabels {
            same: config.same_key,
            mirror: config.mirror_key,
        };
        Self {
            machine,
            paths,
            keys,
            practice_saved: false,
            main_saved: false,
        }
    }

    #[cfg(test)]
    pub fn machine(&self) -> &RotationStateMachine<T> {
        &self.machine
    }

    fn save_practice(&mut self, records: &[TrialRecord]) -> Result<()> {
        write_trials(&self.paths.practice_csv(), records, self.keys)?;
        self.practice_saved = true;
        Ok(())
    }

    fn save_main(&mut self, records: &[TrialRecord]) -> Result<()> {
        write_trials(&self.paths.main_csv(), records, self.keys)?;
        self.main_saved = true;

        let summary = Summary::from_records(records)?;
        summary.write_json(&self.paths.summary_json())?;
        if let Some(fit) = summary.fit {
            tracing::info!(
                slope_ms_per_deg = fit.slope * 1000.0,
                intercept_s = fit.intercept,
                "rotation slope"
            );
        }
        // a missing plot font should not cost the participant's data
        if let Err(e) = save_results_plot(&self.paths.plot_png(), records, &summary) {
            tracing::warn!(error = %e, "results plot skipped");
        }
        Ok(())
    }
}

impl<T: Timer<Timestamp = u64>> Task for RotationTask<T> {
    fn title(&self) -> &'static str {
        "Mental Rotation"
    }

    fn window_size(&self) -> (u32, u32) {
        self.machine.config().window_size
    }

    fn handle_key(&mut self, key: Key) {
        self.machine.handle_key(key);
    }

    fn update(&mut self) -> Result<()> {
        for event in self.machine.update() {
            match event {
                RotationEvent::PhaseStarted(phase) => tracing::info!(?phase, "phase started"),
                RotationEvent::TrialComplete(r) => tracing::debug!(
                    trial = r.trial,
                    angle = r.angle,
                    same = r.same,
                    rt = r.rt,
                    correct = r.correct,
                    "trial complete"
                ),
                RotationEvent::PracticeFinished(records) => {
                    self.save_practice(&records).context("saving practice data")?;
                }
                RotationEvent::ExperimentFinished(records) => {
                    let (mean_rt, accuracy) = session_means(&records);
                    tracing::info!(mean_rt, accuracy, trials = records.len(), "main block done");
                    self.save_main(&records).context("saving experiment data")?;
                }
                RotationEvent::Finished => tracing::info!("session finished"),
                _ => {}
            }
        }
        Ok(())
    }

    fn scene(&self) -> Scene {
        self.machine.scene()
    }

    fn frame_presented(&mut self) {
        self.machine.frame_presented();
    }

    fn is_finished(&self) -> bool {
        self.machine.is_finished()
    }

    fn abort(&mut self) -> Result<()> {
        tracing::warn!(phase = ?self.machine.phase(), "session aborted");
        let practice = self.machine.practice_results().to_vec();
        if !self.practice_saved && !practice.is_empty() {
            self.save_practice(&practice)?;
        }
        let main = self.machine.results().to_vec();
        if !self.main_saved && !main.is_empty() {
            write_trials(&self.paths.main_csv(), &main, self.keys)?;
            self.main_saved = true;
        }
        Ok(())
    }
}

pub struct PreferenceTask<T: Timer<Timestamp = u64>> {
    machine: PreferenceStateMachine<T>,
    paths: SessionPaths,
}

impl<T: Timer<Timestamp = u64>> PreferenceTask<T> {
    pub fn new(machine: PreferenceStateMachine<T>, paths: SessionPaths) -> Self {
        Self { machine, paths }
    }

    fn config(&self) -> &PreferenceConfig {
        self.machine.config()
    }
}

impl<T: Timer<Timestamp = u64>> Task for PreferenceTask<T> {
    fn title(&self) -> &'static str {
        "Image Preference"
    }

    fn window_size(&self) -> (u32, u32) {
        self.config().window_size
    }

    fn prepare(&mut self, renderer: &mut SkiaRenderer) -> Result<()> {
        let c = self.config();
        renderer
            .load_images(&c.left_image, &c.right_image, c.target_width_px)
            .context("loading choice images")?;
        Ok(())
    }

    fn handle_key(&mut self, key: Key) {
        self.machine.handle_key(key);
    }

    fn update(&mut self) -> Result<()> {
        for event in self.machine.update() {
            match event {
                PreferenceEvent::Chosen(record) => {
                    println!("You chose the {} image (RT = {:.3} s)", record.choice, record.rt);
                    write_preferences(&self.paths.main_csv(), &[record])
                        .context("saving preference data")?;
                }
                PreferenceEvent::Finished => tracing::info!("session finished"),
            }
        }
        Ok(())
    }

    fn scene(&self) -> Scene {
        self.machine.scene()
    }

    fn frame_presented(&mut self) {
        self.machine.frame_presented();
    }

    fn is_finished(&self) -> bool {
        self.machine.is_finished()
    }

    fn abort(&mut self) -> Result<()> {
        if self.machine.record().is_none() {
            tracing::warn!("aborted before a choice was made");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::{Letter, Phase, RotationTrial};
    use psylab_timing::ManualTimer;
    use std::path::Path;

    fn rotation_task(dir: &Path) -> (RotationTask<ManualTimer>, ManualTimer) {
        let clock = ManualTimer::new();
        let trial = |angle, same| RotationTrial {
            angle,
            same,
            letter: Letter::P,
        };
        let config = RotationConfig {
            practice_trials: 1,
            ..RotationConfig::default()
        };
        let machine = RotationStateMachine::with_trials(
            config,
            clock.clone(),
            vec![trial(0, true)],
            vec![trial(30, true), trial(90, false), trial(150, true)],
        );
        let paths = SessionPaths::rotation(dir, "05", "test");
        paths.ensure_dir().unwrap();
        (RotationTask::new(machine, paths), clock)
    }

    /// Runs frames until `done` holds, pressing `key` whenever a stimulus is up
    fn drive(
        task: &mut RotationTask<ManualTimer>,
        clock: &ManualTimer,
        key: Key,
        done: impl Fn(&RotationTask<ManualTimer>) -> bool,
    ) {
        for _ in 0..100_000 {
            if done(task) {
                return;
            }
            if task.machine().phase().awaits_space() {
                task.handle_key(Key::Space);
            }
            task.update().unwrap();
            let _ = task.scene();
            task.frame_presented();
            clock.advance_ms(16);
            if task.scene().shows_stimulus() {
                clock.advance_ms(300);
                task.handle_key(key);
            }
        }
        panic!("session did not reach the expected state");
    }

    #[test]
    fn full_session_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let (mut task, clock) = rotation_task(dir.path());
        drive(&mut task, &clock, Key::Char('f'), |t| t.is_finished());
        task.update().unwrap();

        let paths = SessionPaths::rotation(dir.path(), "05", "test");
        let practice = std::fs::read_to_string(paths.practice_csv()).unwrap();
        assert_eq!(practice.lines().count(), 2);
        let main = std::fs::read_to_string(paths.main_csv()).unwrap();
        assert_eq!(main.lines().count(), 4);
        assert!(paths.summary_json().is_file());
    }

    #[test]
    fn abort_flushes_partial_main_block() {
        let dir = tempfile::tempdir().unwrap();
        let (mut task, clock) = rotation_task(dir.path());
        drive(&mut task, &clock, Key::Char('j'), |t| t.machine().results().len() == 2);
        task.abort().unwrap();

        let paths = SessionPaths::rotation(dir.path(), "05", "test");
        assert!(paths.practice_csv().is_file());
        let main = std::fs::read_to_string(paths.main_csv()).unwrap();
        assert_eq!(main.lines().count(), 3);
        assert!(!paths.summary_json().exists());
    }

    #[test]
    fn preference_choice_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualTimer::new();
        let machine = PreferenceStateMachine::new(PreferenceConfig::default(), clock.clone(), "02");
        let paths = SessionPaths::preference(dir.path(), "02", "test");
        let mut task = PreferenceTask::new(machine, paths.clone());

        task.update().unwrap();
        task.frame_presented();
        clock.advance_ms(800);
        task.handle_key(Key::Char('n'));
        task.update().unwrap();

        let text = std::fs::read_to_string(paths.main_csv()).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("02,left.jpg,right.jpg,left,n,"));
        assert!(task.abort().is_ok());
    }
}
