use crate::config::RotationConfig;
use crate::design::{build_main_trials, build_practice_trials};
use crate::error::ExperimentError;
use crate::trial::Trial;
use psylab_core::scene::{GREEN, LIGHT_GREEN, RED, WHITE, YELLOW};
use psylab_core::{
    Key, Phase, ResponseKey, RotationPhase, RotationTrial, Scene, TrialRecord, TrialState,
};
use psylab_timing::Timer;
use rand::Rng;
use std::time::Duration;

const INSTRUCTIONS: &str = "Welcome to the mental rotation experiment!\n\n\
Two letters will appear side by side.\n\
Decide whether the right one is the SAME letter, only rotated,\n\
or its MIRROR image.\n\n\
Press {same} for Same\n\
Press {mirror} for Mirror\n\n\
Respond as quickly and accurately as you can.\n\n\
Practice comes first. Press SPACE to start practising...";

const PRACTICE_END: &str =
    "Practice finished!\n\nThe main experiment is about to begin.\n\nPress SPACE to start...";

#[derive(Debug, Clone, PartialEq)]
pub enum RotationEvent {
    PhaseStarted(RotationPhase),
    TrialStarted { practice: bool, index: usize },
    Responded { key: ResponseKey, rt: f64 },
    TimedOut,
    TrialComplete(TrialRecord),
    PracticeFinished(Vec<TrialRecord>),
    ExperimentFinished(Vec<TrialRecord>),
    Finished,
}

/// Frame-driven mental-rotation session.
///
/// Call `update` before drawing a frame, `frame_presented` right after the
/// frame reached the screen, and `handle_key` for every keypress.
pub struct RotationStateMachine<T>
where
    T: Timer<Timestamp = u64>,
{
    phase: RotationPhase,
    timer: T,
    config: RotationConfig,
    practice_trials: Vec<RotationTrial>,
    main_trials: Vec<RotationTrial>,
    current: Option<Trial<u64>>,
    phase_entered: u64,
    practice_results: Vec<TrialRecord>,
    results: Vec<TrialRecord>,
    pending: Vec<RotationEvent>,
}

impl<T> RotationStateMachine<T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new<R: Rng>(config: RotationConfig, timer: T, rng: &mut R) -> Result<Self, ExperimentError> {
        config.validate()?;
        let practice = build_practice_trials(&config, rng);
        let main = build_main_trials(&config, rng);
        Ok(Self::with_trials(config, timer, practice, main))
    }

    /// Session over fixed trial lists
    pub fn with_trials(
        config: RotationConfig,
        timer: T,
        practice_trials: Vec<RotationTrial>,
        main_trials: Vec<RotationTrial>,
    ) -> Self {
        let now = timer.now();
        Self {
            phase: RotationPhase::default(),
            timer,
            config,
            practice_trials,
            main_trials,
            current: None,
            phase_entered: now,
            practice_results: Vec::new(),
            results: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        match self.phase {
            phase if phase.awaits_space() => {
                if key == Key::Space {
                    self.advance_phase();
                    true
                } else {
                    false
                }
            }
            phase if phase.runs_trials() => match self.config.response_key(key) {
                Some(response) => self.record_response(response),
                None => false,
            },
            _ => false,
        }
    }

    /// Time-driven transitions; returns everything that happened since the last call
    pub fn update(&mut self) -> Vec<RotationEvent> {
        let now = self.timer.now();
        match self.phase {
            phase if phase.runs_trials() => self.update_trial(now),
            RotationPhase::Debrief => {
                let shown = self.timer.between(self.phase_entered, now);
                if shown >= Duration::from_millis(self.config.debrief_ms) {
                    self.advance_phase();
                }
            }
            _ => {}
        }
        std::mem::take(&mut self.pending)
    }

    /// Stamps stimulus onset and counts fixation frames
    pub fn frame_presented(&mut self) {
        let now = self.timer.now();
        let fixation_frames = self.config.fixation_frames;
        let Some(trial) = &mut self.current else {
            return;
        };
        match trial.state {
            TrialState::Fixation => {
                trial.fixation_frames_shown += 1;
                if trial.fixation_frames_shown >= fixation_frames {
                    trial.enter(TrialState::Stimulus, now);
                }
            }
            TrialState::Stimulus if trial.timestamps.onset.is_none() => {
                trial.timestamps.onset = Some(now);
                tracing::debug!(trial = trial.index + 1, onset_ns = now, "stimulus onset");
            }
            _ => {}
        }
    }

    fn advance_phase(&mut self) {
        let Some(next) = self.phase.next() else {
            return;
        };
        self.phase = next;
        self.phase_entered = self.timer.now();
        self.current = None;
        tracing::info!(phase = ?next, "phase started");
        self.pending.push(RotationEvent::PhaseStarted(next));

        match next {
            RotationPhase::Practice | RotationPhase::Experiment => self.start_trial(0),
            RotationPhase::Finished => self.pending.push(RotationEvent::Finished),
            _ => {}
        }
    }

    fn block(&self) -> &[RotationTrial] {
        if self.phase.is_practice() {
            &self.practice_trials
        } else {
            &self.main_trials
        }
    }

    fn start_trial(&mut self, index: usize) {
        let Some(spec) = self.block().get(index).copied() else {
            self.finish_block();
            return;
        };
        let practice = self.phase.is_practice();
        // Main-block trials open with a progress banner
        let first = if practice {
            TrialState::Fixation
        } else {
            TrialState::Progress
        };
        self.current = Some(Trial::new(index, spec, first, self.timer.now()));
        tracing::debug!(practice, trial = index + 1, angle = spec.angle, same = spec.same, letter = %spec.letter, "trial started");
        self.pending
            .push(RotationEvent::TrialStarted { practice, index });
    }

    fn finish_block(&mut self) {
        self.current = None;
        let event = if self.phase.is_practice() {
            RotationEvent::PracticeFinished(self.practice_results.clone())
        } else {
            RotationEvent::ExperimentFinished(self.results.clone())
        };
        self.pending.push(event);
        self.advance_phase();
    }

    fn update_trial(&mut self, now: u64) {
        let timeout = self.config.response_timeout();
        let Some(trial) = &self.current else {
            return;
        };
        let in_state = self.timer.between(trial.timestamps.state_entered, now);
        let (index, state, onset) = (trial.index, trial.state, trial.timestamps.onset);

        match state {
            TrialState::Progress => {
                if in_state >= Duration::from_millis(self.config.progress_ms) {
                    self.enter(TrialState::Fixation, now);
                }
            }
            TrialState::Fixation => {
                // Advanced by presented frames, see frame_presented
            }
            TrialState::Stimulus => {
                if let Some(onset) = onset {
                    if self.timer.between(onset, now) >= timeout {
                        self.resolve(None, timeout.as_secs_f64(), now);
                    }
                }
            }
            TrialState::Feedback => {
                if in_state >= Duration::from_millis(self.config.feedback_ms) {
                    self.start_trial(index + 1);
                }
            }
            TrialState::TooSlow => {
                if in_state >= Duration::from_millis(self.config.too_slow_ms) {
                    self.enter(TrialState::Blank, now);
                }
            }
            TrialState::Blank => {
                if in_state >= Duration::from_millis(self.config.blank_ms) {
                    self.start_trial(index + 1);
                }
            }
            TrialState::Complete => self.start_trial(index + 1),
        }
    }

    fn enter(&mut self, state: TrialState, now: u64) {
        if let Some(trial) = &mut self.current {
            trial.enter(state, now);
        }
    }

    /// Accepts a response only while the stimulus is on screen
    fn record_response(&mut self, key: ResponseKey) -> bool {
        let now = self.timer.now();
        let timeout = self.config.response_timeout();
        let Some((state, onset)) = self.current.as_ref().map(|t| (t.state, t.timestamps.onset))
        else {
            return false;
        };
        if state != TrialState::Stimulus {
            return false;
        }
        // Not yet visible
        let Some(onset) = onset else {
            return false;
        };
        let rt = self.timer.between(onset, now);
        if rt >= timeout {
            self.resolve(None, timeout.as_secs_f64(), now);
            return false;
        }
        self.resolve(Some(key), rt.as_secs_f64(), now);
        true
    }

    /// Scores the current trial and moves on to its post-response screen
    fn resolve(&mut self, response: Option<ResponseKey>, rt: f64, now: u64) {
        let practice = self.phase.is_practice();
        let Some(trial) = &mut self.current else {
            return;
        };
        let record = TrialRecord::new(trial.index + 1, &trial.spec, response, rt);
        tracing::info!(
            practice,
            trial = record.trial,
            angle = record.angle,
            same = record.same,
            response = ?record.response,
            rt_s = record.rt,
            correct = record.correct,
            "trial resolved"
        );
        trial.record = Some(record.clone());

        let next = match (practice, response) {
            (true, _) => TrialState::Feedback,
            (false, None) => TrialState::TooSlow,
            (false, Some(_)) => TrialState::Blank,
        };
        trial.enter(next, now);

        self.pending.push(match response {
            Some(key) => RotationEvent::Responded { key, rt },
            None => RotationEvent::TimedOut,
        });
        self.pending.push(RotationEvent::TrialComplete(record.clone()));
        if practice {
            self.practice_results.push(record);
        } else {
            self.results.push(record);
        }
    }

    pub fn scene(&self) -> Scene {
        match self.phase {
            RotationPhase::Instructions => Scene::message(
                INSTRUCTIONS
                    .replace("{same}", &self.config.same_key.to_ascii_uppercase().to_string())
                    .replace("{mirror}", &self.config.mirror_key.to_ascii_uppercase().to_string()),
                30.0,
                WHITE,
            ),
            RotationPhase::PracticeEnd => Scene::message(PRACTICE_END, 30.0, YELLOW),
            RotationPhase::Debrief => {
                let (mean_rt, accuracy) = session_means(&self.results);
                Scene::message(
                    format!(
                        "The experiment is over!\n\nThank you for taking part!\n\n\
                         Mean reaction time: {mean_rt:.3} s\nAccuracy: {:.1}%",
                        accuracy * 100.0
                    ),
                    30.0,
                    LIGHT_GREEN,
                )
            }
            RotationPhase::Practice | RotationPhase::Experiment => self.trial_scene(),
            RotationPhase::Finished => Scene::Blank,
        }
    }

    fn trial_scene(&self) -> Scene {
        let Some(trial) = &self.current else {
            return Scene::Blank;
        };
        match trial.state {
            TrialState::Progress => Scene::message_at(
                format!("Trial {}/{}", trial.index + 1, self.main_trials.len()),
                30.0,
                WHITE,
                (0.0, -300.0),
            ),
            TrialState::Fixation => Scene::Fixation {
                opacity: fixation_opacity(trial.fixation_frames_shown, self.config.pulse_rate),
            },
            TrialState::Stimulus => Scene::LetterPair {
                reference: trial.spec.reference(),
                comparison: trial.spec.comparison(),
                offset_x: self.config.letter_offset_px,
            },
            TrialState::Feedback => {
                let (text, color) = if trial.correct() {
                    ("Correct!", GREEN)
                } else {
                    ("Wrong!", RED)
                };
                Scene::message_at(text, 40.0, color, (0.0, 100.0))
            }
            TrialState::TooSlow => Scene::message("Too slow!", 40.0, RED),
            TrialState::Blank | TrialState::Complete => Scene::Blank,
        }
    }

    pub fn phase(&self) -> RotationPhase {
        self.phase
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn current_trial(&self) -> Option<&Trial<u64>> {
        self.current.as_ref()
    }

    pub fn current_trial_state(&self) -> Option<TrialState> {
        self.current.as_ref().map(|t| t.state)
    }

    /// (1-based trial, block length) while a block is running
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        if !self.phase.runs_trials() {
            return None;
        }
        self.current
            .as_ref()
            .map(|t| (t.index + 1, self.block().len()))
    }

    pub fn practice_trials(&self) -> &[RotationTrial] {
        &self.practice_trials
    }

    pub fn main_trials(&self) -> &[RotationTrial] {
        &self.main_trials
    }

    pub fn practice_results(&self) -> &[TrialRecord] {
        &self.practice_results
    }

    pub fn results(&self) -> &[TrialRecord] {
        &self.results
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }
}

/// Pulsing fixation: |sin(frame * rate)|
pub fn fixation_opacity(frame: u32, rate: f32) -> f32 {
    (frame as f32 * rate).sin().abs()
}

/// Mean RT over all trials (timeouts count at the timeout) and proportion correct
pub fn session_means(records: &[TrialRecord]) -> (f64, f64) {
    if records.is_empty() {
        return (0.0, 0.0);
    }
    let n = records.len() as f64;
    let mean_rt = records.iter().map(|r| r.rt).sum::<f64>() / n;
    let accuracy = records.iter().filter(|r| r.correct).count() as f64 / n;
    (mean_rt, accuracy)
}
