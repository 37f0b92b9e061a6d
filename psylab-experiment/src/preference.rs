use crate::config::PreferenceConfig;
use psylab_core::{Key, Phase, PreferencePhase, PreferenceRecord, Scene};
use psylab_timing::Timer;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceEvent {
    Chosen(PreferenceRecord),
    Finished,
}

/// Single-trial two-alternative forced choice between two images
pub struct PreferenceStateMachine<T>
where
    T: Timer<Timestamp = u64>,
{
    phase: PreferencePhase,
    timer: T,
    config: PreferenceConfig,
    participant: String,
    onset: Option<u64>,
    phase_entered: u64,
    record: Option<PreferenceRecord>,
    pending: Vec<PreferenceEvent>,
}

impl<T> PreferenceStateMachine<T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new(config: PreferenceConfig, timer: T, participant: impl Into<String>) -> Self {
        let now = timer.now();
        Self {
            phase: PreferencePhase::default(),
            timer,
            config,
            participant: participant.into(),
            onset: None,
            phase_entered: now,
            record: None,
            pending: Vec::new(),
        }
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        if self.phase != PreferencePhase::Choice {
            return false;
        }
        let (Some(side), Some(onset)) = (self.config.side_for(key), self.onset) else {
            return false;
        };
        let now = self.timer.now();
        let rt = self.timer.between(onset, now).as_secs_f64();
        let record = PreferenceRecord {
            participant: self.participant.clone(),
            left_image: self.config.left_image.display().to_string(),
            right_image: self.config.right_image.display().to_string(),
            choice: side,
            key: key.as_char().unwrap_or_default(),
            rt,
        };
        tracing::info!(choice = %side, rt_s = rt, "choice recorded");
        self.record = Some(record.clone());
        self.pending.push(PreferenceEvent::Chosen(record));
        self.advance_phase();
        true
    }

    pub fn update(&mut self) -> Vec<PreferenceEvent> {
        if self.phase == PreferencePhase::Result {
            let held = self.timer.elapsed(self.phase_entered);
            if held >= Duration::from_millis(self.config.result_hold_ms) {
                self.advance_phase();
            }
        }
        std::mem::take(&mut self.pending)
    }

    pub fn frame_presented(&mut self) {
        if self.phase == PreferencePhase::Choice && self.onset.is_none() {
            let now = self.timer.now();
            self.onset = Some(now);
            tracing::debug!(onset_ns = now, "image pair onset");
        }
    }

    fn advance_phase(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
            self.phase_entered = self.timer.now();
            if next.is_finished() {
                self.pending.push(PreferenceEvent::Finished);
            }
        }
    }

    pub fn scene(&self) -> Scene {
        match self.phase {
            PreferencePhase::Choice | PreferencePhase::Result => Scene::ImagePair {
                prompt: self.config.prompt.clone(),
                offset_x: self.config.image_offset_px,
                prompt_y: self.config.prompt_y,
            },
            PreferencePhase::Finished => Scene::Blank,
        }
    }

    pub fn phase(&self) -> PreferencePhase {
        self.phase
    }

    pub fn config(&self) -> &PreferenceConfig {
        &self.config
    }

    pub fn record(&self) -> Option<&PreferenceRecord> {
        self.record.as_ref()
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

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_core::Side;
    use psylab_timing::ManualTimer;

    fn machine() -> (PreferenceStateMachine<ManualTimer>, ManualTimer) {
        let clock = ManualTimer::new();
        let m = PreferenceStateMachine::new(PreferenceConfig::default(), clock.clone(), "07");
        (m, clock)
    }

    #[test]
    fn no_choice_before_images_are_shown() {
        let (mut m, _clock) = machine();
        assert!(!m.handle_key(Key::Char('n')));
        assert_eq!(m.phase(), PreferencePhase::Choice);
    }

    #[test]
    fn other_keys_are_ignored() {
        let (mut m, _clock) = machine();
        m.frame_presented();
        assert!(!m.handle_key(Key::Char('f')));
        assert!(!m.handle_key(Key::Space));
        assert!(m.record().is_none());
    }

    #[test]
    fn right_key_picks_right_image() {
        let (mut m, clock) = machine();
        m.update();
        m.frame_presented();
        clock.advance_ms(1234);
        m.frame_presented();
        assert!(m.handle_key(Key::Char('m')));
        let record = m.record().unwrap();
        assert_eq!(record.choice, Side::Right);
        assert_eq!(record.key, 'm');
        assert_eq!(record.participant, "07");
        assert!((record.rt - 1.234).abs() < 1e-9);
        assert!(matches!(m.update().as_slice(), [PreferenceEvent::Chosen(_)]));
    }

    #[test]
    fn result_is_held_then_finishes() {
        let (mut m, clock) = machine();
        m.frame_presented();
        m.handle_key(Key::Char('n'));
        m.update();
        assert_eq!(m.phase(), PreferencePhase::Result);
        assert!(matches!(m.scene(), Scene::ImagePair { .. }));
        assert!(!m.handle_key(Key::Char('m')));
        clock.advance_ms(1999);
        assert!(m.update().is_empty());
        clock.advance_ms(1);
        assert_eq!(m.update(), vec![PreferenceEvent::Finished]);
        assert!(m.is_finished());
        assert_eq!(m.scene(), Scene::Blank);
    }
}
