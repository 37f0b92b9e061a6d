use psylab_core::{RotationTrial, TrialRecord, TrialState};

/// A trial in progress
#[derive(Debug, Clone)]
pub struct Trial<T> {
    /// 0-based position within the block
    pub index: usize,
    pub spec: RotationTrial,
    pub state: TrialState,
    pub fixation_frames_shown: u32,
    pub timestamps: TrialTimestamps<T>,
    pub record: Option<TrialRecord>,
}

#[derive(Debug, Clone)]
pub struct TrialTimestamps<T> {
    pub state_entered: T,
    /// First presented frame showing the stimulus
    pub onset: Option<T>,
}

impl<T: Copy> Trial<T> {
    pub fn new(index: usize, spec: RotationTrial, state: TrialState, now: T) -> Self {
        Self {
            index,
            spec,
            state,
            fixation_frames_shown: 0,
            timestamps: TrialTimestamps {
                state_entered: now,
                onset: None,
            },
            record: None,
        }
    }

    pub fn enter(&mut self, state: TrialState, now: T) {
        self.state = state;
        self.timestamps.state_entered = now;
    }

    pub fn correct(&self) -> bool {
        self.record.as_ref().is_some_and(|r| r.correct)
    }
}
