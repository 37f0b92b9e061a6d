/// Defines experiment phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;

    /// Phase presents trials and collects responses
    fn runs_trials(&self) -> bool;

    /// Phase waits on a screen until the space bar is pressed
    fn awaits_space(&self) -> bool {
        false
    }

    fn is_practice(&self) -> bool {
        false
    }

    fn is_finished(&self) -> bool {
        self.next().is_none()
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum RotationPhase {
    #[default]
    Instructions,
    Practice,
    PracticeEnd,
    Experiment,
    Debrief,
    Finished,
}

impl Phase for RotationPhase {
    fn next(&self) -> Option<Self> {
        use RotationPhase::*;
        Some(match self {
            Instructions => Practice,
            Practice => PracticeEnd,
            PracticeEnd => Experiment,
            Experiment => Debrief,
            Debrief => Finished,
            Finished => return None,
        })
    }

    fn runs_trials(&self) -> bool {
        matches!(self, Self::Practice | Self::Experiment)
    }

    fn awaits_space(&self) -> bool {
        matches!(self, Self::Instructions | Self::PracticeEnd)
    }

    fn is_practice(&self) -> bool {
        matches!(self, Self::Practice)
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum PreferencePhase {
    #[default]
    Choice,
    Result,
    Finished,
}

impl Phase for PreferencePhase {
    fn next(&self) -> Option<Self> {
        use PreferencePhase::*;
        Some(match self {
            Choice => Result,
            Result => Finished,
            Finished => return None,
        })
    }

    fn runs_trials(&self) -> bool {
        matches!(self, Self::Choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_phases_run_in_order() {
        let mut phase = RotationPhase::default();
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                RotationPhase::Instructions,
                RotationPhase::Practice,
                RotationPhase::PracticeEnd,
                RotationPhase::Experiment,
                RotationPhase::Debrief,
                RotationPhase::Finished,
            ]
        );
        assert!(phase.is_finished());
    }

    #[test]
    fn only_trial_blocks_run_trials() {
        assert!(RotationPhase::Practice.runs_trials());
        assert!(RotationPhase::Experiment.runs_trials());
        assert!(!RotationPhase::PracticeEnd.runs_trials());
        assert!(RotationPhase::PracticeEnd.awaits_space());
        assert!(RotationPhase::Practice.is_practice());
        assert!(!RotationPhase::Experiment.is_practice());
    }

    #[test]
    fn preference_finishes_after_result() {
        assert_eq!(PreferencePhase::Choice.next(), Some(PreferencePhase::Result));
        assert!(!PreferencePhase::Result.is_finished());
        assert!(PreferencePhase::Finished.is_finished());
    }
}
