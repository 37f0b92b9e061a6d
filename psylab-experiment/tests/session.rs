use psylab_core::{Key, RotationPhase, Scene, TrialRecord, TrialState, score};
use psylab_experiment::{RotationConfig, RotationEvent, RotationStateMachine};
use psylab_timing::{ManualTimer, Timer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

const FRAME_MS: u64 = 16;

/// What the simulated participant does on a given main/practice trial
#[derive(Clone, Copy)]
enum Behaviour {
    Correct,
    Wrong,
    Silent,
}

fn behaviour(trial_no: usize) -> Behaviour {
    if trial_no % 7 == 0 {
        Behaviour::Silent
    } else if trial_no % 5 == 0 {
        Behaviour::Wrong
    } else {
        Behaviour::Correct
    }
}

struct Outcome {
    events: Vec<RotationEvent>,
    frames: usize,
}

/// Runs a whole session frame by frame; returns all emitted events
fn run_session(m: &mut RotationStateMachine<ManualTimer>, clock: &ManualTimer) -> Outcome {
    let mut events = Vec::new();
    let mut frames = 0;
    let same_key = Key::Char(m.config().same_key);
    let mirror_key = Key::Char(m.config().mirror_key);

    while !m.is_finished() {
        frames += 1;
        assert!(frames < 200_000, "session did not finish");

        if matches!(m.phase(), RotationPhase::Instructions | RotationPhase::PracticeEnd) {
            clock.advance_ms(500);
            m.handle_key(Key::Space);
        }

        events.extend(m.update());
        let _scene = m.scene();
        m.frame_presented();
        clock.advance_ms(FRAME_MS);

        let Some(trial) = m.current_trial() else {
            continue;
        };
        if trial.state != TrialState::Stimulus {
            continue;
        }
        let Some(onset) = trial.timestamps.onset else {
            continue;
        };
        // respond 400 ms plus 4 ms per degree after onset
        let wait_ms = 400 + 4 * trial.spec.angle as u64;
        if clock.between(onset, clock.now()).as_millis() as u64 >= wait_ms {
            let right = if trial.spec.same { same_key } else { mirror_key };
            let wrong = if trial.spec.same { mirror_key } else { same_key };
            match behaviour(trial.index + 1) {
                Behaviour::Correct => {
                    m.handle_key(right);
                }
                Behaviour::Wrong => {
                    m.handle_key(wrong);
                }
                Behaviour::Silent => {}
            }
        }
    }
    events.extend(m.update());
    Outcome { events, frames }
}

fn new_session(seed: u64) -> (RotationStateMachine<ManualTimer>, ManualTimer) {
    let clock = ManualTimer::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let m = RotationStateMachine::new(RotationConfig::default(), clock.clone(), &mut rng).unwrap();
    (m, clock)
}

fn assert_consistent(records: &[TrialRecord], timeout: f64) {
    for (i, r) in records.iter().enumerate() {
        assert_eq!(r.trial, i + 1);
        assert!(r.rt >= 0.0 && r.rt <= timeout, "rt {} out of range", r.rt);
        assert_eq!(r.correct, score(r.same, r.response));
        if r.response.is_none() {
            assert_eq!(r.rt, timeout);
        }
    }
}

#[test]
fn full_session_produces_expected_blocks() {
    let (mut m, clock) = new_session(42);
    let outcome = run_session(&mut m, &clock);
    assert!(outcome.frames > 0);

    let practice: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            RotationEvent::PracticeFinished(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(practice.len(), 1);
    assert_eq!(practice[0].len(), 8);

    let main: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            RotationEvent::ExperimentFinished(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(main.len(), 1);
    assert_eq!(main[0].len(), 56);
    assert_eq!(main[0], m.results());

    assert_consistent(&practice[0], 5.0);
    assert_consistent(&main[0], 5.0);
    assert_eq!(outcome.events.last(), Some(&RotationEvent::Finished));
}

#[test]
fn main_block_is_balanced_in_recorded_data() {
    let (mut m, clock) = new_session(9);
    run_session(&mut m, &clock);
    let mut cells: HashMap<(u16, bool), usize> = HashMap::new();
    for r in m.results() {
        *cells.entry((r.angle, r.same)).or_default() += 1;
    }
    assert_eq!(cells.len(), 14);
    assert!(cells.values().all(|&n| n == 4));
}

#[test]
fn simulated_behaviour_is_scored() {
    let (mut m, clock) = new_session(1);
    run_session(&mut m, &clock);
    for r in m.results() {
        match behaviour(r.trial) {
            Behaviour::Correct => {
                assert!(r.correct, "trial {} should be correct", r.trial);
                let expected = (400 + 4 * r.angle as u64) as f64 / 1000.0;
                assert!(r.rt >= expected && r.rt < expected + 0.05);
            }
            Behaviour::Wrong => assert!(!r.correct && r.response.is_some()),
            Behaviour::Silent => {
                assert!(r.response.is_none());
                assert_eq!(r.rt, 5.0);
            }
        }
    }
}

#[test]
fn debrief_reports_means_then_finishes() {
    let (mut m, clock) = new_session(3);
    // drive to the debrief without finishing it
    let same_key = Key::Char('f');
    let mut frames = 0;
    loop {
        frames += 1;
        assert!(frames < 200_000);
        if matches!(m.phase(), RotationPhase::Instructions | RotationPhase::PracticeEnd) {
            m.handle_key(Key::Space);
        }
        m.update();
        if m.phase() == RotationPhase::Debrief {
            break;
        }
        m.frame_presented();
        clock.advance_ms(FRAME_MS);
        m.handle_key(same_key);
    }
    match m.scene() {
        Scene::Message { text, .. } => {
            assert!(text.contains("Mean reaction time"));
            assert!(text.contains("Accuracy"));
            // the plot is written by the app and may be skipped
            assert!(!text.contains("plot"));
        }
        other => panic!("unexpected debrief scene {other:?}"),
    }
    clock.advance_ms(3999);
    m.update();
    assert_eq!(m.phase(), RotationPhase::Debrief);
    clock.advance_ms(1);
    assert_eq!(
        m.update(),
        vec![
            RotationEvent::PhaseStarted(RotationPhase::Finished),
            RotationEvent::Finished
        ]
    );
}
