//! Trial-list construction.

use crate::config::RotationConfig;
use psylab_core::{Letter, RotationTrial};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

fn random_letter<R: Rng>(letters: &[Letter], rng: &mut R) -> Letter {
    letters.choose(rng).copied().unwrap_or(Letter::F)
}

/// Every angle appears `repeats_per_condition` times as a same trial and as
/// many times as a mirror trial, each with a random letter, in shuffled order.
pub fn build_main_trials<R: Rng>(config: &RotationConfig, rng: &mut R) -> Vec<RotationTrial> {
    let mut trials = Vec::with_capacity(config.main_trial_count());
    for &angle in &config.angles {
        for same in [true, false] {
            for _ in 0..config.repeats_per_condition {
                trials.push(RotationTrial {
                    angle,
                    same,
                    letter: random_letter(&config.letters, rng),
                });
            }
        }
    }
    trials.shuffle(rng);
    trials
}

/// Practice trials draw angle, condition and letter independently
pub fn build_practice_trials<R: Rng>(config: &RotationConfig, rng: &mut R) -> Vec<RotationTrial> {
    (0..config.practice_trials)
        .map(|_| RotationTrial {
            angle: config.angles.choose(rng).copied().unwrap_or_default(),
            same: rng.random_bool(0.5),
            letter: random_letter(&config.letters, rng),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn main_block_is_balanced() {
        let config = RotationConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let trials = build_main_trials(&config, &mut rng);
        assert_eq!(trials.len(), 56);

        let mut cells: HashMap<(u16, bool), usize> = HashMap::new();
        for t in &trials {
            *cells.entry((t.angle, t.same)).or_default() += 1;
            assert!(config.letters.contains(&t.letter));
        }
        assert_eq!(cells.len(), 14);
        assert!(cells.values().all(|&n| n == 4));
    }

    #[test]
    fn main_block_is_shuffled() {
        let config = RotationConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let trials = build_main_trials(&config, &mut rng);
        // unshuffled order would start with eight 0-degree trials
        assert!(trials.iter().take(8).any(|t| t.angle != 0 || !t.same));
    }

    #[test]
    fn same_seed_same_design() {
        let config = RotationConfig::default();
        let a = build_main_trials(&config, &mut StdRng::seed_from_u64(3));
        let b = build_main_trials(&config, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn practice_block_draws_from_config() {
        let config = RotationConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let trials = build_practice_trials(&config, &mut rng);
        assert_eq!(trials.len(), 8);
        for t in &trials {
            assert!(config.angles.contains(&t.angle));
            assert!(config.letters.contains(&t.letter));
        }
    }

    #[test]
    fn respects_custom_sizes() {
        let config = RotationConfig {
            angles: vec![0, 90],
            repeats_per_condition: 1,
            practice_trials: 0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(build_main_trials(&config, &mut rng).len(), 4);
        assert!(build_practice_trials(&config, &mut rng).is_empty());
    }
}
