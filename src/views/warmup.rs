use serde::Serialize;

use crate::store::EventStore;

use super::exercise_sessions;

/// Default ascending warm-up fractions of the top-set weight. Overridable
/// through the config file; the exact table is a product choice, not a
/// data-model fact.
pub const DEFAULT_WARMUP_FRACTIONS: [f64; 3] = [0.40, 0.60, 0.80];

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WarmupStep {
    pub fraction: f64,
    pub weight: f64,
}

impl WarmupStep {
    /// Whole-number percentage for display, e.g. `40` for 0.40.
    pub fn percent(&self) -> u32 {
        (self.fraction * 100.0).round() as u32
    }
}

/// Warm-up suggestion for an exercise. `NoHistory` is deliberately distinct
/// from a zero-weight answer: a logged bodyweight session produces numeric
/// steps of 0, while an exercise never trained produces no numbers at all.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum WarmupHint {
    NoHistory,
    Steps(Vec<WarmupStep>),
}

/// Computes warm-up steps from the top-set weight of the most recent
/// session containing the exercise, across all gyms.
pub fn warmup_hint(store: &EventStore, exercise_id: &str, fractions: &[f64]) -> WarmupHint {
    let sessions = exercise_sessions(store, exercise_id);
    let Some(latest) = sessions.last() else {
        return WarmupHint::NoHistory;
    };
    let top_weight = latest
        .sets
        .iter()
        .map(|set| set.weight)
        .fold(f64::MIN, f64::max);

    let steps = fractions
        .iter()
        .map(|fraction| WarmupStep {
            fraction: *fraction,
            weight: top_weight * fraction,
        })
        .collect();
    WarmupHint::Steps(steps)
}

#[cfg(test)]
mod tests {
    use super::{warmup_hint, WarmupHint, DEFAULT_WARMUP_FRACTIONS};
    use crate::views::fixtures::{log_set, start_workout};
    use crate::store::EventStore;

    #[test]
    fn no_history_is_not_a_zero_suggestion() {
        let store = EventStore::new();
        assert_eq!(
            warmup_hint(&store, "E-1", &DEFAULT_WARMUP_FRACTIONS),
            WarmupHint::NoHistory
        );
    }

    #[test]
    fn steps_scale_the_latest_top_set_weight() {
        let mut store = EventStore::new();
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 90.0, 5);
        // Newer session; its top set (100) drives the hint, not the 110
        // logged weeks earlier.
        start_workout(&mut store, "w-0", "2026-02-01T18:00:00Z", "S-0", "G-1");
        log_set(&mut store, "s-0", "2026-02-01T18:05:00Z", "S-0", "E-1", 1, 110.0, 1);
        start_workout(&mut store, "w-2", "2026-03-10T18:00:00Z", "S-2", "G-1");
        log_set(&mut store, "s-2", "2026-03-10T18:05:00Z", "S-2", "E-1", 1, 95.0, 5);
        log_set(&mut store, "s-3", "2026-03-10T18:10:00Z", "S-2", "E-1", 2, 100.0, 3);

        let hint = warmup_hint(&store, "E-1", &DEFAULT_WARMUP_FRACTIONS);
        let WarmupHint::Steps(steps) = hint else {
            panic!("expected steps");
        };
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].weight, 40.0);
        assert_eq!(steps[0].percent(), 40);
        assert_eq!(steps[1].weight, 60.0);
        assert_eq!(steps[2].weight, 80.0);
    }

    #[test]
    fn zero_weight_history_produces_numeric_zero_steps() {
        let mut store = EventStore::new();
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 0.0, 12);

        let hint = warmup_hint(&store, "E-1", &DEFAULT_WARMUP_FRACTIONS);
        let WarmupHint::Steps(steps) = hint else {
            panic!("expected steps");
        };
        assert!(steps.iter().all(|step| step.weight == 0.0));
    }

    #[test]
    fn custom_fraction_tables_are_respected() {
        let mut store = EventStore::new();
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "E-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 200.0, 1);

        let hint = warmup_hint(&store, "E-1", &[0.5]);
        assert_eq!(
            hint,
            WarmupHint::Steps(vec![super::WarmupStep {
                fraction: 0.5,
                weight: 100.0
            }])
        );
    }
}
