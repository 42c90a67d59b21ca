//! Stage rotation between rounds.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    FEAST_MIN_ROUNDS, FEAST_RATE_FIRST, FEAST_RATE_OFFSET, FEAST_RATE_OVERDUE, FEAST_RATE_SECOND,
    LOG_TARGET_GAME,
};

/// Which event list a round draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Bloodbath,
    Day,
    Night,
    Feast,
}

impl Stage {
    pub const ALL: [Self; 4] = [Self::Bloodbath, Self::Day, Self::Night, Self::Feast];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Bloodbath => "bloodbath",
            Self::Day => "day",
            Self::Night => "night",
            Self::Feast => "feast",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bloodbath => "Bloodbath",
            Self::Day => "Day",
            Self::Night => "Night",
            Self::Feast => "Feast",
        }
    }

    /// Bloodbath and feast rounds report their deaths straight away.
    #[must_use]
    pub const fn is_single_phase(self) -> bool {
        matches!(self, Self::Bloodbath | Self::Feast)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Round counters that drive stage rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageClock {
    /// Number of the next round to generate (one-based).
    pub round: u32,
    pub last_feast: u32,
    pub days_passed: u32,
    pub nights_passed: u32,
    pub current: Option<Stage>,
}

impl Default for StageClock {
    fn default() -> Self {
        Self {
            round: 1,
            last_feast: 1,
            days_passed: 0,
            nights_passed: 0,
            current: None,
        }
    }
}

/// Probability bracket for the feast trigger given rounds since the last feast.
#[must_use]
pub fn feast_rate(rounds_since_feast: u32) -> Option<f64> {
    match rounds_since_feast {
        n if n < FEAST_MIN_ROUNDS => None,
        5 => Some(FEAST_RATE_FIRST),
        6 => Some(FEAST_RATE_SECOND),
        _ => Some(FEAST_RATE_OVERDUE),
    }
}

/// Whether a feast replaces the day that would follow a night.
///
/// The draw is rejected when `roll > rate * (since - 4)`; from seven rounds
/// on the threshold exceeds one and the feast always fires.
pub fn roll_feast<R>(rounds_since_feast: u32, rng: &mut R) -> bool
where
    R: Rng + ?Sized,
{
    let Some(rate) = feast_rate(rounds_since_feast) else {
        return false;
    };
    let threshold = rate * f64::from(rounds_since_feast - FEAST_RATE_OFFSET);
    let roll = rng.r#gen::<f64>();
    roll <= threshold
}

impl StageClock {
    /// Pick the stage for the next round and advance the counters.
    pub fn advance<R>(&mut self, rng: &mut R) -> Stage
    where
        R: Rng + ?Sized,
    {
        let stage = match self.current {
            None => Stage::Bloodbath,
            Some(Stage::Bloodbath | Stage::Feast) => Stage::Day,
            Some(Stage::Day) => Stage::Night,
            Some(Stage::Night) => {
                let since = self.round.saturating_sub(self.last_feast);
                if roll_feast(since, rng) {
                    log::info!(
                        target: LOG_TARGET_GAME,
                        "feast triggered in round {} ({since} rounds since the last one)",
                        self.round
                    );
                    self.last_feast = self.round;
                    Stage::Feast
                } else {
                    Stage::Day
                }
            }
        };
        match stage {
            Stage::Day => self.days_passed += 1,
            Stage::Night => self.nights_passed += 1,
            Stage::Bloodbath | Stage::Feast => {}
        }
        self.current = Some(stage);
        self.round += 1;
        stage
    }

    /// Display title for a round of `stage` given the current counters.
    #[must_use]
    pub fn title(&self, stage: Stage) -> String {
        match stage {
            Stage::Day => format!("Day {}", self.days_passed),
            Stage::Night => format!("Night {}", self.nights_passed),
            Stage::Bloodbath | Stage::Feast => stage.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn first_round_is_bloodbath_then_day_night() {
        let mut clock = StageClock::default();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        assert_eq!(clock.advance(&mut rng), Stage::Bloodbath);
        assert_eq!(clock.advance(&mut rng), Stage::Day);
        assert_eq!(clock.advance(&mut rng), Stage::Night);
        assert_eq!(clock.title(Stage::Day), "Day 1");
        assert_eq!(clock.title(Stage::Night), "Night 1");
        assert_eq!(clock.round, 4);
    }

    #[test]
    fn night_is_followed_by_day_before_feast_window() {
        let mut clock = StageClock::default();
        // Max roll never passes a threshold below one.
        let mut rng = StepRng::new(u64::MAX, 0);
        let stages: Vec<Stage> = (0..7).map(|_| clock.advance(&mut rng)).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Bloodbath,
                Stage::Day,
                Stage::Night,
                Stage::Day,
                Stage::Night,
                Stage::Day,
                Stage::Night,
            ]
        );
    }

    #[test]
    fn feast_brackets_follow_stepwise_rates() {
        assert_eq!(feast_rate(4), None);
        assert_eq!(feast_rate(5), Some(0.25));
        assert_eq!(feast_rate(6), Some(0.33));
        assert_eq!(feast_rate(7), Some(0.50));
        assert_eq!(feast_rate(40), Some(0.50));

        let mut high = StepRng::new(u64::MAX, 0);
        assert!(!roll_feast(5, &mut high));
        assert!(!roll_feast(6, &mut high));
        // 0.5 * 3 = 1.5: always fires.
        assert!(roll_feast(7, &mut high));

        let mut low = StepRng::new(0, 0);
        assert!(roll_feast(5, &mut low));
        assert!(!roll_feast(4, &mut low));
    }

    #[test]
    fn feast_resets_marker_and_is_followed_by_day() {
        let mut clock = StageClock {
            round: 9,
            last_feast: 1,
            days_passed: 4,
            nights_passed: 4,
            current: Some(Stage::Night),
        };
        let mut rng = StepRng::new(0, 0);
        assert_eq!(clock.advance(&mut rng), Stage::Feast);
        assert_eq!(clock.last_feast, 9);
        assert_eq!(clock.advance(&mut rng), Stage::Day);
        assert_eq!(clock.days_passed, 5);
    }
}
