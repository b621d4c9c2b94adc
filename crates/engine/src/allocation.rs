//! Session cost allocation.
//!
//! Turns the inputs recorded for a session (court hours and rate, shuttlecocks
//! used and their price, anything else) into a total and an even per-player
//! charge.
//!
//! Every rate × quantity product is rounded to one decimal place where it is
//! computed, so the total is always a whole number of tenths. The per-player
//! charge is the total divided by the number of participants, again rounded to
//! one decimal place. The sum of all charges is **not** corrected back to the
//! total: each charge is within half a rounding step of the exact share, so
//! the drift is bounded by `participants × 0.05`.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, Quantity, ResultEngine, money::TENTH_MINOR};

/// Raw cost inputs of one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostInputs {
    pub court_hours: Quantity,
    pub court_rate: Money,
    pub shuttlecock_count: u32,
    pub shuttlecock_rate: Money,
    pub other_costs: Money,
}

impl CostInputs {
    fn validate(&self) -> ResultEngine<()> {
        if self.court_hours.is_negative() {
            return Err(EngineError::InvalidAmount(
                "court_hours must be >= 0".to_string(),
            ));
        }
        for (label, amount) in [
            ("court_rate", self.court_rate),
            ("shuttlecock_rate", self.shuttlecock_rate),
            ("other_costs", self.other_costs),
        ] {
            if amount.is_negative() {
                return Err(EngineError::InvalidAmount(format!("{label} must be >= 0")));
            }
        }
        Ok(())
    }
}

/// Result of [`allocate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub court_cost: Money,
    pub shuttlecock_cost: Money,
    pub other_costs: Money,
    pub total: Money,
    pub cost_per_player: Money,
    pub participants: usize,
}

impl Allocation {
    /// Sum of all per-player charges.
    #[must_use]
    pub fn charged(&self) -> Money {
        let participants = i64::try_from(self.participants).unwrap_or(i64::MAX);
        Money::new(self.cost_per_player.minor().saturating_mul(participants))
    }

    /// `total - charged()`. Positive when the group is undercharged.
    #[must_use]
    pub fn drift(&self) -> Money {
        self.total.saturating_sub(self.charged())
    }

    /// Largest drift the rounding policy allows for this many participants.
    #[must_use]
    pub fn max_drift(participants: usize) -> Money {
        Money::new(participants as i64 * TENTH_MINOR / 2)
    }
}

/// Computes the session total and the even per-player charge.
///
/// With no participants the charge is zero and nobody is billed.
///
/// ```rust
/// use engine::{CostInputs, Money, Quantity, allocate};
///
/// let inputs = CostInputs {
///     court_hours: Quantity::whole(2),
///     court_rate: Money::new(25_00),
///     shuttlecock_count: 3,
///     shuttlecock_rate: Money::new(8_00),
///     other_costs: Money::ZERO,
/// };
/// let allocation = allocate(&inputs, 4).unwrap();
/// assert_eq!(allocation.total, Money::new(74_00));
/// assert_eq!(allocation.cost_per_player, Money::new(18_50));
/// ```
pub fn allocate(inputs: &CostInputs, participants: usize) -> ResultEngine<Allocation> {
    inputs.validate()?;

    let overflow = || EngineError::InvalidAmount("session costs are too large".to_string());
    let court_cost = inputs
        .court_rate
        .checked_times(inputs.court_hours)
        .and_then(Money::checked_round_to_tenth)
        .ok_or_else(overflow)?;
    let shuttlecock_cost = inputs
        .shuttlecock_rate
        .checked_times_count(inputs.shuttlecock_count)
        .and_then(Money::checked_round_to_tenth)
        .ok_or_else(overflow)?;
    let other_costs = inputs
        .other_costs
        .checked_round_to_tenth()
        .ok_or_else(overflow)?;
    let total = Money::checked_sum([court_cost, shuttlecock_cost, other_costs])
        .ok_or_else(overflow)?;

    Ok(Allocation {
        court_cost,
        shuttlecock_cost,
        other_costs,
        total,
        cost_per_player: total.split_to_tenth(participants),
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(hours: &str, court_rate: i64, shuttles: u32, shuttle_rate: i64, other: i64) -> CostInputs {
        CostInputs {
            court_hours: hours.parse().unwrap(),
            court_rate: Money::new(court_rate),
            shuttlecock_count: shuttles,
            shuttlecock_rate: Money::new(shuttle_rate),
            other_costs: Money::new(other),
        }
    }

    #[test]
    fn four_players_two_hours_three_tubes() {
        let allocation = allocate(&inputs("2", 25_00, 3, 8_00, 0), 4).unwrap();
        assert_eq!(allocation.total, Money::new(74_00));
        assert_eq!(allocation.cost_per_player, Money::new(18_50));
        assert_eq!(allocation.charged(), Money::new(74_00));
        assert_eq!(allocation.drift(), Money::ZERO);
    }

    #[test]
    fn no_participants_means_no_charge() {
        let allocation = allocate(&inputs("2", 25_00, 3, 8_00, 0), 0).unwrap();
        assert_eq!(allocation.total, Money::new(74_00));
        assert_eq!(allocation.cost_per_player, Money::ZERO);
        assert_eq!(allocation.charged(), Money::ZERO);
    }

    #[test]
    fn products_are_rounded_to_one_decimal() {
        // 1.25h × 13.33 = 16.6625 → 16.70
        let allocation = allocate(&inputs("1.25", 13_33, 0, 0, 0), 1).unwrap();
        assert_eq!(allocation.court_cost, Money::new(16_70));
        assert_eq!(allocation.total.minor() % TENTH_MINOR, 0);
    }

    #[test]
    fn oversized_inputs_are_rejected() {
        let court = allocate(&inputs("2", i64::MAX / 100, 0, 0, 0), 4);
        assert!(matches!(court, Ok(_)));
        let court = allocate(&inputs("200", i64::MAX / 100, 0, 0, 0), 4);
        assert!(matches!(court, Err(EngineError::InvalidAmount(_))));

        let shuttles = allocate(&inputs("0", 0, u32::MAX, i64::MAX / 2, 0), 4);
        assert!(matches!(shuttles, Err(EngineError::InvalidAmount(_))));

        let total = allocate(&inputs("1", i64::MAX / 200, 0, 0, i64::MAX - 10), 4);
        assert!(matches!(total, Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn three_way_split_drifts_within_bound() {
        let allocation = allocate(&inputs("1", 10_00, 0, 0, 0), 3).unwrap();
        assert_eq!(allocation.cost_per_player, Money::new(3_30));
        assert_eq!(allocation.drift(), Money::new(10));
        assert!(allocation.drift().abs() <= Allocation::max_drift(3));
    }

    /// Rounding drift between the total and the sum of charges is accepted,
    /// never corrected, and stays within half a rounding step per participant.
    #[test]
    fn rounding_drift_is_bounded_for_all_inputs() {
        let hours = ["0.5", "1", "1.5", "2", "2.75", "3"];
        let rates = [7_00, 12_50, 13_33, 25_00, 31_99];
        let shuttle_rates = [0, 2_75, 8_00, 3_33];
        for h in hours {
            for &rate in &rates {
                for shuttles in 0..6 {
                    for &srate in &shuttle_rates {
                        for other in [0, 1_05, 4_99] {
                            let inputs = inputs(h, rate, shuttles, srate, other);
                            for n in 1..=16usize {
                                let a = allocate(&inputs, n).unwrap();
                                assert!(
                                    a.drift().abs() <= Allocation::max_drift(n),
                                    "drift {} over bound for {inputs:?} / {n}",
                                    a.drift()
                                );
                                assert_eq!(a.cost_per_player.minor() % TENTH_MINOR, 0);
                            }
                            // A single participant always pays the exact total.
                            assert_eq!(allocate(&inputs, 1).unwrap().drift(), Money::ZERO);
                            assert_eq!(allocate(&inputs, 0).unwrap().cost_per_player, Money::ZERO);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(allocate(&inputs("1", -1, 0, 0, 0), 2).is_err());
        assert!(allocate(&inputs("1", 1_00, 0, 0, -5), 2).is_err());
    }
}
