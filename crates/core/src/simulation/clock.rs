//! Simulated calendar

use serde::{Deserialize, Serialize};

/// Days per simulated month
pub const DAYS_PER_MONTH: u32 = 30;

/// Month, day and hour of the simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    /// 1..=12
    pub month: u32,
    /// 1..=30
    pub day: u32,
    /// [0, 24)
    pub hour: f32,
}

impl SimulationClock {
    pub fn new(month: u32, hour: f32) -> Self {
        let mut clock = Self {
            month: month.clamp(1, 12),
            day: 1,
            hour: 0.0,
        };
        clock.advance(hour);
        clock
    }

    /// Advance by `hours`, rolling day and month. Non-finite or negative
    /// steps are ignored.
    pub fn advance(&mut self, hours: f32) {
        if !hours.is_finite() || hours <= 0.0 {
            return;
        }
        let total = self.hour + hours;
        let days = (total / 24.0).floor();
        self.hour = total - days * 24.0;
        if self.hour >= 24.0 {
            self.hour = 0.0;
        }
        for _ in 0..days as u64 {
            self.day += 1;
            if self.day > DAYS_PER_MONTH {
                self.day = 1;
                self.month = self.month % 12 + 1;
            }
        }
    }

    /// Month as the fractional position used by the climate curve
    pub fn month_position(&self) -> f32 {
        self.month as f32 + (self.day as f32 - 1.0) / DAYS_PER_MONTH as f32
    }
}

impl std::fmt::Display for SimulationClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let minutes = (self.hour.fract() * 60.0).floor() as u32;
        write!(
            f,
            "month {:02} day {:02} {:02}:{:02}",
            self.month, self.day, self.hour as u32, minutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_wraps_into_next_day() {
        let mut clock = SimulationClock::new(6, 22.0);
        clock.advance(3.0);
        assert_eq!(clock.day, 2);
        assert_eq!(clock.hour, 1.0);
    }

    #[test]
    fn test_month_and_year_roll() {
        let mut clock = SimulationClock::new(12, 0.0);
        clock.day = 30;
        clock.advance(24.0);
        assert_eq!(clock.month, 1);
        assert_eq!(clock.day, 1);
    }

    #[test]
    fn test_ignores_bad_steps() {
        let mut clock = SimulationClock::new(3, 5.0);
        clock.advance(f32::NAN);
        clock.advance(-2.0);
        assert_eq!(clock, SimulationClock::new(3, 5.0));
        assert_eq!(clock.to_string(), "month 03 day 01 05:00");
    }

    #[test]
    fn test_month_position() {
        let mut clock = SimulationClock::new(4, 0.0);
        assert_eq!(clock.month_position(), 4.0);
        clock.advance(24.0 * 15.0);
        assert_eq!(clock.month_position(), 4.5);
    }
}
