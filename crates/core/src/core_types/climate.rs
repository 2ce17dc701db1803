//! Baseline climate curve
//!
//! The engines never model the synoptic climate themselves: they ask a
//! [`BaselineClimate`] for the undisturbed air temperature, the humidity the
//! air relaxes toward, and the daylight window for a month/hour pair. The
//! built-in [`SeasonalClimate`] describes a temperate mid-latitude site.
//!
//! Months are 1-based and may be fractional (1.0 = middle of January); both
//! month (period 12) and hour (period 24) wrap, so the curve is continuous and
//! periodic in each. Non-finite inputs fall back to the nearest valid sample
//! (January, noon) instead of poisoning downstream fields.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Daylight window for a month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Daylight {
    /// Length of day (hours)
    pub hours: f32,
    /// Local sunrise hour
    pub sunrise: f32,
    /// Local sunset hour
    pub sunset: f32,
}

impl Daylight {
    /// Symmetric window around local noon
    pub fn centered(hours: f32) -> Self {
        let hours = hours.clamp(0.0, 24.0);
        Self {
            hours,
            sunrise: 12.0 - hours / 2.0,
            sunset: 12.0 + hours / 2.0,
        }
    }

    /// Whether the sun is above the horizon at `hour`
    pub fn is_daytime(&self, hour: f32) -> bool {
        let hour = wrap_hour(hour);
        hour > self.sunrise && hour < self.sunset
    }
}

/// Source of baseline temperature, target humidity and daylight.
pub trait BaselineClimate: Send + Sync {
    /// Undisturbed near-surface air temperature (°C) at reference elevation
    fn baseline_temperature(&self, month: f32, hour: f32) -> f32;

    /// Humidity [0, 1] the local air relaxes toward
    fn target_humidity(&self, month: f32, hour: f32) -> f32;

    /// Daylight window for the month
    fn daylight(&self, month: f32) -> Daylight;
}

/// Sun altitude proxy in [0, 1]: a half-sine over the daylight window.
///
/// This is not a literal angle; 1.0 is the sun at its daily peak.
pub fn sun_altitude(daylight: &Daylight, hour: f32) -> f32 {
    let span = daylight.sunset - daylight.sunrise;
    if span <= 0.0 || !daylight.is_daytime(hour) {
        return 0.0;
    }
    let hour = wrap_hour(hour);
    (PI * (hour - daylight.sunrise) / span).sin().max(0.0)
}

/// Sun azimuth (degrees clockwise from north): 90° at sunrise, 180° at solar
/// noon, 270° at sunset.
pub fn sun_azimuth(daylight: &Daylight, hour: f32) -> f32 {
    let hour = wrap_hour(hour);
    let span = (daylight.sunset - daylight.sunrise).max(f32::EPSILON);
    let t = ((hour - daylight.sunrise) / span).clamp(0.0, 1.0);
    90.0 + 180.0 * t
}

/// Wrap an hour into [0, 24); non-finite hours map to noon.
pub fn wrap_hour(hour: f32) -> f32 {
    if hour.is_finite() {
        hour.rem_euclid(24.0)
    } else {
        12.0
    }
}

/// Month position in [0, 12) where 0 is the middle of January; non-finite
/// months map to January.
fn month_position(month: f32) -> f32 {
    if month.is_finite() {
        (month - 1.0).rem_euclid(12.0)
    } else {
        0.0
    }
}

/// Periodic linear interpolation of a 12-entry monthly table.
fn sample_monthly(table: &[f32; 12], month: f32) -> f32 {
    let pos = month_position(month);
    let i = (pos.floor() as usize).min(11);
    let frac = pos - pos.floor();
    let next = (i + 1) % 12;
    table[i] + (table[next] - table[i]) * frac
}

/// Diurnal shape: 0 at 06:00 and through the night, 1.0 at 14:00.
fn diurnal_factor(hour: f32) -> f32 {
    let hour = wrap_hour(hour);
    ((hour - 6.0) * PI / 16.0).sin().max(0.0)
}

/// Temperate mid-latitude seasonal climate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalClimate {
    /// Monthly mean daily minimum (°C)
    pub monthly_min: [f32; 12],
    /// Monthly mean daily maximum (°C)
    pub monthly_max: [f32; 12],
    /// Monthly mean relative humidity [0, 1]
    pub monthly_humidity: [f32; 12],
    /// Monthly day length (hours)
    pub monthly_daylight: [f32; 12],
    /// Night-time humidity increase over the monthly mean
    pub night_humidity_boost: f32,
}

impl Default for SeasonalClimate {
    fn default() -> Self {
        Self {
            monthly_min: [
                -4.0, -3.0, 0.0, 4.0, 9.0, 13.0, 15.0, 14.0, 10.0, 6.0, 1.0, -3.0,
            ],
            monthly_max: [
                3.0, 5.0, 10.0, 15.0, 20.0, 24.0, 27.0, 26.0, 21.0, 15.0, 8.0, 4.0,
            ],
            monthly_humidity: [
                0.82, 0.78, 0.72, 0.66, 0.64, 0.63, 0.62, 0.64, 0.70, 0.76, 0.82, 0.84,
            ],
            monthly_daylight: [
                8.5, 10.0, 11.8, 13.6, 15.2, 16.0, 15.6, 14.2, 12.4, 10.6, 9.0, 8.0,
            ],
            night_humidity_boost: 0.15,
        }
    }
}

impl BaselineClimate for SeasonalClimate {
    fn baseline_temperature(&self, month: f32, hour: f32) -> f32 {
        let min = sample_monthly(&self.monthly_min, month);
        let max = sample_monthly(&self.monthly_max, month);
        min + (max - min) * diurnal_factor(hour)
    }

    fn target_humidity(&self, month: f32, hour: f32) -> f32 {
        let mean = sample_monthly(&self.monthly_humidity, month);
        let boost = self.night_humidity_boost * (1.0 - diurnal_factor(hour));
        (mean + boost - self.night_humidity_boost * 0.5).clamp(0.05, 0.98)
    }

    fn daylight(&self, month: f32) -> Daylight {
        Daylight::centered(sample_monthly(&self.monthly_daylight, month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_warmest_in_afternoon() {
        let climate = SeasonalClimate::default();
        let dawn = climate.baseline_temperature(7.0, 6.0);
        let afternoon = climate.baseline_temperature(7.0, 14.0);
        assert_relative_eq!(dawn, 15.0, epsilon = 1e-4);
        assert_relative_eq!(afternoon, 27.0, epsilon = 1e-4);
    }

    #[test]
    fn test_periodic_in_month_and_hour() {
        let climate = SeasonalClimate::default();
        assert_relative_eq!(
            climate.baseline_temperature(1.0, 10.0),
            climate.baseline_temperature(13.0, 10.0),
            epsilon = 1e-4
        );
        assert_relative_eq!(
            climate.baseline_temperature(4.0, 3.0),
            climate.baseline_temperature(4.0, 27.0),
            epsilon = 1e-4
        );
        // December blends continuously into January
        let late_dec = climate.baseline_temperature(12.99, 12.0);
        let jan = climate.baseline_temperature(1.0, 12.0);
        assert!((late_dec - jan).abs() < 0.1);
    }

    #[test]
    fn test_non_finite_inputs_fall_back() {
        let climate = SeasonalClimate::default();
        let t = climate.baseline_temperature(f32::NAN, f32::INFINITY);
        assert!(t.is_finite());
        assert_relative_eq!(t, climate.baseline_temperature(1.0, 12.0), epsilon = 1e-6);
        assert!(climate.target_humidity(f32::NAN, 3.0).is_finite());
    }

    #[test]
    fn test_sun_altitude_shape() {
        let daylight = Daylight::centered(12.0);
        assert_eq!(sun_altitude(&daylight, 3.0), 0.0);
        assert_eq!(sun_altitude(&daylight, 21.0), 0.0);
        assert_relative_eq!(sun_altitude(&daylight, 12.0), 1.0, epsilon = 1e-6);
        assert!(sun_altitude(&daylight, 9.0) > 0.5);
        assert_relative_eq!(sun_azimuth(&daylight, 12.0), 180.0, epsilon = 1e-4);
    }

    #[test]
    fn test_longer_days_in_summer() {
        let climate = SeasonalClimate::default();
        assert!(climate.daylight(6.0).hours > climate.daylight(12.0).hours);
        assert!(climate.daylight(6.0).is_daytime(19.5));
        assert!(!climate.daylight(12.0).is_daytime(18.0));
    }

    #[test]
    fn test_humidity_higher_at_night() {
        let climate = SeasonalClimate::default();
        assert!(climate.target_humidity(7.0, 2.0) > climate.target_humidity(7.0, 14.0));
    }
}
