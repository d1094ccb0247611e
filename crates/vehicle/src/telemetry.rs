//! Simulated drivetrain readings derived from movement between waypoints.

use std::time::Duration;

use crate::coordinate::Coordinate;

const IDLE_RPM: f64 = 800.0;
const RPM_BAND: f64 = 3_700.0;

/// Upper speed bound (km/h) of gears 1 to 5. Anything faster is 6th gear.
const GEAR_LIMITS: [f64; 5] = [20.0, 35.0, 50.0, 70.0, 95.0];

/// Width of the 6th gear band used for the rpm estimate.
const TOP_GEAR_SPAN: f64 = 60.0;

/// Drivetrain readings for one telemetry sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Drivetrain {
    pub speed_kmh: f64,
    pub rpm: f64,
    pub gear: i32,
}

impl Drivetrain {
    /// Engine idling, vehicle stationary.
    #[must_use]
    pub const fn idle() -> Self {
        Self { speed_kmh: 0.0, rpm: IDLE_RPM, gear: 0 }
    }

    /// Readings for a vehicle that moved from `from` to `to` within `period`,
    /// speed capped at `max_speed_kmh`.
    #[must_use]
    pub fn between(
        from: Coordinate, to: Coordinate, period: Duration, max_speed_kmh: f64,
    ) -> Self {
        let hours = period.as_secs_f64() / 3_600.0;
        if hours <= 0.0 {
            return Self::idle();
        }

        let speed_kmh = (from.distance_km(to) / hours).min(max_speed_kmh.max(0.0));
        Self::at_speed(speed_kmh)
    }

    /// Readings for a vehicle travelling at `speed_kmh`.
    #[must_use]
    pub fn at_speed(speed_kmh: f64) -> Self {
        if speed_kmh <= 0.0 || !speed_kmh.is_finite() {
            return Self::idle();
        }

        let index =
            GEAR_LIMITS.iter().position(|limit| speed_kmh <= *limit).unwrap_or(GEAR_LIMITS.len());
        let lower = if index == 0 { 0.0 } else { GEAR_LIMITS[index - 1] };
        let upper = GEAR_LIMITS.get(index).copied().unwrap_or(lower + TOP_GEAR_SPAN);

        let fraction = ((speed_kmh - lower) / (upper - lower)).clamp(0.0, 1.0);
        let rpm = fraction.mul_add(RPM_BAND, IDLE_RPM);

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let gear = index as i32 + 1;

        Self { speed_kmh, rpm, gear }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary() {
        let point = Coordinate::new(8.45453, 49.02352);
        let reading = Drivetrain::between(point, point, Duration::from_secs(1), 130.0);
        assert_eq!(reading, Drivetrain::idle());
        assert_eq!(Drivetrain::at_speed(0.0).gear, 0);
    }

    #[test]
    fn zero_period() {
        let a = Coordinate::new(8.45453, 49.02352);
        let b = Coordinate::new(8.48501, 49.00249);
        assert_eq!(Drivetrain::between(a, b, Duration::ZERO, 130.0), Drivetrain::idle());
    }

    #[test]
    fn capped_speed() {
        // ~3.2 km in one second is far beyond any road vehicle
        let a = Coordinate::new(8.45453, 49.02352);
        let b = Coordinate::new(8.48501, 49.00249);
        let reading = Drivetrain::between(a, b, Duration::from_secs(1), 130.0);

        assert!((reading.speed_kmh - 130.0).abs() < f64::EPSILON);
        assert_eq!(reading.gear, 6);
    }

    #[test]
    fn uncapped_speed() {
        // ~3.2 km in 3 minutes is roughly 64.5 km/h
        let a = Coordinate::new(8.45453, 49.02352);
        let b = Coordinate::new(8.48501, 49.00249);
        let reading = Drivetrain::between(a, b, Duration::from_secs(180), 130.0);

        assert!((reading.speed_kmh - 64.53).abs() < 0.1, "{reading:?}");
        assert_eq!(reading.gear, 4);
    }

    #[test]
    fn gear_bands() {
        let speeds = [5.0, 20.0, 20.1, 40.0, 60.0, 90.0, 120.0];
        let gears: Vec<i32> = speeds.iter().map(|s| Drivetrain::at_speed(*s).gear).collect();
        assert_eq!(gears, vec![1, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn rpm_within_bounds() {
        for speed in 1..=200 {
            let reading = Drivetrain::at_speed(f64::from(speed));
            assert!((800.0..=4_500.0).contains(&reading.rpm), "{reading:?}");
        }
    }
}
