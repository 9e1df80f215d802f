//! Sunrise & sunset from the classic almanac algorithm
//! (U.S. Naval Observatory, *Almanac for Computers*, 1990).
//!
//! Accuracy: about a minute at mid latitudes, worse close to the polar
//! circles. Times are local clock times: with a named time zone the UTC
//! offset is looked up for each date, so summer times follow daylight
//! saving the same way NOAA's `lst_ldt` tide times do.

use crate::config::LocationConfig;
use crate::TideError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

/// Official zenith: 90° plus refraction and the sun's semi-diameter.
pub const OFFICIAL_ZENITH: f64 = 90.833_3;

const DEGREES_PER_HOUR: f64 = 360.0 / 24.0;

/// Daily sun times for one place. The report only needs these two calls.
pub trait SunTimes {
    /// Local time the sun rises on `date`.
    fn sunrise(&self, date: NaiveDate) -> Result<NaiveDateTime, TideError>;

    /// Local time the sun sets on `date` (may fall after midnight).
    fn sunset(&self, date: NaiveDate) -> Result<NaiveDateTime, TideError>;

    /// Sunset minus sunrise.
    fn daylight(&self, date: NaiveDate) -> Result<Duration, TideError> {
        Ok(self.sunset(date)? - self.sunrise(date)?)
    }
}

/// Which clock sun times are reported on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalClock {
    /// Same offset from UTC all year, in hours
    Fixed(f64),
    /// Civil time in an IANA zone, daylight saving included
    Zone(Tz),
}

impl LocalClock {
    /// Offset from UTC in hours in force on `date`.
    ///
    /// Zones are read at local noon, after any overnight change.
    pub fn utc_offset_hours(&self, date: NaiveDate) -> f64 {
        match *self {
            LocalClock::Fixed(hours) => hours,
            LocalClock::Zone(tz) => {
                let noon = date.and_time(Default::default()) + Duration::hours(12);
                let offset = tz
                    .offset_from_local_datetime(&noon)
                    .earliest()
                    .unwrap_or_else(|| tz.offset_from_utc_datetime(&noon));
                offset.fix().local_minus_utc() as f64 / 3600.0
            }
        }
    }
}

/// Almanac sunrise/sunset for a fixed observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarCalculator {
    pub latitude: f64,
    pub longitude: f64,
    pub clock: LocalClock,
}

impl SolarCalculator {
    /// Observer on a fixed UTC offset.
    pub fn new(latitude: f64, longitude: f64, utc_offset_hours: f64) -> Self {
        Self {
            latitude,
            longitude,
            clock: LocalClock::Fixed(utc_offset_hours),
        }
    }

    /// Observer on the civil time of `tz`.
    pub fn in_zone(latitude: f64, longitude: f64, tz: Tz) -> Self {
        Self {
            latitude,
            longitude,
            clock: LocalClock::Zone(tz),
        }
    }

    /// Local clock hours after midnight of `date` for the event, or `None`
    /// when the sun stays up (or down) all day.
    fn event_hours(&self, date: NaiveDate, rising: bool) -> Option<f64> {
        let hours_from_meridian = self.longitude / DEGREES_PER_HOUR;
        let solar_clock = if rising { 6.0 } else { 18.0 };

        // ---------- 1. Approximate time of the event, in days ----------
        let t = date.ordinal() as f64 + (solar_clock - hours_from_meridian) / 24.0;

        // ---------- 2. Sun's mean anomaly and true longitude ----------
        let m = 0.9856 * t - 3.289;
        let l = (m + 1.916 * sin_deg(m) + 0.020 * sin_deg(2.0 * m) + 282.634).rem_euclid(360.0);

        // ---------- 3. Right ascension, same quadrant as L, in hours ----------
        let mut ra = atan_deg(0.91764 * tan_deg(l)).rem_euclid(360.0);
        let l_quadrant = (l / 90.0).floor() * 90.0;
        let ra_quadrant = (ra / 90.0).floor() * 90.0;
        ra = (ra + l_quadrant - ra_quadrant) / DEGREES_PER_HOUR;

        // ---------- 4. Declination and local hour angle ----------
        let sin_dec = 0.39782 * sin_deg(l);
        let cos_dec = cos_deg(asin_deg(sin_dec));
        let cos_h = (cos_deg(OFFICIAL_ZENITH) - sin_dec * sin_deg(self.latitude))
            / (cos_dec * cos_deg(self.latitude));
        if !(-1.0..=1.0).contains(&cos_h) {
            return None;
        }

        let mut h = acos_deg(cos_h);
        if rising {
            h = 360.0 - h;
        }
        h /= DEGREES_PER_HOUR;

        // ---------- 5. Local mean time → UT → local clock ----------
        let local_mean = h + ra - 0.06571 * t - 6.622;
        let utc_offset = self.clock.utc_offset_hours(date);
        let ut = (local_mean - hours_from_meridian).rem_euclid(24.0);
        let raw = ut + utc_offset;

        // Pick the wrap of `raw` nearest the expected clock time, so a sunset
        // after midnight lands on the next day instead of this morning.
        let expected = solar_clock - hours_from_meridian + utc_offset;
        Some(expected + ((raw - expected + 12.0).rem_euclid(24.0) - 12.0))
    }

    fn event(
        &self,
        date: NaiveDate,
        rising: bool,
        name: &'static str,
    ) -> Result<NaiveDateTime, TideError> {
        let hours = self
            .event_hours(date, rising)
            .ok_or(TideError::NoSolarEvent { date, event: name })?;
        let seconds = (hours * 3600.0).floor() as i64;
        Ok(date.and_time(Default::default()) + Duration::seconds(seconds))
    }
}

impl From<&LocationConfig> for SolarCalculator {
    /// A fixed `utc_offset_hours` wins over `timezone`; with neither the
    /// clock is UTC.
    fn from(location: &LocationConfig) -> Self {
        let (lat, lon) = (location.latitude, location.longitude);
        match (location.utc_offset_hours, location.timezone) {
            (Some(hours), _) => SolarCalculator::new(lat, lon, hours),
            (None, Some(tz)) => SolarCalculator::in_zone(lat, lon, tz),
            (None, None) => SolarCalculator::new(lat, lon, 0.0),
        }
    }
}

impl SunTimes for SolarCalculator {
    fn sunrise(&self, date: NaiveDate) -> Result<NaiveDateTime, TideError> {
        self.event(date, true, "sunrise")
    }

    fn sunset(&self, date: NaiveDate) -> Result<NaiveDateTime, TideError> {
        self.event(date, false, "sunset")
    }
}

fn sin_deg(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan_deg(deg: f64) -> f64 {
    deg.to_radians().tan()
}

fn asin_deg(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn acos_deg(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn atan_deg(x: f64) -> f64 {
    x.atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    /// Within two minutes either way
    fn assert_near(actual: NaiveDateTime, expected: NaiveDateTime) {
        let diff = (actual - expected).num_seconds().abs();
        assert!(diff <= 120, "{actual} is {diff}s from {expected}");
    }

    #[test]
    fn test_new_york_summer_solstice() {
        let nyc = SolarCalculator::new(40.7128, -74.006, -4.0);
        let day = date(2025, 6, 21);
        assert_near(nyc.sunrise(day).unwrap(), at(day, 5, 25));
        assert_near(nyc.sunset(day).unwrap(), at(day, 20, 31));
    }

    #[test]
    fn test_equator_equinox_is_about_twelve_hours() {
        let origin = SolarCalculator::new(0.0, 0.0, 0.0);
        let day = date(2025, 3, 20);
        assert_near(origin.sunrise(day).unwrap(), at(day, 6, 4));
        assert_near(origin.sunset(day).unwrap(), at(day, 18, 11));
        let daylight = origin.daylight(day).unwrap();
        assert!((Duration::minutes(715)..=Duration::minutes(735)).contains(&daylight));
    }

    #[test]
    fn test_bethel_winter() {
        let bethel = SolarCalculator::new(60.48, -161.46, -9.0);
        let day = date(2025, 12, 21);
        assert_near(bethel.sunrise(day).unwrap(), at(day, 10, 53));
        assert_near(bethel.sunset(day).unwrap(), at(day, 16, 35));
    }

    #[test]
    fn test_sunset_after_midnight_lands_on_next_day() {
        let bethel = SolarCalculator::new(60.48, -161.46, -8.0);
        let day = date(2025, 6, 21);
        let sunset = bethel.sunset(day).unwrap();
        assert_near(sunset, at(date(2025, 6, 22), 0, 19));
        assert!(bethel.daylight(day).unwrap() > Duration::hours(18));
    }

    #[test]
    fn test_polar_day_and_night() {
        let longyearbyen = SolarCalculator::new(78.22, 15.65, 1.0);
        for day in [date(2025, 6, 21), date(2025, 12, 21)] {
            assert!(matches!(
                longyearbyen.sunrise(day),
                Err(TideError::NoSolarEvent { event: "sunrise", .. })
            ));
            assert!(matches!(
                longyearbyen.sunset(day),
                Err(TideError::NoSolarEvent { event: "sunset", .. })
            ));
        }
    }

    #[test]
    fn test_anchorage_zone_follows_daylight_saving() {
        let clock = LocalClock::Zone(chrono_tz::America::Anchorage);
        assert_eq!(clock.utc_offset_hours(date(2025, 1, 15)), -9.0);
        // Clocks go forward at 02:00 on 2025-03-09 and back on 2025-11-02
        assert_eq!(clock.utc_offset_hours(date(2025, 3, 8)), -9.0);
        assert_eq!(clock.utc_offset_hours(date(2025, 3, 9)), -8.0);
        assert_eq!(clock.utc_offset_hours(date(2025, 7, 1)), -8.0);
        assert_eq!(clock.utc_offset_hours(date(2025, 11, 1)), -8.0);
        assert_eq!(clock.utc_offset_hours(date(2025, 11, 2)), -9.0);
    }

    #[test]
    fn test_default_location_summer_is_on_daylight_time() {
        let bethel = SolarCalculator::from(&Config::default().location);
        let day = date(2025, 7, 1);
        assert_near(bethel.sunrise(day).unwrap(), at(day, 5, 22));
        assert_near(bethel.sunset(day).unwrap(), at(date(2025, 7, 2), 0, 16));
    }

    #[test]
    fn test_default_location_winter_is_on_standard_time() {
        let bethel = SolarCalculator::from(&Config::default().location);
        let day = date(2025, 1, 15);
        assert_near(bethel.sunrise(day).unwrap(), at(day, 10, 37));
        assert_near(bethel.sunset(day).unwrap(), at(day, 17, 14));
    }

    #[test]
    fn test_fixed_offset_overrides_zone() {
        let mut location = Config::default().location;
        location.utc_offset_hours = Some(-9.0);
        let bethel = SolarCalculator::from(&location);
        assert_eq!(bethel.clock, LocalClock::Fixed(-9.0));

        let day = date(2025, 7, 1);
        assert_near(bethel.sunrise(day).unwrap(), at(day, 4, 22));
    }
}
