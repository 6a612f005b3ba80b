use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveTime, Timelike};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{Error, ScheduleTime, Seconds, TRANSPORT_STOP_ZOOM, geometry};

const KMH: f64 = 1.0 / 3.6;

/// Parameters of one planning request.
///
/// Distances are meters, speeds meters per second, times seconds, except the
/// schedule fields which count ten-second ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportRoutingConfiguration {
    /// Zoom of the tiles stops are loaded and cached by
    pub zoom_to_load_tiles: u8,
    /// Walking reach at the start and the destination
    pub walk_radius: f64,
    /// Walking reach when changing between routes
    pub walk_change_radius: f64,
    pub max_number_of_changes: u32,
    /// Slack over the best finish time still worth exploring
    pub finish_time_seconds: Seconds,
    pub max_route_time: Seconds,
    pub walk_speed: f64,
    pub default_travel_speed: f64,
    /// Dwell time added at every stop ridden past
    pub stop_time: Seconds,
    pub change_time: Seconds,
    pub boarding_time: Seconds,
    pub use_schedule: bool,
    pub schedule_time_of_day: ScheduleTime,
    /// Width of the departure window after `schedule_time_of_day`
    pub schedule_max_time: ScheduleTime,
    /// Travel speed per route type
    pub speed: BTreeMap<String, f64>,
    /// Return data inconsistencies as errors instead of skipping the item
    pub strict: bool,
}

impl Default for TransportRoutingConfiguration {
    fn default() -> Self {
        let speed = [
            ("bus", 30.0),
            ("trolleybus", 25.0),
            ("tram", 20.0),
            ("share_taxi", 30.0),
            ("light_rail", 40.0),
            ("subway", 40.0),
            ("monorail", 40.0),
            ("funicular", 10.0),
            ("train", 80.0),
            ("ferry", 20.0),
        ]
        .into_iter()
        .map(|(route_type, kmh)| (route_type.to_string(), kmh * KMH))
        .collect();

        Self {
            zoom_to_load_tiles: 15,
            walk_radius: 1500.0,
            walk_change_radius: 300.0,
            max_number_of_changes: 3,
            finish_time_seconds: 1200.0,
            max_route_time: 36_000.0,
            walk_speed: 3.6 * KMH,
            default_travel_speed: 60.0 * KMH,
            stop_time: 30.0,
            change_time: 180.0,
            boarding_time: 0.0,
            use_schedule: false,
            schedule_time_of_day: 12 * 60 * 6,
            schedule_max_time: 50 * 6,
            speed,
            strict: false,
        }
    }
}

impl TransportRoutingConfiguration {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Checks the values the planner divides by or shifts with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.zoom_to_load_tiles > TRANSPORT_STOP_ZOOM {
            return Err(Error::Configuration(format!(
                "zoom_to_load_tiles must not exceed {TRANSPORT_STOP_ZOOM}, got {}",
                self.zoom_to_load_tiles
            )));
        }
        if !(self.walk_speed.is_finite() && self.walk_speed > 0.0) {
            return Err(Error::Configuration(format!(
                "walk_speed must be positive, got {}",
                self.walk_speed
            )));
        }
        let non_negative = [
            ("walk_radius", self.walk_radius),
            ("walk_change_radius", self.walk_change_radius),
            ("finish_time_seconds", self.finish_time_seconds),
            ("max_route_time", self.max_route_time),
            ("default_travel_speed", self.default_travel_speed),
            ("stop_time", self.stop_time),
            ("change_time", self.change_time),
            ("boarding_time", self.boarding_time),
        ];
        if let Some((name, value)) = non_negative
            .into_iter()
            .find(|(_, value)| !(value.is_finite() && *value >= 0.0))
        {
            return Err(Error::Configuration(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
        if let Some((route_type, speed)) = self.speed.iter().find(|(_, s)| !(**s >= 0.0)) {
            return Err(Error::Configuration(format!(
                "speed for '{route_type}' must be non-negative, got {speed}"
            )));
        }
        if self.schedule_time_of_day < 0 || self.schedule_max_time < 0 {
            return Err(Error::Configuration(format!(
                "schedule window [{}, +{}] must not be negative",
                self.schedule_time_of_day, self.schedule_max_time
            )));
        }
        Ok(())
    }

    /// Speed of a route type; unknown types ride at `default_travel_speed`.
    pub fn speed_by_route_type(&self, route_type: &str) -> f64 {
        self.speed
            .get(route_type)
            .copied()
            .unwrap_or(self.default_travel_speed)
    }

    /// Sets `schedule_time_of_day` from a clock time.
    #[allow(clippy::cast_possible_wrap)]
    pub fn set_departure_time(&mut self, time: NaiveTime) {
        self.schedule_time_of_day = (time.num_seconds_from_midnight() / 10) as ScheduleTime;
    }

    pub fn departure_time(&self) -> Option<NaiveTime> {
        let seconds = u32::try_from(self.schedule_time_of_day).ok()? * 10;
        NaiveTime::from_num_seconds_from_midnight_opt(seconds % 86_400, 0)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn walk_radius_31(&self) -> i64 {
        (self.walk_radius / geometry::tile_distance_width(31.0)) as i64
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn walk_change_radius_31(&self) -> i64 {
        (self.walk_change_radius / geometry::tile_distance_width(31.0)) as i64
    }

    /// Applies the strict/lenient policy: recoverable errors are logged and
    /// swallowed unless `strict` is set.
    pub(crate) fn tolerate(&self, err: Error) -> Result<(), Error> {
        if self.strict || !err.is_recoverable() {
            return Err(err);
        }
        warn!("{err}, skipping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = TransportRoutingConfiguration::default();
        assert_eq!(cfg.zoom_to_load_tiles, 15);
        assert!((cfg.walk_speed - 1.0).abs() < 1e-9);
        assert!((cfg.speed_by_route_type("bus") - 30.0 / 3.6).abs() < 1e-9);
        assert!((cfg.speed_by_route_type("cable_car") - 60.0 / 3.6).abs() < 1e-9);
        assert_eq!(cfg.departure_time(), NaiveTime::from_hms_opt(12, 0, 0));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = TransportRoutingConfiguration::from_json_str(
            r#"{ "walk_radius": 800, "use_schedule": true, "speed": { "bus": 10.0 } }"#,
        )
        .unwrap();
        assert!((cfg.walk_radius - 800.0).abs() < f64::EPSILON);
        assert!(cfg.use_schedule);
        assert_eq!(cfg.max_number_of_changes, 3);
        assert!((cfg.speed_by_route_type("bus") - 10.0).abs() < f64::EPSILON);
        assert!((cfg.speed_by_route_type("tram") - 60.0 / 3.6).abs() < 1e-9);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cfg = TransportRoutingConfiguration {
            walk_speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Configuration(_))));

        let cfg = TransportRoutingConfiguration {
            zoom_to_load_tiles: 25,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = TransportRoutingConfiguration {
            change_time: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn departure_time_is_stored_in_ticks() {
        let mut cfg = TransportRoutingConfiguration::default();
        cfg.set_departure_time(NaiveTime::from_hms_opt(8, 30, 15).unwrap());
        assert_eq!(cfg.schedule_time_of_day, (8 * 3600 + 30 * 60 + 15) / 10);
    }

    #[test]
    fn radius_in_tile_units() {
        let cfg = TransportRoutingConfiguration::default();
        let r = cfg.walk_radius_31();
        assert!(r > 0);
        assert!(cfg.walk_change_radius_31() < r);
    }

    #[test]
    fn lenient_mode_swallows_data_errors_only() {
        let lenient = TransportRoutingConfiguration::default();
        assert!(lenient.tolerate(Error::DataInconsistency("x".into())).is_ok());
        assert!(lenient.tolerate(Error::Configuration("x".into())).is_err());
        let strict = TransportRoutingConfiguration {
            strict: true,
            ..Default::default()
        };
        assert!(strict.tolerate(Error::DataInconsistency("x".into())).is_err());
    }
}
