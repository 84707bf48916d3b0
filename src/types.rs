//! Core types for BetterRest
//!
//! This module defines the data that flows through an estimate: the user's
//! form input, the feature vector handed to the model, and the resulting bedtime.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Seconds in one calendar day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Model input name for the wake time (seconds since midnight)
pub const FEATURE_WAKE: &str = "wake";
/// Model input name for the desired sleep amount (hours)
pub const FEATURE_ESTIMATED_SLEEP: &str = "estimatedSleep";
/// Model input name for the coffee count (cups)
pub const FEATURE_COFFEE: &str = "coffee";
/// Model output name for the predicted sleep (seconds)
pub const OUTPUT_ACTUAL_SLEEP: &str = "actualSleep";

/// Model inputs in the order the artifact must declare them
pub const FEATURE_NAMES: [&str; 3] = [FEATURE_WAKE, FEATURE_ESTIMATED_SLEEP, FEATURE_COFFEE];

/// One estimation request, captured from the form at the moment of the user action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    /// Time of day the user wants to wake up
    #[serde(with = "hhmm")]
    pub wake_time: NaiveTime,
    /// Desired amount of sleep in hours
    pub desired_sleep_hours: f64,
    /// Coffee picker selection
    pub coffee_count: u32,
}

impl UserInput {
    pub fn new(wake_time: NaiveTime, desired_sleep_hours: f64, coffee_count: u32) -> Self {
        Self {
            wake_time,
            desired_sleep_hours,
            coffee_count,
        }
    }

    /// Parse a JSON request such as `{"wake_time":"07:00","desired_sleep_hours":8.0,"coffee_count":1}`
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Named feature vector evaluated by a prediction model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepFeatures {
    /// Seconds from midnight to the wake time
    pub wake: f64,
    /// Desired sleep in hours
    #[serde(rename = "estimatedSleep")]
    pub estimated_sleep: f64,
    /// Cups of coffee per day
    pub coffee: f64,
}

impl SleepFeatures {
    /// Look up a feature by its model input name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            FEATURE_WAKE => Some(self.wake),
            FEATURE_ESTIMATED_SLEEP => Some(self.estimated_sleep),
            FEATURE_COFFEE => Some(self.coffee),
            _ => None,
        }
    }

    /// Values in [`FEATURE_NAMES`] order
    pub fn as_array(&self) -> [f64; 3] {
        [self.wake, self.estimated_sleep, self.coffee]
    }
}

/// Estimated bedtime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bedtime {
    /// Time of day to go to bed
    pub time: NaiveTime,
    /// Calendar days between the bedtime and the wake day (1 = previous day,
    /// negative when the model predicts negative sleep)
    pub days_before_wake: i64,
    /// The model's predicted sleep in seconds
    pub predicted_sleep_seconds: f64,
}

impl Bedtime {
    /// True when the bedtime falls on an earlier calendar day than the wake time
    pub fn is_previous_day(&self) -> bool {
        self.days_before_wake > 0
    }

    /// Short local time without a date component, e.g. "11:00 PM"
    pub fn formatted(&self) -> String {
        self.time.format("%-I:%M %p").to_string()
    }

    /// 24-hour clock time, e.g. "23:00"
    pub fn clock(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

impl std::fmt::Display for Bedtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted())
    }
}

/// Parse a wake time entered as `HH:MM` (seconds are accepted and dropped)
pub fn parse_wake_time(value: &str) -> Result<NaiveTime, InputError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
        .and_then(|t| t.with_second(0))
        .ok_or_else(|| InputError::InvalidWakeTime(value.to_string()))
}

/// Serde adapter for `HH:MM` time strings
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wake_time(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wake_time() {
        assert_eq!(
            parse_wake_time("07:30").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(
            parse_wake_time(" 23:05:59 ").unwrap(),
            NaiveTime::from_hms_opt(23, 5, 0).unwrap()
        );
        assert!(parse_wake_time("25:00").is_err());
        assert!(parse_wake_time("seven").is_err());
    }

    #[test]
    fn test_user_input_from_json() {
        let input = UserInput::from_json(
            r#"{"wake_time":"06:45","desired_sleep_hours":7.5,"coffee_count":3}"#,
        )
        .unwrap();

        assert_eq!(input.wake_time, NaiveTime::from_hms_opt(6, 45, 0).unwrap());
        assert_eq!(input.desired_sleep_hours, 7.5);
        assert_eq!(input.coffee_count, 3);

        let json = serde_json::to_value(input).unwrap();
        assert_eq!(json["wake_time"], "06:45");
    }

    #[test]
    fn test_user_input_rejects_bad_time() {
        let result = UserInput::from_json(
            r#"{"wake_time":"noon","desired_sleep_hours":8.0,"coffee_count":1}"#,
        );
        assert!(matches!(result, Err(InputError::InvalidRequest(_))));
    }

    #[test]
    fn test_features_lookup_by_name() {
        let features = SleepFeatures {
            wake: 25_200.0,
            estimated_sleep: 8.0,
            coffee: 2.0,
        };

        assert_eq!(features.get("wake"), Some(25_200.0));
        assert_eq!(features.get("estimatedSleep"), Some(8.0));
        assert_eq!(features.get("coffee"), Some(2.0));
        assert_eq!(features.get("tea"), None);
        assert_eq!(features.as_array(), [25_200.0, 8.0, 2.0]);

        let json = serde_json::to_value(features).unwrap();
        assert_eq!(json["estimatedSleep"], 8.0);
    }

    #[test]
    fn test_bedtime_formatting() {
        let bedtime = Bedtime {
            time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            days_before_wake: 1,
            predicted_sleep_seconds: 28_800.0,
        };

        assert_eq!(bedtime.formatted(), "11:00 PM");
        assert_eq!(bedtime.clock(), "23:00");
        assert!(bedtime.is_previous_day());
        assert_eq!(bedtime.to_string(), "11:00 PM");
    }
}
