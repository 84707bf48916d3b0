//! Feature preparation
//!
//! This module turns a [`UserInput`] into the feature vector the model was trained on:
//! - Wake time as seconds since midnight (hour and minute only)
//! - Desired sleep passed through in hours
//! - Coffee count shifted by one cup

use chrono::{NaiveTime, Timelike};

use crate::types::{SleepFeatures, UserInput};

/// Cups added to the picker selection before evaluation
pub const COFFEE_OFFSET: u32 = 1;

/// Builds model features from user input
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Prepare features for a single estimate.
    ///
    /// No range checks happen here; out-of-range values are handed to the
    /// model unchanged.
    pub fn extract(input: &UserInput) -> SleepFeatures {
        SleepFeatures {
            wake: wake_seconds(input.wake_time) as f64,
            estimated_sleep: input.desired_sleep_hours,
            coffee: coffee_cups(input.coffee_count) as f64,
        }
    }
}

/// Seconds from midnight to the given time, ignoring seconds
pub fn wake_seconds(time: NaiveTime) -> u32 {
    time.hour() * 3600 + time.minute() * 60
}

/// Cup count the model expects for a picker selection
pub fn coffee_cups(selection: u32) -> u32 {
    selection.saturating_add(COFFEE_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(h: u32, m: u32, hours: f64, coffee: u32) -> UserInput {
        UserInput::new(NaiveTime::from_hms_opt(h, m, 0).unwrap(), hours, coffee)
    }

    #[test]
    fn test_wake_seconds() {
        assert_eq!(wake_seconds(NaiveTime::from_hms_opt(0, 0, 0).unwrap()), 0);
        assert_eq!(wake_seconds(NaiveTime::from_hms_opt(7, 0, 0).unwrap()), 25_200);
        assert_eq!(wake_seconds(NaiveTime::from_hms_opt(23, 59, 0).unwrap()), 86_340);
        // Seconds are not part of the feature
        assert_eq!(wake_seconds(NaiveTime::from_hms_opt(6, 30, 45).unwrap()), 23_400);
    }

    #[test]
    fn test_minimum_coffee_selection_sends_two_cups() {
        let features = FeatureExtractor::extract(&input(7, 0, 8.0, 1));
        assert_eq!(features.coffee, 2.0);
    }

    #[test]
    fn test_extract_passes_values_through() {
        let features = FeatureExtractor::extract(&input(6, 15, 13.5, 0));

        assert_eq!(features.wake, 22_500.0);
        assert_eq!(features.estimated_sleep, 13.5);
        assert_eq!(features.coffee, 1.0);
    }

    #[test]
    fn test_coffee_cups_saturates() {
        assert_eq!(coffee_cups(u32::MAX), u32::MAX);
    }
}
