//! Headless sleep form
//!
//! The form owns the bounded controls: a wake-time picker, a quarter-hour sleep
//! stepper and a coffee picker. Controls keep their values in range so the
//! estimator never has to re-check them. Each user action snapshots the form
//! into an immutable [`UserInput`].

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::features::coffee_cups;
use crate::types::{hhmm, UserInput};

/// Lower bound of the sleep stepper (hours)
pub const MIN_SLEEP_HOURS: f64 = 4.0;
/// Upper bound of the sleep stepper (hours)
pub const MAX_SLEEP_HOURS: f64 = 12.0;
/// Stepper increment (hours)
pub const SLEEP_STEP_HOURS: f64 = 0.25;
/// Initial sleep amount (hours)
pub const DEFAULT_SLEEP_HOURS: f64 = 8.0;

/// Lowest coffee picker selection
pub const MIN_COFFEE: u32 = 1;
/// Highest coffee picker selection
pub const MAX_COFFEE: u32 = 10;
/// Initial coffee picker selection
pub const DEFAULT_COFFEE: u32 = 1;

pub const WAKE_SECTION_TITLE: &str = "When do you want to wake up?";
pub const SLEEP_SECTION_TITLE: &str = "Desired amount of sleep";
pub const COFFEE_SECTION_TITLE: &str = "Daily coffee intake";

/// Default wake time: 07:00
pub fn default_wake_time() -> NaiveTime {
    NaiveTime::MIN + chrono::Duration::hours(7)
}

/// Quarter-hour stepper bounded to [4, 12]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct SleepStepper {
    hours: f64,
}

impl Default for SleepStepper {
    fn default() -> Self {
        Self {
            hours: DEFAULT_SLEEP_HOURS,
        }
    }
}

impl SleepStepper {
    /// Create a stepper at the nearest valid value
    pub fn new(hours: f64) -> Self {
        let mut stepper = Self::default();
        stepper.set(hours);
        stepper
    }

    pub fn hours(&self) -> f64 {
        self.hours
    }

    /// Snap to the nearest quarter hour inside the bounds. NaN leaves the value unchanged.
    pub fn set(&mut self, hours: f64) {
        if hours.is_nan() {
            return;
        }
        let snapped = (hours / SLEEP_STEP_HOURS).round() * SLEEP_STEP_HOURS;
        self.hours = snapped.clamp(MIN_SLEEP_HOURS, MAX_SLEEP_HOURS);
    }

    pub fn increment(&mut self) {
        self.set(self.hours + SLEEP_STEP_HOURS);
    }

    pub fn decrement(&mut self) {
        self.set(self.hours - SLEEP_STEP_HOURS);
    }

    /// e.g. "8 hours", "8.25 hours"
    pub fn label(&self) -> String {
        format!("{} hours", format_hours(self.hours))
    }
}

/// Coffee picker bounded to [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct CoffeePicker {
    selection: u32,
}

impl Default for CoffeePicker {
    fn default() -> Self {
        Self {
            selection: DEFAULT_COFFEE,
        }
    }
}

impl CoffeePicker {
    pub fn new(selection: u32) -> Self {
        let mut picker = Self::default();
        picker.select(selection);
        picker
    }

    pub fn selection(&self) -> u32 {
        self.selection
    }

    pub fn select(&mut self, selection: u32) {
        self.selection = selection.clamp(MIN_COFFEE, MAX_COFFEE);
    }

    /// Selectable values, in display order
    pub fn options() -> impl Iterator<Item = u32> {
        MIN_COFFEE..=MAX_COFFEE
    }

    /// Label for the cup count sent to the model: "1 cup" or "N cups"
    pub fn label(&self) -> String {
        match coffee_cups(self.selection) {
            1 => "1 cup".to_string(),
            cups => format!("{cups} cups"),
        }
    }
}

impl From<f64> for SleepStepper {
    fn from(hours: f64) -> Self {
        Self::new(hours)
    }
}

impl From<SleepStepper> for f64 {
    fn from(stepper: SleepStepper) -> Self {
        stepper.hours
    }
}

impl From<u32> for CoffeePicker {
    fn from(selection: u32) -> Self {
        Self::new(selection)
    }
}

impl From<CoffeePicker> for u32 {
    fn from(picker: CoffeePicker) -> Self {
        picker.selection
    }
}

/// Complete form state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepForm {
    #[serde(with = "hhmm")]
    pub wake_time: NaiveTime,
    pub sleep: SleepStepper,
    pub coffee: CoffeePicker,
}

impl Default for SleepForm {
    fn default() -> Self {
        Self {
            wake_time: default_wake_time(),
            sleep: SleepStepper::default(),
            coffee: CoffeePicker::default(),
        }
    }
}

impl SleepForm {
    /// Build a form from raw values, bringing each into its control's range
    pub fn with_values(wake_time: NaiveTime, sleep_hours: f64, coffee: u32) -> Self {
        Self {
            wake_time,
            sleep: SleepStepper::new(sleep_hours),
            coffee: CoffeePicker::new(coffee),
        }
    }

    /// Snapshot the form for one estimate
    pub fn input(&self) -> UserInput {
        UserInput::new(self.wake_time, self.sleep.hours(), self.coffee.selection())
    }
}

/// Format hours without trailing zeros: 8 -> "8", 8.5 -> "8.5", 8.25 -> "8.25"
fn format_hours(hours: f64) -> String {
    let text = format!("{hours:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let form = SleepForm::default();
        let input = form.input();

        assert_eq!(input.wake_time, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(input.desired_sleep_hours, 8.0);
        assert_eq!(input.coffee_count, 1);
    }

    #[test]
    fn test_stepper_steps_by_quarter_hours() {
        let mut stepper = SleepStepper::default();
        stepper.increment();
        assert_eq!(stepper.hours(), 8.25);
        stepper.decrement();
        stepper.decrement();
        assert_eq!(stepper.hours(), 7.75);
    }

    #[test]
    fn test_stepper_stays_in_bounds() {
        let mut stepper = SleepStepper::new(MAX_SLEEP_HOURS);
        stepper.increment();
        assert_eq!(stepper.hours(), 12.0);

        let mut stepper = SleepStepper::new(MIN_SLEEP_HOURS);
        stepper.decrement();
        assert_eq!(stepper.hours(), 4.0);

        assert_eq!(SleepStepper::new(30.0).hours(), 12.0);
        assert_eq!(SleepStepper::new(-1.0).hours(), 4.0);
    }

    #[test]
    fn test_stepper_snaps_to_quarter() {
        assert_eq!(SleepStepper::new(7.1).hours(), 7.0);
        assert_eq!(SleepStepper::new(7.2).hours(), 7.25);
        assert_eq!(SleepStepper::new(f64::NAN).hours(), DEFAULT_SLEEP_HOURS);
    }

    #[test]
    fn test_stepper_label() {
        assert_eq!(SleepStepper::new(8.0).label(), "8 hours");
        assert_eq!(SleepStepper::new(8.5).label(), "8.5 hours");
        assert_eq!(SleepStepper::new(8.25).label(), "8.25 hours");
        assert_eq!(SleepStepper::new(10.0).label(), "10 hours");
    }

    #[test]
    fn test_coffee_picker_bounds() {
        assert_eq!(CoffeePicker::new(0).selection(), 1);
        assert_eq!(CoffeePicker::new(11).selection(), 10);
        assert_eq!(CoffeePicker::options().collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_coffee_label_counts_model_cups() {
        assert_eq!(CoffeePicker::new(1).label(), "2 cups");
        assert_eq!(CoffeePicker::new(10).label(), "11 cups");
    }

    #[test]
    fn test_form_serializes_flat() {
        let form = SleepForm::with_values(NaiveTime::from_hms_opt(6, 30, 0).unwrap(), 7.5, 3);
        let json = serde_json::to_value(form).unwrap();

        assert_eq!(json["wake_time"], "06:30");
        assert_eq!(json["sleep"], 7.5);
        assert_eq!(json["coffee"], 3);
    }

    #[test]
    fn test_deserialized_form_is_clamped() {
        let form: SleepForm =
            serde_json::from_str(r#"{"wake_time":"05:00","sleep":13.1,"coffee":0}"#).unwrap();

        assert_eq!(form.sleep.hours(), 12.0);
        assert_eq!(form.coffee.selection(), 1);
    }
}
