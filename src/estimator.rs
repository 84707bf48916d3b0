//! Bedtime estimation
//!
//! Pipeline for one user action:
//! 1. FeatureExtractor - wake seconds, desired hours, coffee + 1
//! 2. PredictionModel - predicted actual sleep in seconds
//! 3. Rollover subtraction - wake time minus predicted sleep, wrapping across midnight
//!
//! Estimation is stateless: the model is read-only and each call computes a
//! fresh [`Bedtime`].

use std::path::Path;

use chrono::{Duration, NaiveTime};
use tracing::{debug, warn};

use crate::error::{EstimationError, ModelError};
use crate::features::FeatureExtractor;
use crate::model::{PredictionModel, SleepCalculator};
use crate::types::{Bedtime, UserInput, SECONDS_PER_DAY};

/// Estimator bound to a loaded model
#[derive(Debug)]
pub struct BedtimeEstimator<M: PredictionModel = SleepCalculator> {
    model: M,
}

impl BedtimeEstimator<SleepCalculator> {
    /// Estimator using the bundled model artifact
    pub fn bundled() -> Result<Self, EstimationError> {
        Ok(Self::new(SleepCalculator::bundled()?))
    }

    /// Estimator using an artifact on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EstimationError> {
        Ok(Self::new(SleepCalculator::load(path)?))
    }

    /// Estimator using `path` when given, otherwise the bundled artifact
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, EstimationError> {
        Ok(Self::new(SleepCalculator::load_or_bundled(path)?))
    }
}

impl<M: PredictionModel> BedtimeEstimator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Estimate the bedtime for one request
    pub fn estimate(&self, input: &UserInput) -> Result<Bedtime, EstimationError> {
        estimate_input(&self.model, input)
    }
}

/// Estimate a bedtime from raw form values.
///
/// `coffee_count` is the picker selection; one cup is added before the model
/// sees it. Values outside the form's ranges are not rejected.
pub fn estimate(
    model: &dyn PredictionModel,
    wake_time: NaiveTime,
    desired_sleep_hours: f64,
    coffee_count: u32,
) -> Result<Bedtime, EstimationError> {
    estimate_input(
        model,
        &UserInput::new(wake_time, desired_sleep_hours, coffee_count),
    )
}

/// Load the model and estimate in one step, as a host without a long-lived
/// estimator would. Load failures surface as [`EstimationError::ModelUnavailable`].
pub fn estimate_with_artifact(
    path: Option<&Path>,
    input: &UserInput,
) -> Result<Bedtime, EstimationError> {
    let model = SleepCalculator::load_or_bundled(path).map_err(|e| {
        warn!(error = %e, "sleep model could not be loaded");
        EstimationError::ModelUnavailable(e)
    })?;
    estimate_input(&model, input)
}

fn estimate_input<M: PredictionModel + ?Sized>(
    model: &M,
    input: &UserInput,
) -> Result<Bedtime, EstimationError> {
    let features = FeatureExtractor::extract(input);

    let bedtime = model
        .predict(&features)
        .and_then(|predicted| {
            let (time, days_before_wake) = subtract_sleep(input.wake_time, predicted)?;
            Ok(Bedtime {
                time,
                days_before_wake,
                predicted_sleep_seconds: predicted,
            })
        })
        .map_err(|e| {
            warn!(model = model.name(), error = %e, "bedtime estimation failed");
            EstimationError::ModelUnavailable(e)
        })?;

    debug!(
        model = model.name(),
        wake = features.wake,
        estimated_sleep = features.estimated_sleep,
        coffee = features.coffee,
        predicted_sleep_seconds = bedtime.predicted_sleep_seconds,
        bedtime = %bedtime.clock(),
        days_before_wake = bedtime.days_before_wake,
        "estimated bedtime"
    );

    Ok(bedtime)
}

/// Subtract `seconds` from `wake`, returning the time of day and how many
/// days earlier it falls.
fn subtract_sleep(wake: NaiveTime, seconds: f64) -> Result<(NaiveTime, i64), ModelError> {
    let millis = (seconds * 1000.0).round();
    let delta = if millis.abs() < i64::MAX as f64 {
        Duration::try_milliseconds(millis as i64)
    } else {
        None
    }
    .ok_or_else(|| ModelError::Evaluation(format!("prediction {seconds}s is out of range")))?;

    let (time, wrapped_seconds) = wake.overflowing_sub_signed(delta);
    Ok((time, wrapped_seconds / SECONDS_PER_DAY))
}
