//! Bedtime report encoding
//!
//! Turns an estimation result into what the user sees: either the ideal bedtime
//! or the error alert. Reports are serialized as JSON for the CLI and FFI hosts.

use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EstimationError;
use crate::features::FeatureExtractor;
use crate::types::{Bedtime, SleepFeatures, UserInput};
use crate::{PRODUCER_NAME, VERSION};

/// Title shown above a computed bedtime
pub const SUCCESS_TITLE: &str = "Your ideal bedtime is…";
/// Title of the error alert
pub const ERROR_TITLE: &str = "Error";
/// Message of the error alert
pub const ERROR_MESSAGE: &str = "Sorry, there was a problem calculating your bedtime.";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub model: String,
}

/// Successful estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedtimeOutcome {
    /// Exact bedtime, "HH:MM:SS%.f"
    pub bedtime: NaiveTime,
    /// 24-hour clock time, "HH:MM"
    pub clock: String,
    /// Short local time, e.g. "11:00 PM"
    pub display: String,
    pub previous_day: bool,
    pub days_before_wake: i64,
    pub predicted_sleep_seconds: f64,
}

/// What the output area shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Bedtime(BedtimeOutcome),
    Error { reason: String },
}

/// One estimate as presented to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedtimeReport {
    pub report_id: Uuid,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub input: UserInput,
    pub features: SleepFeatures,
    pub title: String,
    pub message: String,
    pub outcome: ReportOutcome,
}

impl BedtimeReport {
    /// True when the report carries a bedtime
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ReportOutcome::Bedtime(_))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Encoder for bedtime reports
pub struct ReportEncoder {
    model_name: String,
}

impl ReportEncoder {
    /// Create an encoder labelling reports with the given model name
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }

    /// Encode an estimation result
    pub fn encode(
        &self,
        input: &UserInput,
        result: &Result<Bedtime, EstimationError>,
    ) -> BedtimeReport {
        let (title, message, outcome) = match result {
            Ok(bedtime) => (
                SUCCESS_TITLE.to_string(),
                bedtime.formatted(),
                ReportOutcome::Bedtime(BedtimeOutcome {
                    bedtime: bedtime.time,
                    clock: bedtime.clock(),
                    display: bedtime.formatted(),
                    previous_day: bedtime.is_previous_day(),
                    days_before_wake: bedtime.days_before_wake,
                    predicted_sleep_seconds: bedtime.predicted_sleep_seconds,
                }),
            ),
            Err(e) => (
                ERROR_TITLE.to_string(),
                ERROR_MESSAGE.to_string(),
                ReportOutcome::Error {
                    reason: e.to_string(),
                },
            ),
        };

        BedtimeReport {
            report_id: Uuid::new_v4(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                model: self.model_name.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            input: *input,
            features: FeatureExtractor::extract(input),
            title,
            message,
            outcome,
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        input: &UserInput,
        result: &Result<Bedtime, EstimationError>,
    ) -> Result<String, serde_json::Error> {
        self.encode(input, result).to_json()
    }
}
