//! BetterRest - On-device bedtime estimation
//!
//! BetterRest estimates an ideal bedtime from a wake-up time, a desired amount
//! of sleep and daily coffee intake through a short deterministic pipeline:
//! form input → feature preparation → regression model → rollover subtraction
//! → bedtime report.
//!
//! ## Modules
//!
//! - **Estimator**: Feature preparation, model evaluation and bedtime arithmetic
//! - **Model**: The `PredictionModel` boundary and the artifact-backed `SleepCalculator`
//! - **Form**: Bounded form controls that produce estimation requests
//! - **Report**: The bedtime or error alert shown to the user, encoded as JSON
//! - **FFI**: C ABI for native hosts

pub mod error;
pub mod estimator;
pub mod features;
pub mod form;
pub mod model;
pub mod report;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::{EstimationError, InputError, ModelError};
pub use estimator::{estimate, estimate_with_artifact, BedtimeEstimator};
pub use form::SleepForm;
pub use model::{PredictionModel, SleepCalculator};
pub use report::{BedtimeReport, ReportEncoder};
pub use types::{Bedtime, SleepFeatures, UserInput};

/// Library version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "better-rest";

/// Name of the model artifact compiled into the crate
pub const BUNDLED_MODEL_NAME: &str = "SleepCalculator";
