//! FFI bindings for BetterRest
//!
//! This module provides C-compatible functions for calling the estimator from a
//! native mobile shell. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `rest_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_uint};
use std::path::PathBuf;
use std::ptr;

use crate::estimator::{estimate_with_artifact, BedtimeEstimator};
use crate::model::PredictionModel;
use crate::report::ReportEncoder;
use crate::types::{parse_wake_time, UserInput};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Parse the wake time argument, recording an error on failure
unsafe fn wake_input(
    wake_time: *const c_char,
    desired_sleep_hours: c_double,
    coffee_count: c_uint,
) -> Option<UserInput> {
    let wake_str = match cstr_to_string(wake_time) {
        Some(s) => s,
        None => {
            set_last_error("Invalid wake time string pointer");
            return None;
        }
    };

    match parse_wake_time(&wake_str) {
        Ok(wake) => Some(UserInput::new(wake, desired_sleep_hours, coffee_count)),
        Err(e) => {
            set_last_error(&e.to_string());
            None
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Estimate a bedtime with the bundled model and return the report JSON.
///
/// The report is returned even when the model fails; its `outcome.status` is
/// then `"error"`. NULL is only returned for invalid arguments.
///
/// # Safety
/// - `wake_time` must be a valid null-terminated C string in `HH:MM` form.
/// - Returns a newly allocated string that must be freed with `rest_free_string`.
/// - Returns NULL on error; call `rest_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rest_estimate(
    wake_time: *const c_char,
    desired_sleep_hours: c_double,
    coffee_count: c_uint,
) -> *mut c_char {
    clear_last_error();

    let input = match wake_input(wake_time, desired_sleep_hours, coffee_count) {
        Some(input) => input,
        None => return ptr::null_mut(),
    };

    let result = estimate_with_artifact(None, &input);
    let encoder = ReportEncoder::new(crate::BUNDLED_MODEL_NAME);

    match encoder.encode_to_json(&input, &result) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Estimator API
// ============================================================================

/// Opaque handle to a loaded estimator
pub struct RestEstimatorHandle {
    estimator: BedtimeEstimator,
    encoder: ReportEncoder,
}

/// Load a model and create an estimator.
///
/// # Safety
/// - `model_path` must be a valid null-terminated C string, or NULL for the bundled model.
/// - Returns a pointer to a newly allocated estimator.
/// - Must be freed with `rest_estimator_free`.
/// - Returns NULL on error; call `rest_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rest_estimator_new(model_path: *const c_char) -> *mut RestEstimatorHandle {
    clear_last_error();

    let path = if model_path.is_null() {
        None
    } else {
        match cstr_to_string(model_path) {
            Some(s) => Some(PathBuf::from(s)),
            None => {
                set_last_error("Invalid model path string pointer");
                return ptr::null_mut();
            }
        }
    };

    match BedtimeEstimator::load_or_bundled(path.as_deref()) {
        Ok(estimator) => {
            let encoder = ReportEncoder::new(estimator.model().name());
            Box::into_raw(Box::new(RestEstimatorHandle { estimator, encoder }))
        }
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an estimator.
///
/// # Safety
/// - `estimator` must be a valid pointer returned by `rest_estimator_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rest_estimator_free(estimator: *mut RestEstimatorHandle) {
    if !estimator.is_null() {
        drop(Box::from_raw(estimator));
    }
}

/// Estimate a bedtime with a loaded estimator and return the report JSON.
///
/// # Safety
/// - `estimator` must be a valid pointer returned by `rest_estimator_new`.
/// - `wake_time` must be a valid null-terminated C string in `HH:MM` form.
/// - Returns a newly allocated string that must be freed with `rest_free_string`.
/// - Returns NULL on error; call `rest_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rest_estimator_estimate(
    estimator: *const RestEstimatorHandle,
    wake_time: *const c_char,
    desired_sleep_hours: c_double,
    coffee_count: c_uint,
) -> *mut c_char {
    clear_last_error();

    if estimator.is_null() {
        set_last_error("Null estimator pointer");
        return ptr::null_mut();
    }

    let handle = &*estimator;

    let input = match wake_input(wake_time, desired_sleep_hours, coffee_count) {
        Some(input) => input,
        None => return ptr::null_mut(),
    };

    let result = handle.estimator.estimate(&input);

    match handle.encoder.encode_to_json(&input, &result) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by BetterRest functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a BetterRest function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rest_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next BetterRest function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rest_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rest_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
