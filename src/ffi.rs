//! FFI bindings for drowsewatch
//!
//! C-compatible surface for embedding the engine in a mobile shell. All
//! functions use null-terminated C strings and return allocated memory that
//! must be freed by the caller using `drowse_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_uint};
use std::ptr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::MonitorConfig;
use crate::monitor::DriveMonitor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

fn json_to_cstr(value: &serde_json::Value) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Opaque handle to a DriveMonitor
pub struct DriveMonitorHandle {
    monitor: DriveMonitor,
}

/// Create a new monitor.
///
/// `config_json` is an optional `MonitorConfig` JSON document; pass NULL for
/// defaults.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `drowse_monitor_free`.
/// - Returns NULL on error; call `drowse_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn drowse_monitor_new(
    config_json: *const c_char,
) -> *mut DriveMonitorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        MonitorConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match serde_json::from_str::<MonitorConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match DriveMonitor::try_new(config) {
        Ok(monitor) => Box::into_raw(Box::new(DriveMonitorHandle { monitor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a monitor.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `drowse_monitor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn drowse_monitor_free(handle: *mut DriveMonitorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Feed a heart-rate reading and return the outcome as JSON.
///
/// `taken_at` is an optional RFC 3339 timestamp; pass NULL for the current
/// time.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `drowse_monitor_new`.
/// - `taken_at` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with
///   `drowse_free_string`.
/// - Returns NULL on error; call `drowse_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn drowse_monitor_record_reading(
    handle: *mut DriveMonitorHandle,
    bpm: c_uint,
    taken_at: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    };

    let taken_at = if taken_at.is_null() {
        Utc::now()
    } else {
        let raw = match cstr_to_string(taken_at) {
            Some(s) => s,
            None => {
                set_last_error("Invalid taken_at string pointer");
                return ptr::null_mut();
            }
        };
        match raw.parse::<DateTime<Utc>>() {
            Ok(at) => at,
            Err(e) => {
                set_last_error(&format!("Invalid taken_at timestamp: {}", e));
                return ptr::null_mut();
            }
        }
    };

    match handle.monitor.record_reading(bpm, taken_at) {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(s) => string_to_cstr(&s),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// Session transitions share one shape: run the transition, serialize the
// resulting event. A transition that re-affirms the current state returns
// the JSON literal `null` rather than a NULL pointer; NULL always means an
// error.
macro_rules! transition_fn {
    ($(#[$doc:meta])* $name:ident, $method:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        /// - `handle` must be a valid pointer returned by `drowse_monitor_new`.
        /// - Returns a newly allocated string that must be freed with
        ///   `drowse_free_string`.
        /// - Returns NULL on error; call `drowse_last_error` for the message.
        #[no_mangle]
        pub unsafe extern "C" fn $name(handle: *mut DriveMonitorHandle) -> *mut c_char {
            clear_last_error();

            let Some(handle) = handle.as_ref() else {
                set_last_error("Null monitor pointer");
                return ptr::null_mut();
            };

            match handle.monitor.$method() {
                Ok(event) => json_to_cstr(&json!(event)),
                Err(e) => {
                    set_last_error(&e.to_string());
                    ptr::null_mut()
                }
            }
        }
    };
}

transition_fn!(
    /// Open a session (activity goes active, stopwatch starts).
    drowse_monitor_start,
    start_session
);
transition_fn!(
    /// Begin a rest (alerting suppressed, stopwatch paused).
    drowse_monitor_pause,
    pause_session
);
transition_fn!(
    /// End a rest (alerting live again, stopwatch resumed).
    drowse_monitor_resume,
    resume_session
);
transition_fn!(
    /// Close the session; the JSON carries the event and the driving time.
    drowse_monitor_end,
    end_session
);

/// Snapshot the monitor state as JSON:
/// `{"state", "in_session", "baseline", "buffer_len", "elapsed_secs"}`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `drowse_monitor_new`.
/// - Returns a newly allocated string that must be freed with
///   `drowse_free_string`.
/// - Returns NULL on error; call `drowse_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn drowse_monitor_state(handle: *mut DriveMonitorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    };

    let snapshot = (|| -> Result<serde_json::Value, crate::error::MonitorError> {
        Ok(json!({
            "state": handle.monitor.activity_state()?.as_str(),
            "in_session": handle.monitor.is_in_session()?,
            "baseline": handle.monitor.baseline()?,
            "buffer_len": handle.monitor.buffer_len()?,
            "elapsed_secs": handle.monitor.elapsed()?.as_secs(),
        }))
    })();

    match snapshot {
        Ok(value) => json_to_cstr(&value),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by drowsewatch functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a drowsewatch function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn drowse_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next drowsewatch call on this
///   thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn drowse_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the drowsewatch library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn drowse_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
