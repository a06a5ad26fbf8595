//! FFI bindings for sleepviz
//!
//! This module provides C-compatible functions for calling sleepviz from a host
//! page or another language. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `sleepviz_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::VizError;
use crate::filter::{AgeOption, FilterEvent};
use crate::pipeline::HeatmapProcessor;
use crate::render::RenderConfig;
use crate::score::{Factor, FactorLevels, ScoreEvent};

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

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Turn a result into an owned C string, recording the error on failure
fn finish(result: Result<String, VizError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Parse an optional JSON array of age option labels; NULL means no filter
unsafe fn parse_selection(selection_json: *const c_char) -> Result<Vec<AgeOption>, VizError> {
    match cstr_to_string(selection_json) {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

unsafe fn processor_for(
    csv: *const c_char,
    selection_json: *const c_char,
) -> Result<HeatmapProcessor, VizError> {
    let csv = cstr_to_string(csv)
        .ok_or_else(|| VizError::ParseError("Invalid CSV string pointer".to_string()))?;
    let selection = parse_selection(selection_json)?;
    let mut processor = HeatmapProcessor::from_csv(&csv)?;
    if !selection.is_empty() {
        processor.apply(FilterEvent::SetSelection(selection));
    }
    Ok(processor)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Render a CSV dataset to a heatmap SVG document.
///
/// # Safety
/// - `csv` must be a valid null-terminated C string.
/// - `selection_json` must be NULL or a null-terminated JSON array of age
///   option labels (e.g. `["20–29","30–39"]`).
/// - Returns a newly allocated string that must be freed with `sleepviz_free_string`.
/// - Returns NULL on error; call `sleepviz_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_heatmap_svg(
    csv: *const c_char,
    selection_json: *const c_char,
) -> *mut c_char {
    clear_last_error();
    finish(processor_for(csv, selection_json).map(|p| p.render_svg()))
}

/// Aggregate a CSV dataset and return the heatmap snapshot as JSON.
///
/// # Safety
/// Same contract as `sleepviz_heatmap_svg`.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_heatmap_json(
    csv: *const c_char,
    selection_json: *const c_char,
) -> *mut c_char {
    clear_last_error();
    finish(processor_for(csv, selection_json).and_then(|p| p.to_json()))
}

/// Score factor levels given as a JSON object and return the score report.
///
/// # Safety
/// - `levels_json` must be NULL (initial levels) or a null-terminated JSON
///   object with `age`, `weekend`, `coffee`, `activity` and `bmi` in 0..=4.
/// - Returns a newly allocated string that must be freed with `sleepviz_free_string`.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_sleep_score_json(levels_json: *const c_char) -> *mut c_char {
    clear_last_error();
    let result = parse_levels(levels_json)
        .and_then(|levels| Ok(serde_json::to_string(&levels.report())?));
    finish(result)
}

/// Advance one factor's level (wrapping 4 -> 0) and return the new levels JSON.
///
/// # Safety
/// - `levels_json` follows the `sleepviz_sleep_score_json` contract.
/// - `factor` must be a null-terminated factor name (`age`, `weekend`, ...).
#[no_mangle]
pub unsafe extern "C" fn sleepviz_sleep_score_cycle(
    levels_json: *const c_char,
    factor: *const c_char,
) -> *mut c_char {
    clear_last_error();
    let result = (|| -> Result<_, VizError> {
        let levels = parse_levels(levels_json)?;
        let factor: Factor = cstr_to_string(factor)
            .ok_or_else(|| VizError::ParseError("Invalid factor string pointer".to_string()))?
            .parse()?;
        Ok(serde_json::to_string(&levels.apply(ScoreEvent::Cycle(factor)))?)
    })();
    finish(result)
}

unsafe fn parse_levels(levels_json: *const c_char) -> Result<FactorLevels, VizError> {
    match cstr_to_string(levels_json) {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(FactorLevels::default()),
    }
}

// ============================================================================
// Stateful API
// ============================================================================

/// Opaque handle to a HeatmapProcessor
pub struct HeatmapProcessorHandle {
    inner: HeatmapProcessor,
}

/// Load a dataset and create a heatmap processor.
///
/// # Safety
/// - `csv` must be a valid null-terminated C string.
/// - `config_json` must be NULL (defaults) or a null-terminated render config JSON.
/// - Returns a pointer that must be freed with `sleepviz_processor_free`.
/// - Returns NULL on load failure; nothing is rendered in that case.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_processor_new(
    csv: *const c_char,
    config_json: *const c_char,
) -> *mut HeatmapProcessorHandle {
    clear_last_error();
    let result = (|| -> Result<_, VizError> {
        let csv = cstr_to_string(csv)
            .ok_or_else(|| VizError::ParseError("Invalid CSV string pointer".to_string()))?;
        let config = match cstr_to_string(config_json) {
            Some(json) => RenderConfig::from_json(&json)?,
            None => RenderConfig::default(),
        };
        let dataset = crate::loader::DatasetLoader::load_csv(&csv)?;
        HeatmapProcessor::with_config(dataset, config)
    })();

    match result {
        Ok(inner) => Box::into_raw(Box::new(HeatmapProcessorHandle { inner })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a heatmap processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sleepviz_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_processor_free(processor: *mut HeatmapProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Replace the age selection and return the re-rendered SVG.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sleepviz_processor_new`.
/// - `selection_json` must be NULL or a null-terminated JSON array of age
///   option labels. NULL or `[]` resets the selection to "All".
/// - Returns a newly allocated string that must be freed with `sleepviz_free_string`.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_processor_select(
    processor: *mut HeatmapProcessorHandle,
    selection_json: *const c_char,
) -> *mut c_char {
    clear_last_error();
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;
    let result = parse_selection(selection_json).map(|selection| {
        let event = if selection.is_empty() {
            FilterEvent::Reset
        } else {
            FilterEvent::SetSelection(selection)
        };
        handle.inner.apply(event);
        handle.inner.render_svg()
    });
    finish(result)
}

/// Return the processor's current snapshot as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sleepviz_processor_new`.
/// - Returns a newly allocated string that must be freed with `sleepviz_free_string`.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_processor_snapshot(
    processor: *const HeatmapProcessorHandle,
) -> *mut c_char {
    clear_last_error();
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    finish((*processor).inner.to_json())
}

/// Free a string returned by sleepviz functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a sleepviz function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next sleepviz call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the sleepviz library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn sleepviz_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> CString {
        CString::new(
            "age_years,sleep_hours_weekly_avg,caffeine_mg_day1,told_doctor_trouble_sleeping\n\
             25,6,50,1\n\
             33,8,50,2\n\
             45,10,250,1\n",
        )
        .unwrap()
    }

    unsafe fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        sleepviz_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_heatmap_svg() {
        let csv = sample_csv();
        unsafe {
            let svg = take(sleepviz_heatmap_svg(csv.as_ptr(), ptr::null()));
            assert!(svg.starts_with("<svg"));
            assert_eq!(svg.matches(r#"class="cell""#).count(), 12);
        }
    }

    #[test]
    fn test_ffi_heatmap_json_with_selection() {
        let csv = sample_csv();
        let selection = CString::new(r#"["30–39"]"#).unwrap();
        unsafe {
            let json = take(sleepviz_heatmap_json(csv.as_ptr(), selection.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            let total: u64 = value["cells"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| c["n"].as_u64().unwrap())
                .sum();
            assert_eq!(total, 1);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let csv = sample_csv();
        unsafe {
            let processor = sleepviz_processor_new(csv.as_ptr(), ptr::null());
            assert!(!processor.is_null());

            let selection = CString::new(r#"["20–29","40–50"]"#).unwrap();
            let svg = take(sleepviz_processor_select(processor, selection.as_ptr()));
            assert!(svg.contains(">n=1</text>"));

            let snapshot = take(sleepviz_processor_snapshot(processor));
            let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
            assert_eq!(value["selection"], serde_json::json!(["20–29", "40–50"]));

            sleepviz_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_sleep_score() {
        unsafe {
            let json = take(sleepviz_sleep_score_json(ptr::null()));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["quality"], 61);
            assert_eq!(value["advice"]["tier"], "okay");

            let levels = CString::new(r#"{"age":1,"weekend":0,"coffee":4,"activity":2,"bmi":0}"#).unwrap();
            let factor = CString::new("coffee").unwrap();
            let next = take(sleepviz_sleep_score_cycle(levels.as_ptr(), factor.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&next).unwrap();
            assert_eq!(value["coffee"], 0);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let bad_csv = CString::new("age_years\n30\n").unwrap();
        unsafe {
            let processor = sleepviz_processor_new(bad_csv.as_ptr(), ptr::null());
            assert!(processor.is_null());

            let error = sleepviz_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("Missing required column"));

            let levels = CString::new(r#"{"age":7,"weekend":0,"coffee":0,"activity":0,"bmi":0}"#).unwrap();
            assert!(sleepviz_sleep_score_json(levels.as_ptr()).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = sleepviz_version();
            assert!(!version.is_null());
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
