//! WASM exports for the annotation frontend.
//!
//! Data crosses the boundary as JSON strings. Errors are returned as their
//! display string so the frontend can surface them directly.

use wasm_bindgen::prelude::*;

use crate::engine;

fn to_js(err: crate::AnnotateError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Runs once when the module is instantiated.
///
/// Only the panic hook is installed here. Log records go through the `log`
/// facade and reach the console once the host installs a logger.
#[wasm_bindgen(start)]
pub fn init() {
    crate::set_panic_hook();
}

/// Pre-annotate a file's method results.
///
/// `config` may be an empty string to use the defaults.
#[wasm_bindgen]
pub fn pre_annotate(methods: &str, config: &str) -> Result<String, JsValue> {
    engine::pre_annotate_json(methods, config).map_err(to_js)
}

/// Merge the resolved areas into the annotated trajectory.
#[wasm_bindgen]
pub fn merge_annotation(areas: &str, resolutions: &str) -> Result<String, JsValue> {
    engine::merge_annotation_json(areas, resolutions).map_err(to_js)
}

/// Per-method analysis for a resolved annotation.
#[wasm_bindgen]
pub fn analyze_annotation(
    methods: &str,
    areas: &str,
    resolutions: &str,
) -> Result<String, JsValue> {
    engine::analyze_annotation_json(methods, areas, resolutions).map_err(to_js)
}
