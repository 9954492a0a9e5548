#![forbid(unsafe_code)]
//! WASM-friendly bridge for the DocTree core.
//! Operations cross the boundary in their JSON form (`className` discriminator), so the JS side
//! can store and forward them untouched.

use doctree_core::{transform, Document, Marker, Operation, TransformContext};
use serde::Serialize;
use serde_json::Value;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_json(json: &str) -> Result<Value, JsValue> {
    serde_json::from_str(json).map_err(js_err)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(js_err)
}

#[wasm_bindgen]
pub struct WasmDocument {
    inner: Document,
}

#[wasm_bindgen]
impl WasmDocument {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmDocument {
        WasmDocument {
            inner: Document::new(),
        }
    }

    #[wasm_bindgen(js_name = createRoot)]
    pub fn create_root(&mut self, name: String, element_name: String) -> Result<(), JsValue> {
        self.inner
            .create_root(&name, &element_name)
            .map(|_| ())
            .map_err(js_err)
    }

    pub fn version(&self) -> u64 {
        self.inner.version()
    }

    /// Applies one JSON operation and returns the executed operation as JSON.
    #[wasm_bindgen(js_name = applyOperation)]
    pub fn apply_operation(&mut self, op_json: String) -> Result<JsValue, JsValue> {
        let op = self
            .inner
            .operation_from_json(&parse_json(&op_json)?)
            .map_err(js_err)?;
        let executed = self.inner.apply(&op).map_err(js_err)?;
        to_js(&executed.to_json().map_err(js_err)?)
    }

    #[wasm_bindgen(js_name = opsSince)]
    pub fn ops_since(&self, version: u64) -> Result<JsValue, JsValue> {
        let ops = self.inner.history().operations_since(version).map_err(js_err)?;
        to_js(&ops)
    }

    #[wasm_bindgen(js_name = rootToJson)]
    pub fn root_to_json(&self, name: String) -> Result<JsValue, JsValue> {
        to_js(&self.inner.export_root(&name).map_err(js_err)?)
    }

    pub fn markers(&self) -> Result<JsValue, JsValue> {
        let markers: Vec<&Marker> = self.inner.markers().iter().collect();
        to_js(&markers)
    }
}

impl Default for WasmDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebases JSON operation `b` over the applied `a`; returns the list of resulting operations.
#[wasm_bindgen(js_name = transformOperations)]
pub fn transform_operations(a_json: String, b_json: String, a_is_strong: bool) -> Result<JsValue, JsValue> {
    let a = Operation::parse_json(&parse_json(&a_json)?).map_err(js_err)?;
    let b = Operation::parse_json(&parse_json(&b_json)?).map_err(js_err)?;
    let result = transform(&a, &b, TransformContext { a_is_strong });
    to_js(&result)
}
