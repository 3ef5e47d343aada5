//! WASM entry point - exports the bridge to JavaScript

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use crate::bridge::{BoundaryError, BridgeResult, ChainHandle};
use crate::host::{InitState, SharedBridge};

thread_local! {
    static STATE: RefCell<InitState> = const { RefCell::new(InitState::Uninitialized) };
}

fn to_js(error: BoundaryError) -> JsValue {
    let js = js_sys::Error::new(&error.message);
    js.set_name(error.kind.as_str());
    js.into()
}

fn js_result<T>(result: BridgeResult<T>) -> Result<T, JsValue> {
    result.map_err(to_js)
}

fn shared() -> Result<SharedBridge, JsValue> {
    js_result(STATE.with(|state| state.borrow_mut().bridge()))
}

/// Handle on the module-wide engine state. Every session shares it.
#[wasm_bindgen]
pub struct Session {
    bridge: SharedBridge,
}

/// Idempotent: returns a session over the same state on every call. Throws
/// the recorded error if a configured initialization failed.
#[wasm_bindgen]
pub fn initialize() -> Result<Session, JsValue> {
    Ok(Session { bridge: shared()? })
}

/// Like [`initialize`], applying an `EngineConfig` JSON document.
#[wasm_bindgen(js_name = initializeWithConfig)]
pub fn initialize_with_config(config_json: &str) -> Result<Session, JsValue> {
    let bridge = STATE.with(|state| state.borrow_mut().initialize_from_json(config_json));
    Ok(Session {
        bridge: js_result(bridge)?,
    })
}

/// `"uninitialized"`, `"ready"` or `"failed: <reason>"`.
#[wasm_bindgen(js_name = initializationState)]
pub fn initialization_state() -> String {
    STATE.with(|state| state.borrow().describe())
}

/// Store a file in the virtual filesystem.
#[wasm_bindgen(js_name = injectFile)]
pub fn inject_file(path: &str, bytes: &[u8]) -> Result<(), JsValue> {
    shared()?.borrow().inject_file(path, bytes.to_vec());
    Ok(())
}

#[wasm_bindgen]
impl Session {
    #[wasm_bindgen(js_name = injectFile)]
    pub fn inject_file(&self, path: &str, bytes: &[u8]) {
        self.bridge.borrow().inject_file(path, bytes.to_vec());
    }

    #[wasm_bindgen(js_name = configureFromFile)]
    pub fn configure_from_file(&self, path: &str) -> Result<(), JsValue> {
        js_result(self.bridge.borrow_mut().configure_from_file(path))
    }

    #[wasm_bindgen(js_name = loadChain)]
    pub fn load_chain(&self, path: &str) -> Result<u32, JsValue> {
        js_result(self.bridge.borrow_mut().load_chain(path)).map(ChainHandle::raw)
    }

    #[wasm_bindgen(js_name = unloadChain)]
    pub fn unload_chain(&self, handle: u32) -> Result<(), JsValue> {
        js_result(
            self.bridge
                .borrow_mut()
                .unload_chain(ChainHandle::from_raw(handle)),
        )
    }

    #[wasm_bindgen(js_name = setJointState)]
    pub fn set_joint_state(
        &self,
        handle: u32,
        names: Vec<String>,
        values: &[f64],
    ) -> Result<(), JsValue> {
        js_result(self.bridge.borrow_mut().set_joint_state(
            ChainHandle::from_raw(handle),
            &names,
            values,
        ))
    }

    #[wasm_bindgen(js_name = setJointPositions)]
    pub fn set_joint_positions(&self, handle: u32, values: &[f64]) -> Result<(), JsValue> {
        js_result(
            self.bridge
                .borrow_mut()
                .set_joint_positions(ChainHandle::from_raw(handle), values),
        )
    }

    /// Seven floats per link: `[tx, ty, tz, qx, qy, qz, qw]`.
    #[wasm_bindgen(js_name = getPoses)]
    pub fn get_poses(&self, handle: u32) -> Result<Vec<f64>, JsValue> {
        js_result(self.bridge.borrow().get_poses(ChainHandle::from_raw(handle)))
    }

    #[wasm_bindgen(js_name = linkNames)]
    pub fn link_names(&self, handle: u32) -> Result<Vec<String>, JsValue> {
        js_result(self.bridge.borrow().link_names(ChainHandle::from_raw(handle)))
    }

    #[wasm_bindgen(js_name = jointNames)]
    pub fn joint_names(&self, handle: u32) -> Result<Vec<String>, JsValue> {
        js_result(self.bridge.borrow().joint_names(ChainHandle::from_raw(handle)))
    }

    #[wasm_bindgen(js_name = dofNames)]
    pub fn dof_names(&self, handle: u32) -> Result<Vec<String>, JsValue> {
        js_result(self.bridge.borrow().dof_names(ChainHandle::from_raw(handle)))
    }

    /// Six floats per record:
    /// `[chain_a, link_a, chain_b, link_b, distance, colliding]`.
    #[wasm_bindgen(js_name = checkProximity)]
    pub fn check_proximity(&self, a: u32, b: Option<u32>) -> Result<Vec<f64>, JsValue> {
        js_result(self.bridge.borrow().check_proximity(
            ChainHandle::from_raw(a),
            b.map(ChainHandle::from_raw),
        ))
    }

    #[wasm_bindgen(js_name = inCollision)]
    pub fn in_collision(&self, handles: Vec<u32>) -> Result<bool, JsValue> {
        let handles: Vec<ChainHandle> = handles.into_iter().map(ChainHandle::from_raw).collect();
        js_result(self.bridge.borrow().in_collision(&handles))
    }
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    // Fails only if a logger is already installed.
    console_log::init_with_level(log::Level::Warn).ok();
}
