//! Module-wide initialization state behind the JavaScript exports.
//!
//! Every host session shares one [`Bridge`]. Calls that arrive before any
//! explicit initialization create it with defaults; a failed configured
//! initialization is kept until a later configuration succeeds.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::bridge::{BoundaryError, Bridge, BridgeResult};
use crate::config::EngineConfig;

pub type SharedBridge = Rc<RefCell<Bridge>>;

#[derive(Debug, Default)]
pub enum InitState {
    #[default]
    Uninitialized,
    Ready(SharedBridge),
    Failed(BoundaryError),
}

impl InitState {
    /// The shared bridge. Created with defaults only from `Uninitialized`;
    /// in the failed state the recorded error is returned instead.
    pub fn bridge(&mut self) -> BridgeResult<SharedBridge> {
        match self {
            Self::Ready(bridge) => Ok(bridge.clone()),
            Self::Failed(error) => Err(error.clone()),
            Self::Uninitialized => {
                let bridge = Rc::new(RefCell::new(Bridge::default()));
                *self = Self::Ready(bridge.clone());
                Ok(bridge)
            }
        }
    }

    /// Apply `config`, creating the bridge if there is none yet. Clears a
    /// previous failure.
    pub fn initialize_with(&mut self, config: EngineConfig) -> BridgeResult<SharedBridge> {
        if let Self::Ready(bridge) = self {
            bridge.borrow_mut().configure(config)?;
            return Ok(bridge.clone());
        }
        let bridge = Rc::new(RefCell::new(Bridge::new(config)));
        *self = Self::Ready(bridge.clone());
        Ok(bridge)
    }

    /// Parse an [`EngineConfig`] document and apply it. A bad document marks
    /// the module failed unless a bridge is already running.
    pub fn initialize_from_json(&mut self, json: &str) -> BridgeResult<SharedBridge> {
        match EngineConfig::from_json(json) {
            Ok(config) => self.initialize_with(config),
            Err(e) => {
                let error = BoundaryError::from(e);
                if !matches!(self, Self::Ready(_)) {
                    warn!("initialization failed: {error}");
                    *self = Self::Failed(error.clone());
                }
                Err(error)
            }
        }
    }

    /// `"uninitialized"`, `"ready"` or `"failed: <reason>"`.
    pub fn describe(&self) -> String {
        match self {
            Self::Uninitialized => "uninitialized".to_string(),
            Self::Ready(_) => "ready".to_string(),
            Self::Failed(error) => format!("failed: {error}"),
        }
    }
}
