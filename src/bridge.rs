//! Host-facing query surface.
//!
//! [`Bridge`] owns the virtual filesystem, every loaded chain, its joint state
//! and its cached poses, and speaks in handles, names and flat `f64` arrays so
//! that a JavaScript host never needs to see a Rust type. Errors leave as
//! [`BoundaryError`], a kind tag plus a message.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::kinematics::{JointState, KinematicsSolver, PoseSet};
use crate::math::Transform;
use crate::model::{ChainLoader, KinematicChain};
use crate::proximity::{ProximityEngine, ProximityResult};
use crate::vfs::VirtualFs;

/// Fixed-width encoding to and from flat `f64` arrays.
pub trait FlatCodec: Sized {
    /// Number of floats per value.
    const WIDTH: usize;

    fn encode(&self, out: &mut Vec<f64>);

    /// Decode exactly [`Self::WIDTH`] floats.
    fn decode(values: &[f64]) -> Result<Self>;
}

pub fn encode_all<T: FlatCodec>(items: &[T]) -> Vec<f64> {
    let mut out = Vec::with_capacity(items.len() * T::WIDTH);
    for item in items {
        item.encode(&mut out);
    }
    out
}

pub fn decode_all<T: FlatCodec>(values: &[f64]) -> Result<Vec<T>> {
    if values.len() % T::WIDTH != 0 {
        return Err(Error::boundary(format!(
            "array of {} floats is not a multiple of {}",
            values.len(),
            T::WIDTH
        )));
    }
    values.chunks_exact(T::WIDTH).map(T::decode).collect()
}

fn check_width(values: &[f64], width: usize, what: &str) -> Result<()> {
    if values.len() != width {
        return Err(Error::boundary(format!(
            "{what} needs {width} floats, got {}",
            values.len()
        )));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::boundary(format!("{what} contains non-finite value {bad}")));
    }
    Ok(())
}

/// `[tx, ty, tz, qx, qy, qz, qw]`
impl FlatCodec for Transform {
    const WIDTH: usize = 7;

    fn encode(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&self.to_array());
    }

    fn decode(values: &[f64]) -> Result<Self> {
        check_width(values, Self::WIDTH, "transform")?;
        let mut array = [0.0; 7];
        array.copy_from_slice(values);
        let mut t = Transform::from_array(array);
        let len = t.rotation.length();
        if len <= f64::EPSILON {
            return Err(Error::boundary("transform quaternion has zero length"));
        }
        t.rotation = t.rotation / len;
        Ok(t)
    }
}

/// One proximity result as it crosses the boundary:
/// `[chain_a, link_a, chain_b, link_b, distance, colliding]`, with
/// `colliding` as `0.0` or `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityRecord {
    pub chain_a: u32,
    pub link_a: u32,
    pub chain_b: u32,
    pub link_b: u32,
    pub distance: f64,
    pub colliding: bool,
}

impl From<&ProximityResult> for ProximityRecord {
    fn from(r: &ProximityResult) -> Self {
        Self {
            chain_a: r.link_a.chain.get(),
            link_a: r.link_a.link as u32,
            chain_b: r.link_b.chain.get(),
            link_b: r.link_b.link as u32,
            distance: r.distance,
            colliding: r.colliding,
        }
    }
}

fn decode_index(value: f64, what: &str) -> Result<u32> {
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(Error::boundary(format!("{what} is not an index: {value}")));
    }
    Ok(value as u32)
}

impl FlatCodec for ProximityRecord {
    const WIDTH: usize = 6;

    fn encode(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&[
            self.chain_a as f64,
            self.link_a as f64,
            self.chain_b as f64,
            self.link_b as f64,
            self.distance,
            if self.colliding { 1.0 } else { 0.0 },
        ]);
    }

    fn decode(values: &[f64]) -> Result<Self> {
        check_width(values, Self::WIDTH, "proximity record")?;
        let colliding = match values[5] {
            v if v == 0.0 => false,
            v if v == 1.0 => true,
            v => {
                return Err(Error::boundary(format!(
                    "colliding flag must be 0 or 1, got {v}"
                )))
            }
        };
        Ok(Self {
            chain_a: decode_index(values[0], "chain_a")?,
            link_a: decode_index(values[1], "link_a")?,
            chain_b: decode_index(values[2], "chain_b")?,
            link_b: decode_index(values[3], "link_b")?,
            distance: values[4],
            colliding,
        })
    }
}

/// Error as seen by the host: a stable kind tag and a readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct BoundaryError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<Error> for BoundaryError {
    fn from(e: Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

pub type BridgeResult<T> = std::result::Result<T, BoundaryError>;

/// `{"ok": value}` or `{"error": kind, "message": text}`.
pub fn to_tagged_json<T: Serialize>(result: &BridgeResult<T>) -> String {
    let value = match result {
        Ok(v) => serde_json::json!({ "ok": v }),
        Err(e) => serde_json::json!({ "error": e.kind, "message": e.message }),
    };
    value.to_string()
}

/// Opaque reference to a chain loaded into a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainHandle(u32);

impl ChainHandle {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct LoadedChain {
    chain: KinematicChain,
    state: Option<JointState>,
    poses: Option<PoseSet>,
}

impl LoadedChain {
    fn poses(&self) -> Result<&PoseSet> {
        self.poses.as_ref().ok_or_else(|| Error::NotResolved {
            chain: self.chain.name().to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct Bridge {
    config: EngineConfig,
    vfs: VirtualFs,
    solver: KinematicsSolver,
    proximity: ProximityEngine,
    chains: BTreeMap<ChainHandle, LoadedChain>,
}

impl Bridge {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            vfs: VirtualFs::new(),
            solver: KinematicsSolver::new(config.kinematics),
            proximity: ProximityEngine::new(config.proximity),
            chains: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vfs(&self) -> &VirtualFs {
        &self.vfs
    }

    pub fn inject_file(&self, path: &str, content: impl Into<Arc<[u8]>>) {
        self.vfs.inject(path, content);
    }

    /// Replace the configuration and re-resolve every chain that has a joint
    /// state under the new settings.
    pub fn configure(&mut self, config: EngineConfig) -> BridgeResult<()> {
        config.validate()?;
        self.config = config;
        self.solver = KinematicsSolver::new(config.kinematics);
        self.proximity = ProximityEngine::new(config.proximity);

        for loaded in self.chains.values_mut() {
            let Some(state) = &loaded.state else {
                continue;
            };
            match self.solver.resolve(&loaded.chain, state) {
                Ok(poses) => loaded.poses = Some(poses),
                Err(e) => {
                    warn!(
                        "chain '{}' no longer resolves under the new configuration: {}",
                        loaded.chain.name(),
                        e
                    );
                    loaded.state = None;
                    loaded.poses = None;
                }
            }
        }
        Ok(())
    }

    /// Load an [`EngineConfig`] JSON file from the VFS and apply it.
    pub fn configure_from_file(&mut self, path: &str) -> BridgeResult<()> {
        let text = self.vfs.read_to_string(path)?;
        self.configure(EngineConfig::from_json(&text)?)
    }

    pub fn load_chain(&mut self, path: &str) -> BridgeResult<ChainHandle> {
        let chain = ChainLoader::new(&self.vfs).load(path)?;
        let handle = ChainHandle(chain.id().get());
        info!("chain '{}' registered as handle {}", chain.name(), handle.0);
        self.chains.insert(
            handle,
            LoadedChain {
                chain,
                state: None,
                poses: None,
            },
        );
        Ok(handle)
    }

    pub fn unload_chain(&mut self, handle: ChainHandle) -> BridgeResult<()> {
        self.chains
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| unknown(handle).into())
    }

    pub fn handles(&self) -> Vec<ChainHandle> {
        self.chains.keys().copied().collect()
    }

    pub fn chain(&self, handle: ChainHandle) -> BridgeResult<&KinematicChain> {
        Ok(&self.loaded(handle)?.chain)
    }

    /// Set joint values by name and resolve the chain's poses right away.
    ///
    /// On failure the previous poses are dropped, so queries report
    /// `NotResolved` instead of answering from a stale snapshot.
    pub fn set_joint_state<S: AsRef<str>>(
        &mut self,
        handle: ChainHandle,
        names: &[S],
        values: &[f64],
    ) -> BridgeResult<()> {
        let state = JointState::from_pairs(names, values)?;
        self.apply_state(handle, state)
    }

    /// Set joint values in DOF order (see [`Bridge::dof_names`]).
    pub fn set_joint_positions(&mut self, handle: ChainHandle, values: &[f64]) -> BridgeResult<()> {
        let state = JointState::from_dofs(&self.loaded(handle)?.chain, values)?;
        self.apply_state(handle, state)
    }

    fn apply_state(&mut self, handle: ChainHandle, state: JointState) -> BridgeResult<()> {
        let loaded = self
            .chains
            .get_mut(&handle)
            .ok_or_else(|| unknown(handle))?;
        match self.solver.resolve(&loaded.chain, &state) {
            Ok(poses) => {
                loaded.state = Some(state);
                loaded.poses = Some(poses);
                Ok(())
            }
            Err(e) => {
                loaded.state = None;
                loaded.poses = None;
                Err(e.into())
            }
        }
    }

    pub fn poses(&self, handle: ChainHandle) -> BridgeResult<&PoseSet> {
        Ok(self.loaded(handle)?.poses()?)
    }

    /// Seven floats per link, in link order.
    pub fn get_poses(&self, handle: ChainHandle) -> BridgeResult<Vec<f64>> {
        Ok(encode_all(self.poses(handle)?.as_slice()))
    }

    pub fn link_names(&self, handle: ChainHandle) -> BridgeResult<Vec<String>> {
        Ok(self.chain(handle)?.link_names().map(String::from).collect())
    }

    pub fn joint_names(&self, handle: ChainHandle) -> BridgeResult<Vec<String>> {
        Ok(self.chain(handle)?.joint_names().map(String::from).collect())
    }

    pub fn dof_names(&self, handle: ChainHandle) -> BridgeResult<Vec<String>> {
        Ok(self.chain(handle)?.dof_names().map(String::from).collect())
    }

    /// Pairs within `a`, or between `a` and `b` when `b` names another chain.
    pub fn proximity(
        &self,
        a: ChainHandle,
        b: Option<ChainHandle>,
    ) -> BridgeResult<Vec<ProximityResult>> {
        let first = self.loaded(a)?;
        let poses_a = first.poses()?;
        let results = match b {
            Some(b) if b != a => {
                let second = self.loaded(b)?;
                self.proximity
                    .check_pair(&first.chain, poses_a, &second.chain, second.poses()?)?
            }
            _ => self.proximity.check_chain(&first.chain, poses_a)?,
        };
        Ok(results)
    }

    /// [`Bridge::proximity`] as six floats per record.
    pub fn check_proximity(
        &self,
        a: ChainHandle,
        b: Option<ChainHandle>,
    ) -> BridgeResult<Vec<f64>> {
        let records: Vec<ProximityRecord> =
            self.proximity(a, b)?.iter().map(ProximityRecord::from).collect();
        Ok(encode_all(&records))
    }

    /// Whether any pair within or across the given chains collides.
    pub fn in_collision(&self, handles: &[ChainHandle]) -> BridgeResult<bool> {
        let mut entries = Vec::with_capacity(handles.len());
        for &handle in handles {
            let loaded = self.loaded(handle)?;
            entries.push((&loaded.chain, loaded.poses()?));
        }
        Ok(self.proximity.in_collision(&entries)?)
    }

    fn loaded(&self, handle: ChainHandle) -> Result<&LoadedChain> {
        self.chains.get(&handle).ok_or_else(|| unknown(handle))
    }
}

fn unknown(handle: ChainHandle) -> Error {
    Error::UnknownHandle { handle: handle.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_SPHERES: &str = r#"{
        "name": "pair",
        "links": [
            { "name": "a", "collision": [ { "shape": { "type": "sphere", "radius": 0.5 } } ] },
            { "name": "b", "collision": [ { "shape": { "type": "sphere", "radius": 0.5 } } ] }
        ],
        "joints": [ { "name": "slide", "type": "prismatic", "parent": "a", "child": "b",
                      "axis": [1, 0, 0], "limits": { "lower": 0, "upper": 10 } } ]
    }"#;

    fn bridge_with_pair() -> (Bridge, ChainHandle) {
        let config = EngineConfig::default()
            .with_adjacency(crate::proximity::AdjacencyPolicy::IncludeAdjacent);
        let mut bridge = Bridge::new(config);
        bridge.inject_file("pair.json", TWO_SPHERES.as_bytes().to_vec());
        let handle = bridge.load_chain("pair.json").unwrap();
        (bridge, handle)
    }

    #[test]
    fn test_transform_codec() {
        let t = Transform::from_xyz_rpy([1.0, 2.0, 3.0], [0.1, 0.2, 0.3]);
        let flat = encode_all(&[t]);
        assert_eq!(flat.len(), 7);
        let back: Vec<Transform> = decode_all(&flat).unwrap();
        assert!(back[0].abs_diff_eq(&t, 1e-12));

        assert!(Transform::decode(&[0.0; 6]).is_err());
        assert!(Transform::decode(&[0.0; 7]).is_err());
        assert!(decode_all::<Transform>(&[0.0; 8]).is_err());
    }

    #[test]
    fn test_record_codec_rejects_bad_flags() {
        let record = ProximityRecord {
            chain_a: 3,
            link_a: 0,
            chain_b: 3,
            link_b: 1,
            distance: -0.2,
            colliding: true,
        };
        let flat = encode_all(&[record]);
        assert_eq!(flat, [3.0, 0.0, 3.0, 1.0, -0.2, 1.0]);
        assert_eq!(ProximityRecord::decode(&flat).unwrap(), record);
        assert!(ProximityRecord::decode(&[3.0, 0.5, 3.0, 1.0, -0.2, 1.0]).is_err());
        assert!(ProximityRecord::decode(&[3.0, 0.0, 3.0, 1.0, -0.2, 0.5]).is_err());
    }

    #[test]
    fn test_poses_require_joint_state() {
        let (mut bridge, handle) = bridge_with_pair();
        let err = bridge.get_poses(handle).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotResolved);

        bridge.set_joint_state(handle, &["slide"], &[3.0]).unwrap();
        let flat = bridge.get_poses(handle).unwrap();
        assert_eq!(flat.len(), 14);
        assert_relative_eq!(flat[7], 3.0, epsilon = 1e-12);
        assert_relative_eq!(flat[13], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_failed_update_drops_cache() {
        let (mut bridge, handle) = bridge_with_pair();
        bridge.set_joint_positions(handle, &[3.0]).unwrap();
        let err = bridge.set_joint_state(handle, &["other"], &[1.0]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingJoint);
        assert_eq!(
            bridge.check_proximity(handle, None).unwrap_err().kind,
            ErrorKind::NotResolved
        );
    }

    #[test]
    fn test_length_mismatch() {
        let (mut bridge, handle) = bridge_with_pair();
        let err = bridge.set_joint_state(handle, &["slide"], &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BoundaryValidation);
        let err = bridge.set_joint_positions(handle, &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BoundaryValidation);
    }

    #[test]
    fn test_check_proximity_records() {
        let (mut bridge, handle) = bridge_with_pair();
        bridge.set_joint_positions(handle, &[0.8]).unwrap();
        let flat = bridge.check_proximity(handle, None).unwrap();
        let records: Vec<ProximityRecord> = decode_all(&flat).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chain_a, handle.raw());
        assert_eq!((records[0].link_a, records[0].link_b), (0, 1));
        assert_relative_eq!(records[0].distance, -0.2, epsilon = 1e-12);
        assert!(records[0].colliding);
        assert!(bridge.in_collision(&[handle]).unwrap());
    }

    #[test]
    fn test_unknown_handle_and_names() {
        let (bridge, handle) = bridge_with_pair();
        assert_eq!(bridge.link_names(handle).unwrap(), ["a", "b"]);
        assert_eq!(bridge.dof_names(handle).unwrap(), ["slide"]);
        let err = bridge.joint_names(ChainHandle::from_raw(u32::MAX)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownHandle);
    }

    #[test]
    fn test_configure_from_file_reresolves() {
        let (mut bridge, handle) = bridge_with_pair();
        bridge.set_joint_positions(handle, &[20.0]).unwrap();
        assert_relative_eq!(bridge.get_poses(handle).unwrap()[7], 10.0);

        bridge.inject_file(
            "engine.json",
            br#"{ "kinematics": { "limit_policy": "reject" } }"#.to_vec(),
        );
        bridge.configure_from_file("engine.json").unwrap();
        assert_eq!(
            bridge.get_poses(handle).unwrap_err().kind,
            ErrorKind::NotResolved
        );

        let err = bridge.set_joint_positions(handle, &[20.0]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfLimits);
    }

    #[test]
    fn test_tagged_json() {
        let ok: BridgeResult<Vec<f64>> = Ok(vec![1.0]);
        assert_eq!(to_tagged_json(&ok), r#"{"ok":[1.0]}"#);
        let err: BridgeResult<()> = Err(Error::NotFound { path: "x".into() }.into());
        let json: serde_json::Value = serde_json::from_str(&to_tagged_json(&err)).unwrap();
        assert_eq!(json["error"], "NotFound");
        assert!(json["message"].as_str().unwrap().contains('x'));
    }
}
