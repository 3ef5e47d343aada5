use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kinematics::{KinematicsConfig, LimitPolicy};
use crate::proximity::{AdjacencyPolicy, GjkSettings, ProximityConfig};

/// Settings for every engine the bridge owns.
///
/// Missing fields take their defaults, so `{}` is a valid configuration:
///
/// ```json
/// { "kinematics": { "limit_policy": "reject" },
///   "proximity": { "adjacency": "include_adjacent", "cutoff": 0.5 } }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub kinematics: KinematicsConfig,
    pub proximity: ProximityConfig,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::parse(format!("invalid engine configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn with_kinematics(mut self, kinematics: KinematicsConfig) -> Self {
        self.kinematics = kinematics;
        self
    }

    pub fn with_proximity(mut self, proximity: ProximityConfig) -> Self {
        self.proximity = proximity;
        self
    }

    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.kinematics.limit_policy = policy;
        self
    }

    pub fn with_adjacency(mut self, adjacency: AdjacencyPolicy) -> Self {
        self.proximity.adjacency = adjacency;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.proximity.cutoff = Some(cutoff);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(cutoff) = self.proximity.cutoff {
            if !cutoff.is_finite() || cutoff < 0.0 {
                return Err(Error::parse(format!(
                    "proximity cutoff must be finite and non-negative, got {cutoff}"
                )));
            }
        }
        let GjkSettings {
            max_iterations,
            tolerance,
            epa_max_iterations,
            epa_tolerance,
        } = self.proximity.gjk;
        if max_iterations == 0 || epa_max_iterations == 0 {
            return Err(Error::parse("GJK/EPA iteration limits must be positive"));
        }
        if !(tolerance > 0.0 && epa_tolerance > 0.0) {
            return Err(Error::parse("GJK/EPA tolerances must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json(
            r#"{ "kinematics": { "limit_policy": "reject" },
                 "proximity": { "adjacency": "include_adjacent", "cutoff": 0.5,
                                "gjk": { "max_iterations": 10 } } }"#,
        )
        .unwrap();
        assert_eq!(config.kinematics.limit_policy, LimitPolicy::Reject);
        assert_eq!(config.proximity.adjacency, AdjacencyPolicy::IncludeAdjacent);
        assert_eq!(config.proximity.cutoff, Some(0.5));
        assert_eq!(config.proximity.gjk.max_iterations, 10);
        assert_eq!(
            config.proximity.gjk.epa_tolerance,
            GjkSettings::default().epa_tolerance
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(EngineConfig::from_json(r#"{ "proximity": { "cutoff": -1 } }"#).is_err());
        assert!(
            EngineConfig::from_json(r#"{ "kinematics": { "limit_policy": "wrap" } }"#).is_err()
        );
        assert!(EngineConfig::from_json(r#"{ "unknown": 1 }"#).is_err());
    }

    #[test]
    fn test_builder_round_trip() {
        let config = EngineConfig::default()
            .with_limit_policy(LimitPolicy::Reject)
            .with_cutoff(0.25);
        assert_eq!(EngineConfig::from_json(&config.to_json()).unwrap(), config);
    }
}
