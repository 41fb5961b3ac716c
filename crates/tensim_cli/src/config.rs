use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tensim_core::ballistics::{BallisticParams, STATE_LEN};
use tensim_core::binary::MatrixLayout;
use tensim_core::diffusion::DiffusionParams;

/// Environment variable naming an optional JSON file that overrides the
/// scenario defaults.
pub const CONFIG_ENV: &str = "TENSIM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallisticScenario {
    /// `(x, y, vx, vy)` before the first step.
    pub initial_state: [f32; STATE_LEN],
    pub dt: f32,
    pub steps: usize,
    pub params: BallisticParams,
    pub output: PathBuf,
    #[serde(default)]
    pub layout: MatrixLayout,
}

impl BallisticScenario {
    pub fn linear_euler() -> Self {
        Self {
            initial_state: [0.0, 0.0, 10.0, 10.0],
            dt: 50e-3,
            steps: 500,
            params: BallisticParams {
                gravity: 9.81,
                drag_per_mass: 0.02,
            },
            output: PathBuf::from("forwardEuler.bin"),
            layout: MatrixLayout::RankTwo,
        }
    }

    pub fn euler() -> Self {
        Self {
            steps: 50,
            output: PathBuf::from("forwardEulerBetter.bin"),
            ..Self::linear_euler()
        }
    }

    pub fn rk4() -> Self {
        Self {
            output: PathBuf::from("RK4.bin"),
            ..Self::euler()
        }
    }

    /// Constant update matrix: no drag, gravity only.
    pub fn free_flight() -> Self {
        Self {
            initial_state: [0.0, 0.0, 1.0, 1.0],
            dt: 0.5e-3,
            steps: 500,
            params: BallisticParams {
                gravity: 9.81,
                drag_per_mass: 0.0,
            },
            output: PathBuf::from("forwardEulerResults.bin"),
            layout: MatrixLayout::RankTwo,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            bail!("steps must be at least 1.");
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            bail!("Step size dt must be positive.");
        }
        if self.initial_state.iter().any(|v| !v.is_finite()) {
            bail!("Initial state must be finite.");
        }
        self.params.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffusionScenario {
    pub num_points: usize,
    pub steps: usize,
    /// Injected carrier concentration at the left pin.
    pub injection_level: f32,
    pub params: DiffusionParams,
    pub output: PathBuf,
}

impl Default for DiffusionScenario {
    fn default() -> Self {
        Self {
            num_points: 50,
            steps: 50,
            injection_level: 10e4,
            params: DiffusionParams::default(),
            output: PathBuf::from("mcd.bin"),
        }
    }
}

impl DiffusionScenario {
    pub fn validate(&self) -> Result<()> {
        if self.num_points < 3 {
            bail!("num_points must be at least 3 (two pinned boundaries and one interior point).");
        }
        if self.steps == 0 {
            bail!("steps must be at least 1.");
        }
        if !self.injection_level.is_finite() {
            bail!("injection_level must be finite.");
        }
        self.params.validate()?;
        Ok(())
    }
}

/// Recursively overlays `overrides` onto `base`; objects merge key by key,
/// anything else replaces.
fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        log::warn!("Config Unknown field '{}' ignored", key);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Applies a partial JSON document over `defaults`.
pub fn apply_overrides<T>(defaults: T, json: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let overrides: Value = serde_json::from_str(json).context("Config is not valid JSON")?;
    let mut merged = serde_json::to_value(defaults)?;
    merge(&mut merged, overrides);
    serde_json::from_value(merged).context("Config has a field of the wrong type")
}

pub fn load_config_file<T, P>(defaults: T, path: P) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    P: AsRef<Path>,
{
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    apply_overrides(defaults, &content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))
}

/// Returns `defaults`, overridden by the file named in `TENSIM_CONFIG` when set.
pub fn load_config<T>(defaults: T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            log::info!("Loading config from {}", Path::new(&path).display());
            load_config_file(defaults, path)
        }
        None => Ok(defaults),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_defaults_are_valid() {
        for scenario in [
            BallisticScenario::linear_euler(),
            BallisticScenario::euler(),
            BallisticScenario::rk4(),
            BallisticScenario::free_flight(),
        ] {
            scenario.validate().expect("default scenario should validate");
        }
        DiffusionScenario::default()
            .validate()
            .expect("default scenario should validate");
        assert_eq!(BallisticScenario::rk4().steps, 50);
        assert_eq!(BallisticScenario::rk4().output, PathBuf::from("RK4.bin"));
        assert_eq!(BallisticScenario::free_flight().dt, 0.5e-3);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = apply_overrides(
            BallisticScenario::rk4(),
            r#"{ "steps": 10, "params": { "drag_per_mass": 0.0 }, "layout": "legacy_rank_one" }"#,
        )
        .expect("config should parse");
        assert_eq!(config.steps, 10);
        assert_eq!(config.params.drag_per_mass, 0.0);
        assert_eq!(config.params.gravity, 9.81);
        assert_eq!(config.dt, 50e-3);
        assert_eq!(config.layout, MatrixLayout::LegacyRankOne);
    }

    #[test]
    fn override_with_wrong_type_is_rejected() {
        let result = apply_overrides(DiffusionScenario::default(), r#"{ "steps": "many" }"#);
        assert!(result.is_err());
        let result = apply_overrides(DiffusionScenario::default(), "not json");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config = apply_overrides(DiffusionScenario::default(), r#"{ "grid_size": 3 }"#)
            .expect("config should parse");
        assert_eq!(config, DiffusionScenario::default());
    }

    #[test]
    fn validation_rejects_degenerate_runs() {
        let mut scenario = BallisticScenario::euler();
        scenario.dt = 0.0;
        assert!(scenario.validate().is_err());

        let mut scenario = DiffusionScenario::default();
        scenario.num_points = 2;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let path = std::env::temp_dir().join(format!("tensim-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "num_points": 8 }"#).expect("write config");
        let config =
            load_config_file(DiffusionScenario::default(), &path).expect("config should load");
        assert_eq!(config.num_points, 8);
        fs::remove_file(&path).expect("cleanup");

        assert!(load_config_file(DiffusionScenario::default(), &path).is_err());
    }
}
