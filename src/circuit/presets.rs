//! Clinical presets and the model configuration object.
//!
//! [`ModelConfig`] holds the "current" compliance state that a front end
//! mutates between solves. It is an explicit value passed to whoever needs
//! it; the solvers themselves never read it implicitly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::compartment::{CompartmentCompliances, CompartmentOxygenParams, CompartmentParams};
use crate::error::{NorwoodError, Result};

/// Named clinical scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Dehydration or bleeding: all vascular compliances raised
    LowPreload,
    /// Pulmonary hypertension or lung infection: PVR raised
    LungProblem,
    /// Poor contractility: C_d lowered, C_s raised
    HeartFailure,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::LowPreload, Preset::LungProblem, Preset::HeartFailure];

    /// Parse a preset name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "lowpreload" => Some(Self::LowPreload),
            "lungproblem" => Some(Self::LungProblem),
            "heartfailure" => Some(Self::HeartFailure),
            _ => None,
        }
    }

    /// Compartment inputs of the scenario.
    pub fn params(&self) -> CompartmentParams {
        let compliances = match self {
            Preset::LowPreload => CompartmentCompliances {
                c_d: 0.02,
                c_s: 0.01 / 100.0,
                c_sa: 2.0 / 225.0,
                c_pv: 4.0 / 15.0,
                c_pa: 4.0 / 225.0,
            },
            Preset::LungProblem => CompartmentCompliances {
                c_d: 0.02241,
                c_s: 0.00008625,
                c_sa: 0.005115,
                c_pv: 0.2986,
                c_pa: 0.01481,
            },
            Preset::HeartFailure => CompartmentCompliances {
                c_d: 0.016,
                c_s: 0.00008,
                c_sa: 1.0 / 135.0,
                c_pv: 30.0 / 135.0,
                c_pa: 2.0 / 135.0,
            },
        };
        let pvr = match self {
            Preset::LungProblem => 27.0,
            _ => 10.0,
        };
        CompartmentParams {
            uvr: 45.0,
            lvr: 35.0,
            pvr,
            heart_rate: 100.0,
            compliances,
        }
    }

    /// Oxygen inputs of the scenario.
    pub fn oxygen(&self) -> CompartmentOxygenParams {
        CompartmentOxygenParams {
            s_sa: 0.99,
            hemoglobin: 15.0,
            cvo2_upper: 70.0,
            cvo2_lower: 50.0,
        }
    }
}

/// Explicit model configuration: current compliances plus baseline inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hemodynamic inputs, including the current compliances
    pub params: CompartmentParams,
    /// Oxygen inputs
    pub oxygen: CompartmentOxygenParams,
    /// Last preset applied, if any
    #[serde(default)]
    pub preset: Option<Preset>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            params: CompartmentParams::default(),
            oxygen: CompartmentOxygenParams::default(),
            preset: None,
        }
    }
}

impl ModelConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| NorwoodError::FileReadError {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|e| NorwoodError::ConfigParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        log::info!("Loaded model configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.oxygen.validate()
    }

    /// Current compliances.
    pub fn compliances(&self) -> CompartmentCompliances {
        self.params.compliances
    }

    /// Replace the current compliances with those of `preset`.
    ///
    /// Only the compliances change; the preset's resistances, heart rate and
    /// oxygen inputs are returned for the caller to use or ignore.
    pub fn apply_preset(&mut self, preset: Preset) -> (CompartmentParams, CompartmentOxygenParams) {
        let scenario = preset.params();
        self.params.compliances = scenario.compliances;
        self.preset = Some(preset);
        log::debug!("Applied preset {:?}: {:?}", preset, self.params.compliances);
        (scenario, preset.oxygen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for preset in Preset::ALL {
            assert!(preset.params().validate().is_ok(), "{preset:?}");
            assert!(preset.oxygen().validate().is_ok(), "{preset:?}");
        }
    }

    #[test]
    fn test_apply_preset_updates_compliances_only() {
        let mut config = ModelConfig::default();
        let before = config.params;
        let (scenario, oxygen) = config.apply_preset(Preset::LungProblem);

        assert_eq!(config.compliances(), scenario.compliances);
        assert_eq!(config.params.pvr, before.pvr);
        assert_eq!(config.params.heart_rate, before.heart_rate);
        assert_eq!(scenario.pvr, 27.0);
        assert_eq!(oxygen.cvo2_upper, 70.0);
        assert_eq!(config.preset, Some(Preset::LungProblem));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!(Preset::from_str("low-preload"), Some(Preset::LowPreload));
        assert_eq!(Preset::from_str("heartFailure"), Some(Preset::HeartFailure));
        assert_eq!(Preset::from_str("sepsis"), None);
    }

    #[test]
    fn test_config_json_round_trip() {
        let mut config = ModelConfig::default();
        config.apply_preset(Preset::HeartFailure);
        let json = serde_json::to_string(&config).unwrap();
        let decoded: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_missing_config_file() {
        let err = ModelConfig::from_json_file("/nonexistent/norwood.json").unwrap_err();
        assert!(matches!(err, NorwoodError::FileReadError { .. }));
    }
}
