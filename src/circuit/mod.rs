//! Circuit parameter sets, solution vectors and validation.
//!
//! This module provides the value types every solver consumes and produces.
//! They are plain `Copy` data, constructed per call and owned by the caller.

mod compartment;
mod presets;
mod types;
mod validate;

pub use compartment::{
    CompartmentCompliances, CompartmentFlows, CompartmentOxygenParams, CompartmentParams,
    CompartmentSaturations, DrugEffect, ResistanceMultipliers, CLINICAL_PVR_SCALE,
    CLINICAL_SVR_SCALE,
};
pub use presets::{ModelConfig, Preset};
pub use types::*;
pub use validate::{
    require_all_positive, require_finite, require_fraction, require_non_negative,
    require_positive, require_time_grid,
};
