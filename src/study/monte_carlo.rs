//! Monte Carlo study of patient variability and drug response.
//!
//! Each realization draws UVR, LVR, PVR and HR from Gamma distributions
//! centred on the baseline, then (when a drug is applied) a systemic and a
//! pulmonary resistance multiplier centred on the drug's nominal effect.
//! The compartment model is solved for every realization.
//!
//! A Gamma with mean μ and standard deviation σ has
//! shape = μ²/σ² and scale = σ²/μ.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};

use crate::circuit::{
    require_positive, CompartmentOxygenParams, CompartmentParams, DrugEffect,
    ResistanceMultipliers,
};
use crate::error::{NorwoodError, Result};
use crate::solver::{solve_compartment, NewtonRaphson};

/// Relative standard deviations of the patient draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientVariability {
    pub uvr: f64,
    pub lvr: f64,
    pub pvr: f64,
    pub heart_rate: f64,
}

impl Default for PatientVariability {
    fn default() -> Self {
        Self {
            uvr: 0.2,
            lvr: 0.2,
            pvr: 0.4,
            heart_rate: 0.3,
        }
    }
}

/// Monte Carlo study configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of realizations
    pub realizations: usize,
    /// Seed of the random number generator
    pub seed: u64,
    /// Drug applied to every realization
    pub drug: DrugEffect,
    /// Baseline inputs; UVR, LVR, PVR and HR are the means of the draws
    pub baseline: CompartmentParams,
    pub oxygen: CompartmentOxygenParams,
    pub variability: PatientVariability,
    /// Relative standard deviation of the drug multipliers
    pub drug_variability: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            realizations: 1000,
            seed: 0,
            drug: DrugEffect::Baseline,
            baseline: CompartmentParams::default(),
            oxygen: CompartmentOxygenParams::default(),
            variability: PatientVariability::default(),
            drug_variability: 0.25,
        }
    }
}

impl MonteCarloConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realizations(mut self, realizations: usize) -> Self {
        self.realizations = realizations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_drug(mut self, drug: DrugEffect) -> Self {
        self.drug = drug;
        self
    }

    pub fn with_baseline(mut self, baseline: CompartmentParams, oxygen: CompartmentOxygenParams) -> Self {
        self.baseline = baseline;
        self.oxygen = oxygen;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.realizations == 0 {
            return Err(NorwoodError::invalid_parameter(
                "realizations",
                0.0,
                "at least one realization is required",
            ));
        }
        self.baseline.validate()?;
        self.oxygen.validate()?;
        require_positive("UVR std", self.variability.uvr)?;
        require_positive("LVR std", self.variability.lvr)?;
        require_positive("PVR std", self.variability.pvr)?;
        require_positive("HR std", self.variability.heart_rate)?;
        require_positive("drug std", self.drug_variability)
    }
}

/// Gamma distribution with the given mean and relative standard deviation.
fn gamma(name: &str, mean: f64, relative_std: f64) -> Result<Gamma<f64>> {
    let std = mean * relative_std;
    let shape = mean * mean / (std * std);
    let scale = std * std / mean;
    Gamma::new(shape, scale)
        .map_err(|e| NorwoodError::invalid_parameter(name, mean, format!("cannot build Gamma draw: {e}")))
}

/// Outputs of one realization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSample {
    /// Clinical SVR of the patient draw, before the drug
    pub svr_base: f64,
    /// Clinical PVR of the patient draw, before the drug
    pub pvr_base: f64,
    /// Clinical SVR after the drug
    pub svr: f64,
    /// Clinical PVR after the drug
    pub pvr: f64,
    pub q_v: f64,
    pub q_u: f64,
    pub q_l: f64,
    pub p_sa: f64,
    pub p_pa: f64,
    pub p_pv: f64,
    /// Pulmonary arterial saturation (%)
    pub s_pa: f64,
    /// Oxygen extraction ratio (%)
    pub oer: f64,
}

/// Named output column of a [`MonteCarloSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonteCarloOutput {
    SvrBase,
    PvrBase,
    Svr,
    Pvr,
    QV,
    QU,
    QL,
    PSa,
    PPa,
    PPv,
    SPa,
    Oer,
}

impl MonteCarloOutput {
    pub const ALL: [MonteCarloOutput; 12] = [
        Self::SvrBase,
        Self::PvrBase,
        Self::Svr,
        Self::Pvr,
        Self::QV,
        Self::QU,
        Self::QL,
        Self::PSa,
        Self::PPa,
        Self::PPv,
        Self::SPa,
        Self::Oer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::SvrBase => "SVR_base",
            Self::PvrBase => "PVR_base",
            Self::Svr => "SVR",
            Self::Pvr => "PVR",
            Self::QV => "Q_v",
            Self::QU => "Q_u",
            Self::QL => "Q_l",
            Self::PSa => "P_sa",
            Self::PPa => "P_pa",
            Self::PPv => "P_pv",
            Self::SPa => "S_pa",
            Self::Oer => "OER",
        }
    }

    pub fn of(&self, s: &MonteCarloSample) -> f64 {
        match self {
            Self::SvrBase => s.svr_base,
            Self::PvrBase => s.pvr_base,
            Self::Svr => s.svr,
            Self::Pvr => s.pvr,
            Self::QV => s.q_v,
            Self::QU => s.q_u,
            Self::QL => s.q_l,
            Self::PSa => s.p_sa,
            Self::PPa => s.p_pa,
            Self::PPv => s.p_pv,
            Self::SPa => s.s_pa,
            Self::Oer => s.oer,
        }
    }
}

/// Mean and population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
}

impl Summary {
    pub fn from_samples(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(NorwoodError::dimension_mismatch("samples", 1, 0));
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Ok(Self {
            mean,
            std: variance.sqrt(),
        })
    }
}

/// All realizations of a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub config: MonteCarloConfig,
    pub samples: Vec<MonteCarloSample>,
}

impl MonteCarloResult {
    pub fn column(&self, output: MonteCarloOutput) -> Vec<f64> {
        self.samples.iter().map(|s| output.of(s)).collect()
    }

    pub fn summarize(&self, output: MonteCarloOutput) -> Result<Summary> {
        Summary::from_samples(&self.column(output))
    }

    /// Summary of every output, in [`MonteCarloOutput::ALL`] order.
    pub fn summary(&self) -> Result<Vec<(MonteCarloOutput, Summary)>> {
        MonteCarloOutput::ALL
            .iter()
            .map(|&o| Ok((o, self.summarize(o)?)))
            .collect()
    }
}

/// Run the study. Any failed realization aborts it with that error.
pub fn run_monte_carlo(config: &MonteCarloConfig, solver: &NewtonRaphson) -> Result<MonteCarloResult> {
    config.validate()?;
    let base = config.baseline;
    let var = config.variability;

    let uvr = gamma("UVR", base.uvr, var.uvr)?;
    let lvr = gamma("LVR", base.lvr, var.lvr)?;
    let pvr = gamma("PVR", base.pvr, var.pvr)?;
    let hr = gamma("HR", base.heart_rate, var.heart_rate)?;
    let drug = match config.drug {
        DrugEffect::Baseline => None,
        effect => {
            let nominal = effect.multipliers();
            Some((
                gamma("SVR effect", nominal.svr, config.drug_variability)?,
                gamma("PVR effect", nominal.pvr, config.drug_variability)?,
            ))
        }
    };

    log::info!(
        "Monte Carlo: {} realizations, drug {:?}, seed {}",
        config.realizations,
        config.drug,
        config.seed
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut samples = Vec::with_capacity(config.realizations);
    for n in 0..config.realizations {
        let patient = CompartmentParams {
            uvr: uvr.sample(&mut rng),
            lvr: lvr.sample(&mut rng),
            pvr: pvr.sample(&mut rng),
            heart_rate: hr.sample(&mut rng),
            ..base
        };
        let multipliers = match &drug {
            Some((svr_effect, pvr_effect)) => ResistanceMultipliers {
                svr: svr_effect.sample(&mut rng),
                pvr: pvr_effect.sample(&mut rng),
            },
            None => ResistanceMultipliers::IDENTITY,
        };
        let treated = patient.with_multipliers(multipliers);

        let solution = solve_compartment(&treated, &config.oxygen, solver)?;
        let f = solution.flows;
        samples.push(MonteCarloSample {
            svr_base: patient.clinical_svr(),
            pvr_base: patient.clinical_pvr(),
            svr: treated.clinical_svr(),
            pvr: treated.clinical_pvr(),
            q_v: f.q_v,
            q_u: f.q_u,
            q_l: f.q_l,
            p_sa: f.p_sa,
            p_pa: f.p_pa,
            p_pv: f.p_pv,
            s_pa: 100.0 * solution.saturations.s_pa,
            oer: 100.0 * solution.oer,
        });

        if (n + 1) % 1000 == 0 {
            log::info!("Monte Carlo: {}/{} realizations", n + 1, config.realizations);
        }
    }

    Ok(MonteCarloResult {
        config: *config,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(config: MonteCarloConfig) -> MonteCarloResult {
        run_monte_carlo(&config, &NewtonRaphson::new()).unwrap()
    }

    #[test]
    fn test_same_seed_reproduces() {
        let config = MonteCarloConfig::new().with_realizations(20).with_seed(7);
        assert_eq!(run(config).samples, run(config).samples);

        let other = run(config.with_seed(8));
        assert_ne!(run(config).samples, other.samples);
    }

    #[test]
    fn test_baseline_means() {
        let result = run(MonteCarloConfig::new().with_realizations(200).with_seed(42));
        assert_eq!(result.samples.len(), 200);

        let svr = result.summarize(MonteCarloOutput::SvrBase).unwrap();
        let pvr = result.summarize(MonteCarloOutput::PvrBase).unwrap();
        assert!(svr.mean > 14.0 && svr.mean < 20.0, "SVR mean {}", svr.mean);
        assert!(pvr.mean > 1.5 && pvr.mean < 2.1, "PVR mean {}", pvr.mean);
        assert!(svr.std > 0.0 && pvr.std > 0.0);

        // Without a drug the treated resistances are the patient draws
        for s in &result.samples {
            assert_eq!(s.svr, s.svr_base);
            assert_eq!(s.pvr, s.pvr_base);
        }
    }

    #[test]
    fn test_vasopressin_shifts_resistances() {
        let result = run(
            MonteCarloConfig::new()
                .with_realizations(200)
                .with_seed(3)
                .with_drug(DrugEffect::Vasopressin),
        );
        let svr_base = result.summarize(MonteCarloOutput::SvrBase).unwrap().mean;
        let svr = result.summarize(MonteCarloOutput::Svr).unwrap().mean;
        let pvr_base = result.summarize(MonteCarloOutput::PvrBase).unwrap().mean;
        let pvr = result.summarize(MonteCarloOutput::Pvr).unwrap().mean;
        assert!(svr > svr_base);
        assert!(pvr < pvr_base);
    }

    #[test]
    fn test_draw_order_with_drug() {
        // Per realization: UVR, LVR, PVR, HR, then the SVR and PVR effects
        let config = MonteCarloConfig::new()
            .with_realizations(100)
            .with_seed(42)
            .with_drug(DrugEffect::Phenylephrine);
        let solver = NewtonRaphson::new();
        let result = run_monte_carlo(&config, &solver).unwrap();

        let (base, var) = (config.baseline, config.variability);
        let nominal = DrugEffect::Phenylephrine.multipliers();
        let uvr = gamma("UVR", base.uvr, var.uvr).unwrap();
        let lvr = gamma("LVR", base.lvr, var.lvr).unwrap();
        let pvr = gamma("PVR", base.pvr, var.pvr).unwrap();
        let hr = gamma("HR", base.heart_rate, var.heart_rate).unwrap();
        let svr_effect = gamma("SVR effect", nominal.svr, config.drug_variability).unwrap();
        let pvr_effect = gamma("PVR effect", nominal.pvr, config.drug_variability).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let (mut svr, mut pvr_out, mut oer) = (vec![], vec![], vec![]);
        for sample in &result.samples {
            let patient = CompartmentParams {
                uvr: uvr.sample(&mut rng),
                lvr: lvr.sample(&mut rng),
                pvr: pvr.sample(&mut rng),
                heart_rate: hr.sample(&mut rng),
                ..base
            };
            let treated = patient.with_multipliers(ResistanceMultipliers {
                svr: svr_effect.sample(&mut rng),
                pvr: pvr_effect.sample(&mut rng),
            });
            let direct = solve_compartment(&treated, &config.oxygen, &solver).unwrap();

            assert_eq!(sample.svr_base, patient.clinical_svr());
            assert_eq!(sample.pvr_base, patient.clinical_pvr());
            assert_eq!(sample.svr, treated.clinical_svr());
            assert_eq!(sample.pvr, treated.clinical_pvr());
            assert_eq!(sample.q_v, direct.flows.q_v);
            svr.push(treated.clinical_svr());
            pvr_out.push(treated.clinical_pvr());
            oer.push(100.0 * direct.oer);
        }

        for (output, values) in [
            (MonteCarloOutput::Svr, &svr),
            (MonteCarloOutput::Pvr, &pvr_out),
            (MonteCarloOutput::Oer, &oer),
        ] {
            let expected = Summary::from_samples(values).unwrap();
            let summary = result.summarize(output).unwrap();
            assert_eq!(summary.mean, expected.mean);
            assert_eq!(summary.std, expected.std);
            assert!(summary.std > 0.0);
        }
    }

    #[test]
    fn test_samples_satisfy_flow_balance() {
        let result = run(MonteCarloConfig::new().with_realizations(25).with_seed(11));
        for s in &result.samples {
            assert_relative_eq!(s.q_u + s.q_l, s.q_v, max_relative = 1e-6);
            assert!(s.s_pa < 100.0);
            assert!(s.oer > 0.0);
        }
    }

    #[test]
    fn test_summary_statistics() {
        let s = Summary::from_samples(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(s.mean, 2.5);
        assert_relative_eq!(s.std, 1.25f64.sqrt());

        let err = Summary::from_samples(&[]).unwrap_err();
        assert!(matches!(err, NorwoodError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_summary_order() {
        let result = run(MonteCarloConfig::new().with_realizations(5).with_seed(1));
        let summary = result.summary().unwrap();
        assert_eq!(summary.len(), MonteCarloOutput::ALL.len());
        assert_eq!(summary[0].0, MonteCarloOutput::SvrBase);
        assert_eq!(summary[11].0.label(), "OER");
    }

    #[test]
    fn test_invalid_config() {
        let solver = NewtonRaphson::new();
        let err = run_monte_carlo(&MonteCarloConfig::new().with_realizations(0), &solver).unwrap_err();
        assert_eq!(err.param(), Some("realizations"));

        let mut config = MonteCarloConfig::new().with_realizations(5);
        config.variability.pvr = 0.0;
        let err = run_monte_carlo(&config, &solver).unwrap_err();
        assert_eq!(err.param(), Some("PVR std"));
    }
}
