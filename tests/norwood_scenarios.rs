//! End-to-end scenarios across configuration, solvers and studies.

use approx::assert_relative_eq;
use norwood_core::circuit::{DrugEffect, OxygenParams, SteadyStateParams, StrokeVolumeClosure};
use norwood_core::solver::{
    estimate_arterial_venous, estimate_diastolic, simulate_extended, solve_compartment,
    solve_flow_pressure, solve_saturation, ExtendedModel, ExtendedState,
};
use norwood_core::study::{run_monte_carlo, MonteCarloConfig, MonteCarloOutput};
use norwood_core::{ModelConfig, NewtonRaphson, NorwoodError, Preset};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("norwood_{}_{}", std::process::id(), name))
}

#[test]
fn test_config_file_with_preset() {
    let path = temp_path("config.json");
    let mut original = ModelConfig::default();
    original.params.pvr = 12.0;
    std::fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

    let mut config = ModelConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.preset, None);
    assert_relative_eq!(config.params.compliances.c_pv, original.params.compliances.c_pv, max_relative = 1e-15);

    config.apply_preset(Preset::HeartFailure);
    assert_eq!(config.preset, Some(Preset::HeartFailure));
    assert_eq!(config.compliances(), Preset::HeartFailure.params().compliances);
    // Resistances stay as loaded
    assert_eq!(config.params.pvr, 12.0);

    let s = solve_compartment(&config.params, &config.oxygen, &NewtonRaphson::new()).unwrap();
    let c = config.compliances();
    let f = s.flows;
    assert_relative_eq!(c.c_sa * f.p_sa + c.c_pv * f.p_pv + c.c_pa * f.p_pa, 1.0, max_relative = 1e-6);
    assert_relative_eq!(config.params.pvr * f.q_p, f.p_pa - f.p_pv, max_relative = 1e-6);
}

#[test]
fn test_config_errors() {
    let missing = temp_path("missing.json");
    let err = ModelConfig::from_json_file(&missing).unwrap_err();
    assert!(matches!(err, NorwoodError::FileReadError { .. }));

    let path = temp_path("broken.json");
    std::fs::write(&path, "{ \"params\": 3 }").unwrap();
    let err = ModelConfig::from_json_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, NorwoodError::ConfigParse { .. }));

    let path = temp_path("invalid.json");
    let mut bad = ModelConfig::default();
    bad.params.uvr = -1.0;
    std::fs::write(&path, serde_json::to_string(&bad).unwrap()).unwrap();
    let err = ModelConfig::from_json_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert_eq!(err.param(), Some("UVR"));
}

#[test]
fn test_steady_state_feeds_oxygen_balance() {
    let flow = solve_flow_pressure(&SteadyStateParams::default()).unwrap();
    let params = OxygenParams::default();
    let o = solve_saturation(flow.q_s, flow.q_p, &params).unwrap();

    assert!(o.s_sv < o.s_m && o.s_m < params.s_pv);
    assert_relative_eq!(
        1.34 * params.hemoglobin * flow.q_s * (o.s_m - o.s_sv),
        params.consumption,
        max_relative = 1e-9
    );
}

#[test]
fn test_compliance_estimates_recover_circuit() {
    let base = SteadyStateParams {
        c_a: 1.0,
        c_v: 7.0,
        ..SteadyStateParams::default()
    };

    // Pressures from several operating points share C_A·P_a + C_V·P_v = V_total
    let (mut p_a, mut p_v) = (Vec::new(), Vec::new());
    for hr in [100.0, 120.0, 140.0, 160.0] {
        let s = solve_flow_pressure(&SteadyStateParams { heart_rate: hr, ..base }).unwrap();
        p_a.push(s.p_a);
        p_v.push(s.p_v);
    }
    let est = estimate_arterial_venous(&p_a, &p_v, Some(base.v_total)).unwrap();
    assert_relative_eq!(est.c_a, 1.0, max_relative = 1e-9);
    assert_relative_eq!(est.c_v, 7.0, max_relative = 1e-9);
    assert_eq!(est.rank, 1);

    // Ejection-fraction runs identify the diastolic compliance
    let (mut pv, mut hr, mut ef, mut qs, mut qp) = (vec![], vec![], vec![], vec![], vec![]);
    for (h, e) in [(110.0, 0.4), (130.0, 0.5), (150.0, 0.6)] {
        let params = SteadyStateParams {
            heart_rate: h,
            closure: StrokeVolumeClosure::EjectionFraction { ef: e },
            ..base
        };
        let s = solve_flow_pressure(&params).unwrap();
        pv.push(s.p_v);
        hr.push(h);
        ef.push(e);
        qs.push(s.q_s);
        qp.push(s.q_p);
    }
    let est = estimate_diastolic(&pv, &hr, &ef, &qs, &qp).unwrap();
    assert_relative_eq!(est.c_dia, base.c_dia, max_relative = 1e-9);
    assert!(est.residual < 1e-8);
}

#[test]
fn test_drugs_move_compartment_flows() {
    let config = ModelConfig::default();
    let solver = NewtonRaphson::new();
    let base = solve_compartment(&config.params, &config.oxygen, &solver).unwrap();
    let vaso = solve_compartment(&config.params.with_drug(DrugEffect::Vasopressin), &config.oxygen, &solver).unwrap();

    // Systemic pressure rises while the body split follows LVR/UVR
    assert!(vaso.flows.p_sa > base.flows.p_sa);
    assert_relative_eq!(
        vaso.flows.q_u / vaso.flows.q_l,
        base.flows.q_u / base.flows.q_l,
        max_relative = 1e-6
    );
}

#[test]
fn test_monte_carlo_from_preset() {
    let mut config = ModelConfig::default();
    let (_, oxygen) = config.apply_preset(Preset::LungProblem);
    assert_eq!(oxygen, Preset::LungProblem.oxygen());

    let mc = MonteCarloConfig::new()
        .with_realizations(50)
        .with_seed(2024)
        .with_drug(DrugEffect::Phenylephrine)
        .with_baseline(config.params, config.oxygen);
    let solver = NewtonRaphson::new();
    let a = run_monte_carlo(&mc, &solver).unwrap();
    let b = run_monte_carlo(&mc, &solver).unwrap();
    assert_eq!(a, b);

    let summary = a.summary().unwrap();
    let qv = summary.iter().find(|(o, _)| *o == MonteCarloOutput::QV).unwrap().1;
    assert!(qv.mean > 0.0 && qv.std > 0.0);
}

#[test]
fn test_extended_model_conserves_volume() {
    let hr = 130.0;
    let model = ExtendedModel::reference(hr).unwrap();
    let dt = 1.0 / hr / 200.0;
    let series = simulate_extended(&model, ExtendedState::reference_initial(), 0.0, 2.0 / hr, dt).unwrap();
    assert_eq!(series.len(), 401);

    for (_, s) in series.iter().skip(1) {
        let stored = s.v_a
            + s.v_v
            + model.c_sa * s.p_sa
            + model.c_sv * s.p_sv
            + model.c_pa * s.p_pa
            + model.c_pv * s.p_pv;
        assert_relative_eq!(stored, model.v_total, max_relative = 1e-5);
    }
}
