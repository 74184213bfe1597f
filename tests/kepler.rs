use astrogator::kepler::{self, KeplerError, CONVERGENCE_THRESHOLD};

#[test]
fn zero_eccentricity_returns_mean_anomaly() {
    assert_eq!(kepler::solve(0.0, 1.234).expect("solve"), 1.234);
}

#[test]
fn elliptic_solutions_satisfy_keplers_equation() {
    for e in [0.01, 0.2, 0.6, 0.89, 0.93, 0.99, 0.9999] {
        for m in [-20.0, -3.2, -0.5, 0.0, 0.3, 1.9, 3.1, 8.0, 40.0] {
            let ea = kepler::solve(e, m).expect("solve");
            let residual = (ea - e * ea.sin() - m).abs();
            assert!(
                residual < 1e-9 * m.abs().max(1.0),
                "residual {residual} for e = {e}, M = {m}"
            );
        }
    }
}

#[test]
fn hyperbolic_solutions_satisfy_keplers_equation() {
    for e in [1.0000001, 1.001, 1.05, 1.3, 2.5, 12.0, 60.0] {
        for m in [-900.0, -12.0, -0.01, 0.5, 3.0, 77.0, 1500.0] {
            let ha = kepler::solve(e, m).expect("solve");
            let residual = (e * ha.sinh() - ha - m).abs();
            assert!(
                residual < 1e-8 * m.abs().max(1.0),
                "residual {residual} for e = {e}, M = {m}"
            );
        }
    }
}

#[test]
fn threshold_scales_with_eccentricity() {
    // The contract tolerance is CONVERGENCE_THRESHOLD * max(1, |1 - e|).
    let e = 40.0;
    let m = 1000.0;
    let ha = kepler::solve(e, m).expect("solve");
    let residual = (e * ha.sinh() - ha - m).abs();
    assert!(residual < CONVERGENCE_THRESHOLD * (1.0 - e).abs() * m);
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(matches!(
        kepler::solve(f64::NAN, 0.5),
        Err(KeplerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        kepler::solve(0.5, f64::NAN),
        Err(KeplerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        kepler::solve(0.5, f64::INFINITY),
        Err(KeplerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        kepler::solve(-0.2, 0.5),
        Err(KeplerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        kepler::solve(1.0, 0.5),
        Err(KeplerError::InvalidArgument { .. })
    ));
}

#[test]
fn solutions_respect_odd_symmetry() {
    for e in [0.3, 0.95, 1.4] {
        let forward = kepler::solve(e, 0.8).expect("solve");
        let backward = kepler::solve(e, -0.8).expect("solve");
        assert!((forward + backward).abs() < 1e-9);
    }
}
