
use lbdirect::prelude::*;
use lbdirect::transform::GeometricParams;
use test_functions::{bowl, notch, offset_bowl, plateau};

fn notch_bounds() -> Bounds {
    Bounds::new([(-0.1, 0.1), (-0.1, 0.1)]).unwrap()
}

fn assert_notch_found(record: &SearchRecord, bounds: &Bounds) {
    assert_eq!(record.termination(), TerminationReason::Falsified);
    assert!(record.minimum() <= -0.5);
    assert!(record.evaluations() <= 500);
    let real = bounds.to_real(record.optimal_result()).unwrap();
    assert_eq!(notch(&real), -0.5, "reported point {real:?} is not in the notch");
}

// ---------------------------------------------------------------------------
// One-dimensional bowl
// ---------------------------------------------------------------------------

#[test]
fn bowl_is_falsified_at_the_root() {
    let bounds = Bounds::new([(0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder().max_evaluations(50).build().unwrap();
    let record = LowBoundedDirect::new(bowl, bounds, config).solve();

    assert_eq!(record.termination(), TerminationReason::Falsified);
    assert!((record.minimum() + 0.01).abs() < 1e-12);
    assert!((record.optimal_result()[0] - 0.5).abs() < 1e-12);
    assert_eq!(record.rounds(), 0);
    assert_eq!(record.evaluations(), 1);
}

#[test]
fn poset_bowl_is_falsified_at_the_root() {
    let bounds = Bounds::new([(0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder().max_evaluations(50).build().unwrap();
    let record = PosetDirect::new(bowl, bounds, config).solve();
    assert!(record.is_falsified());
    assert!((record.minimum() + 0.01).abs() < 1e-12);
}

#[test]
fn raised_bowl_converges_near_its_floor() {
    let bounds = Bounds::new([(0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder()
        .max_evaluations(50)
        .max_iterations(200)
        .build()
        .unwrap();
    let record = LowBoundedDirect::new(|x: &[f64]| bowl(x) + 0.02, bounds, config).solve();
    assert_eq!(record.termination(), TerminationReason::Converged);
    assert!((record.minimum() - 0.01).abs() < 1e-12);
    assert!(record.evaluations() <= 50);
}

// ---------------------------------------------------------------------------
// Two-dimensional notch
// ---------------------------------------------------------------------------

#[test]
fn sequential_finds_the_notch() {
    let bounds = notch_bounds();
    let config = DirectConfig::builder()
        .max_evaluations(500)
        .max_iterations(500)
        .build()
        .unwrap();
    let engine = LowBoundedDirect::new(bounds.rescaled(notch), bounds.clone(), config);
    assert_notch_found(&engine.solve(), &bounds);
}

#[test]
fn poset_finds_the_notch() {
    let bounds = notch_bounds();
    for workers in [1, 4] {
        let config = DirectConfig::builder()
            .max_evaluations(500)
            .max_iterations(500)
            .workers(workers)
            .build()
            .unwrap();
        let engine = PosetDirect::new(bounds.rescaled(notch), bounds.clone(), config);
        assert_notch_found(&engine.solve(), &bounds);
    }
}

#[test]
fn poset_with_wide_frontier_finds_the_notch() {
    let bounds = notch_bounds();
    let config = DirectConfig::builder()
        .max_evaluations(500)
        .max_iterations(500)
        .po_set_size(8)
        .workers(3)
        .build()
        .unwrap();
    let engine = PosetDirect::new(
        Recording::new(bounds.rescaled(notch)),
        bounds.clone(),
        config,
    );
    let record = engine.solve();
    assert_notch_found(&record, &bounds);
    assert!(record.evaluations() <= engine.oracle().len());
}

// ---------------------------------------------------------------------------
// Malformed input and failing oracles
// ---------------------------------------------------------------------------

#[test]
fn zero_width_bounds_are_rejected() {
    let err = Bounds::new([(0.0, 0.0)]).unwrap_err();
    assert!(matches!(err, Error::InvalidBounds(_)));
    assert_eq!(err, Error::InvalidBounds(BoundsDefect::NoFreeAxes));
    assert!(matches!(
        Bounds::new(Vec::new()),
        Err(Error::InvalidBounds(BoundsDefect::Empty))
    ));
    assert!(matches!(
        Bounds::new([(1.0, 0.0)]),
        Err(Error::InvalidBounds(BoundsDefect::Interval { index: 0, .. }))
    ));
}

#[test]
fn failing_oracle_exhausts_with_all_invalid() {
    let bounds = Bounds::new([(0.0, 1.0), (0.0, 1.0)]).unwrap();
    let record = LowBoundedDirect::new(|_: &[f64]| f64::NAN, bounds.clone(), DirectConfig::default())
        .solve();
    assert_eq!(record.termination(), TerminationReason::BudgetExhausted);
    assert!(record.all_invalid());
    assert_eq!(record.evaluations(), 1);
    assert_eq!(record.minimum(), f64::INFINITY);

    let record = PosetDirect::new(|_: &[f64]| f64::NAN, bounds, DirectConfig::default()).solve();
    assert!(record.all_invalid());
}

struct Patchy;

impl Oracle for Patchy {
    type Error = String;

    fn evaluate(&self, point: &[f64]) -> Result<f64, String> {
        if point[0] < 0.3 {
            Err(format!("renderer failed at {point:?}"))
        } else {
            Ok(point[0] + point[1] - 0.6)
        }
    }
}

#[test]
fn oracle_errors_mark_regions_invalid() {
    let bounds = Bounds::new([(0.0, 1.0), (0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder()
        .max_evaluations(300)
        .max_iterations(300)
        .build()
        .unwrap();
    let record = LowBoundedDirect::new(Patchy, bounds, config).solve();
    assert!(record.is_falsified());
    assert!(record.optimal_result()[0] >= 0.3);
    assert!(!record.all_invalid());
}

// ---------------------------------------------------------------------------
// Configuration variants
// ---------------------------------------------------------------------------

#[test]
fn plateau_stops_at_max_depth() {
    let bounds = Bounds::new([(0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder()
        .max_deep(3)
        .max_evaluations(10_000)
        .max_iterations(10_000)
        .build()
        .unwrap();
    let record = LowBoundedDirect::new(plateau, bounds, config).solve();
    // 27 leaves at depth 3: root plus 26 samples
    assert_eq!(record.termination(), TerminationReason::MaxDepth);
    assert_eq!(record.evaluations(), 27);
    assert_eq!(record.history().last().unwrap().leaves, 27);
}

#[test]
fn assumed_lipschitz_constant_still_searches() {
    let bounds = Bounds::new([(0.0, 1.0), (0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder()
        .lipschitz(4.0)
        .max_evaluations(400)
        .max_iterations(400)
        .build()
        .unwrap();
    let record = LowBoundedDirect::new(offset_bowl, bounds, config).solve();
    assert!(!record.is_falsified());
    assert!(record.evaluations() <= 400);
    assert!(record.minimum() < offset_bowl(&[0.5, 0.5]));
    assert!(record.local_lower_bound().is_finite());
}

#[test]
fn round_budget_is_honored() {
    let bounds = Bounds::new([(0.0, 1.0), (0.0, 1.0)]).unwrap();
    let config = DirectConfig::builder().max_iterations(3).build().unwrap();
    let record = PosetDirect::new(offset_bowl, bounds, config).solve();
    assert_eq!(record.rounds(), 3);
    assert_eq!(record.termination(), TerminationReason::BudgetExhausted);
}

// ---------------------------------------------------------------------------
// Transform spaces
// ---------------------------------------------------------------------------

#[test]
fn rotation_search_resolves_to_a_flipping_angle() {
    let space = TransformSpace::new().angle(0.1).shift(0.05);
    let bounds = space.bounds().unwrap();
    let margin = |params: &[f64]| 0.2 - params[0] + params[1].abs();

    let config = DirectConfig::builder().max_evaluations(200).build().unwrap();
    let record = LowBoundedDirect::new(bounds.rescaled(margin), bounds, config).solve();
    assert!(record.is_falsified());

    let Resolved::Geometric(GeometricParams { angle, .. }) =
        space.resolve(record.optimal_result()).unwrap()
    else {
        panic!("expected geometric parameters");
    };
    assert!(angle > 0.2);
}
