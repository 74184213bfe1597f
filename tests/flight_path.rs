use astrogator::constants::G;
use astrogator::{
    Body, EnginePerformance, FlightPath, Maneuver, Orbit, PathError, System, ThrustDirection,
};
use glam::DVec3;

const SUN_GM: f64 = G * 1.98891691172467e30;
const ORBIT_PERIOD: f64 = 374942509.78053558;

fn sun_system() -> System {
    System::new(Body::new(SUN_GM, 10.0, "sun"))
}

fn reference_r() -> DVec3 {
    DVec3::new(617244712358.0, -431694791368.0, -12036457087.0)
}

fn reference_v() -> DVec3 {
    DVec3::new(7320.0, 11329.0, -211.0)
}

fn booster() -> EnginePerformance {
    EnginePerformance::new(3000.0, 20000.0)
}

fn assert_vec_close(actual: DVec3, expected: DVec3, rel: f64) {
    let tolerance = rel * expected.length().max(1.0);
    assert!(
        (actual - expected).length() <= tolerance,
        "expected {expected}, got {actual} (tolerance {tolerance})"
    );
}

#[test]
fn construction_validates_inputs() {
    let system = sun_system();
    assert!(matches!(
        FlightPath::new(&system, DVec3::ZERO, reference_v(), 0.0),
        Err(PathError::InvalidArgument(_))
    ));
    assert!(matches!(
        FlightPath::new(&system, reference_r(), reference_v(), -1.0),
        Err(PathError::InvalidArgument(_))
    ));
    assert!(FlightPath::new(&system, reference_r(), reference_v(), 0.0).is_ok());
}

#[test]
fn queries_before_the_start_fail() {
    let system = sun_system();
    let path = FlightPath::new(&system, reference_r(), reference_v(), 100.0).expect("path");
    assert!(matches!(
        path.predict(99.0),
        Err(PathError::OutOfRange { .. })
    ));
}

#[test]
fn prediction_at_the_start_returns_the_initial_state() {
    let system = sun_system();
    let path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let state = path.predict(0.0).expect("predict");
    assert_vec_close(state.position, reference_r(), 1e-9);
    assert_vec_close(state.velocity, reference_v(), 1e-9);
}

#[test]
fn ballistic_half_period_matches_reference_value() {
    let system = sun_system();
    let path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let state = path.predict(ORBIT_PERIOD / 2.0).expect("predict");
    let expected = DVec3::new(-719081127257.40515, 364854624247.81012, 14595231066.511684);
    assert_vec_close(state.position, expected, 1e-4);
    // The far side of the orbit is on the opposite side of the focus.
    assert!(state.position.normalize().dot(reference_r().normalize()) < -0.9);
}

#[test]
fn repeated_queries_are_stable() {
    let system = sun_system();
    let path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let first = path.predict(ORBIT_PERIOD * 0.3).expect("predict");
    let second = path.predict(ORBIT_PERIOD * 0.3).expect("predict");
    assert_eq!(first.position, second.position);
    assert_eq!(first.velocity, second.velocity);
}

#[test]
fn incremental_and_direct_extension_agree() {
    let system = sun_system();
    let direct = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let incremental = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");

    let target = ORBIT_PERIOD * 0.45;
    let expected = direct.predict(target).expect("predict");
    for i in 1..=9 {
        let t = target * f64::from(i) / 9.0;
        incremental.predict(t).expect("predict");
    }
    let state = incremental.predict(target).expect("predict");
    assert_eq!(state.position, expected.position);
    assert_eq!(state.velocity, expected.velocity);

    // The watermark never runs ahead of what queries demanded.
    let status = incremental.calculation_status();
    assert!(status.end_t >= target);
    assert!(status.end_t <= target + ORBIT_PERIOD * 0.02);
}

#[test]
fn prograde_burn_changes_speed_by_delta_v() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let burn_start = ORBIT_PERIOD / 2.0;
    let maneuver = Maneuver::new(ThrustDirection::Prograde, 2000.0, booster(), 150.0, burn_start)
        .expect("maneuver");
    path.add(maneuver).expect("add");

    let before = path.predict(maneuver.t0()).expect("predict").velocity;
    let after = path.predict(maneuver.t1()).expect("predict").velocity;
    let gained = after.length() - before.length();
    assert!(
        (gained - 2000.0).abs() < 2000.0 * 0.005,
        "expected ~2000 m/s gained, got {gained}"
    );
}

#[test]
fn retrograde_burn_slows_the_craft() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let maneuver = Maneuver::new(
        ThrustDirection::Retrograde,
        500.0,
        booster(),
        150.0,
        1000.0,
    )
    .expect("maneuver");
    path.add(maneuver).expect("add");

    let before = path.predict(maneuver.t0()).expect("predict").velocity;
    let after = path.predict(maneuver.t1()).expect("predict").velocity;
    let lost = before.length() - after.length();
    assert!((lost - 500.0).abs() < 500.0 * 0.005);
}

#[test]
fn state_is_continuous_into_a_burn() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let burn_start = ORBIT_PERIOD / 2.0;
    let maneuver = Maneuver::new(ThrustDirection::Prograde, 2000.0, booster(), 150.0, burn_start)
        .expect("maneuver");
    path.add(maneuver).expect("add");

    let coast_side = path.predict(burn_start - 1e-3).expect("predict");
    let burn_side = path.predict(burn_start).expect("predict");
    assert!((burn_side.velocity.length() - coast_side.velocity.length()).abs() < 4e-3);
    assert!((burn_side.position - coast_side.position).length() < 100.0);
}

#[test]
fn coasting_resumes_after_the_burn() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let maneuver = Maneuver::new(
        ThrustDirection::Prograde,
        1000.0,
        booster(),
        150.0,
        ORBIT_PERIOD / 4.0,
    )
    .expect("maneuver");
    path.add(maneuver).expect("add");

    let at_cutoff = path.predict(maneuver.t1()).expect("predict");
    let later = path.predict(maneuver.t1() + 1.0e6).expect("predict");
    // Unpowered two-body motion conserves energy about the primary.
    let energy = |state: &astrogator::KinematicData| {
        state.velocity.length_squared() / 2.0 - SUN_GM / state.position.length()
    };
    let drift = (energy(&later) - energy(&at_cutoff)).abs() / energy(&at_cutoff).abs();
    assert!(drift < 1e-6, "specific energy drifted by {drift}");
}

#[test]
fn overlapping_maneuvers_conflict() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let first = Maneuver::new(ThrustDirection::Prograde, 2000.0, booster(), 150.0, 1000.0)
        .expect("maneuver");
    path.add(first).expect("add");

    let overlapping = Maneuver::new(
        ThrustDirection::Prograde,
        100.0,
        booster(),
        100.0,
        first.t1() - 0.5,
    )
    .expect("maneuver");
    assert!(matches!(
        path.add(overlapping),
        Err(PathError::Conflict { .. })
    ));

    let adjacent = Maneuver::new(ThrustDirection::Prograde, 100.0, booster(), 100.0, first.t1())
        .expect("maneuver");
    path.add(adjacent).expect("add");
    assert_eq!(path.maneuvers().len(), 2);
}

#[test]
fn maneuver_lookup_respects_the_burn_interval() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let maneuver = Maneuver::new(ThrustDirection::Prograde, 2000.0, booster(), 150.0, 1000.0)
        .expect("maneuver");
    path.add(maneuver).expect("add");

    assert!(path.find_maneuver(999.0).is_none());
    assert!(path.find_maneuver(1000.0).is_some());
    assert!(path.find_maneuver(maneuver.t1()).is_none());
    assert_eq!(
        path.find_next_maneuver(0.0).map(Maneuver::t0),
        Some(1000.0)
    );
    assert!(path.find_next_maneuver(1000.0).is_none());
}

#[test]
fn schedule_changes_reset_the_cache() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let ballistic_half = path.predict(ORBIT_PERIOD / 2.0).expect("predict");

    let maneuver = Maneuver::new(
        ThrustDirection::Prograde,
        2000.0,
        booster(),
        150.0,
        ORBIT_PERIOD / 4.0,
    )
    .expect("maneuver");
    path.add(maneuver).expect("add");
    assert!(path.calculation_status().end_t <= 0.0 + f64::EPSILON);
    let burned_half = path.predict(ORBIT_PERIOD / 2.0).expect("predict");
    assert!(
        (burned_half.velocity.length() - ballistic_half.velocity.length()).abs() > 1000.0,
        "burn should change the later trajectory"
    );

    assert!(path.remove(&maneuver));
    assert!(!path.remove(&maneuver));
    let restored = path.predict(ORBIT_PERIOD / 2.0).expect("predict");
    assert_eq!(restored.position, ballistic_half.position);
    assert_eq!(restored.velocity, ballistic_half.velocity);
}

#[test]
fn clearing_the_tail_drops_later_maneuvers() {
    let system = sun_system();
    let mut path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let first = Maneuver::new(ThrustDirection::Prograde, 500.0, booster(), 150.0, 1000.0)
        .expect("maneuver");
    let second = Maneuver::new(ThrustDirection::Prograde, 500.0, booster(), 150.0, 5000.0)
        .expect("maneuver");
    path.add(first).expect("add");
    path.add(second).expect("add");

    path.clear_after(2000.0);
    assert_eq!(path.maneuvers().len(), 1);
    path.clear();
    assert!(path.maneuvers().is_empty());
    assert!(path.predict(10000.0).is_ok());
}

#[test]
fn osculating_orbit_matches_the_trajectory() {
    let system = sun_system();
    let path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let data = path.predict_orbit(ORBIT_PERIOD / 4.0, None).expect("orbit");
    assert_eq!(data.reference.id(), "sun");
    let relative = (data.orbit.semi_major_axis() - 778952537739.3).abs() / 778952537739.3;
    assert!(relative < 1e-4);
    assert!((data.orbit.eccentricity() - 0.049).abs() < 1e-3);
}

#[test]
fn osculating_orbit_about_an_explicit_body() {
    let system = sun_system();
    let path = FlightPath::new(&system, reference_r(), reference_v(), 0.0).expect("path");
    let sun = system.root();
    let data = path
        .predict_orbit(ORBIT_PERIOD / 4.0, Some(sun))
        .expect("orbit");
    assert_eq!(data.reference.id(), "sun");
    let relative = (data.orbit.semi_major_axis() - 778952537739.3).abs() / 778952537739.3;
    assert!(relative < 1e-4);
}

/// Star/planet system used by the capture and far-peer scenarios.
fn star_planet_system() -> System {
    let star = Body::new(1.0e14, 7.0e8, "star");
    let mut system = System::new(star);
    let velocity = DVec3::new(0.0, (1.0e14_f64 / 1.0e12).sqrt() * 1.000003, 0.0);
    let orbit = Orbit::from_state(
        system.root(),
        DVec3::new(1.0e12, 0.0, 0.0),
        velocity,
    )
    .expect("planet orbit");
    system
        .add_child("star", Body::orbiting(5.0e13, 6.0e6, "planet", orbit))
        .expect("attach planet");
    system
}

#[test]
fn craft_captured_inside_a_sphere_of_influence_stays_there() {
    let system = star_planet_system();
    let planet = system.body("planet").expect("planet");
    let planet_r = system.predict_system_position(planet, 0.0).expect("position");
    let planet_v = system.predict_system_velocity(planet, 0.0).expect("velocity");

    // Bound orbit around the planet, apoapsis well inside its sphere.
    let rel_r = DVec3::new(1.0e4, 0.0, 0.0);
    let rel_v = DVec3::new(0.0, (5.0e13_f64 / 1.0e4).sqrt() * 0.9, 1000.0);
    let path = FlightPath::new(&system, planet_r + rel_r, planet_v + rel_v, 0.0).expect("path");

    for t in [1000.0, 123456.0, 5.0e6] {
        let data = path.predict_orbit(t, None).expect("orbit");
        assert_eq!(data.reference.id(), "planet", "at t = {t}");

        let state = path.predict(t).expect("predict");
        let planet_at_t = system.predict_system_position(planet, t).expect("position");
        let distance = (state.position - planet_at_t).length();
        assert!(
            (6.8e3..=1.01e4).contains(&distance),
            "craft should stay between its apsides, got {distance} at t = {t}"
        );
    }
}

#[test]
fn coasting_far_from_a_peer_matches_two_body_motion() {
    let system = star_planet_system();
    // Craft well inside the planet's orbit: the peer bounds step sizes but
    // never captures.
    let r0 = DVec3::new(3.0e11, 0.0, 0.0);
    let v0 = DVec3::new(0.0, 20.412414523193153, 0.0);
    let path = FlightPath::new(&system, r0, v0, 0.0).expect("path");

    let quarter = 158953412252.73773 / 4.0;
    let state = path.predict(quarter).expect("predict");
    assert_vec_close(
        state.position,
        DVec3::new(-196119916781.88, 375949998667.35, 0.0),
        1e-6,
    );
    assert_vec_close(
        state.velocity,
        DVec3::new(-14.478310665396, -3.470343516175, 0.0),
        1e-6,
    );

    let data = path.predict_orbit(quarter, None).expect("orbit");
    assert_eq!(data.reference.id(), "star");
}
