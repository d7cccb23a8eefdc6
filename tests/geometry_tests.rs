use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use veins_evi_bridge::common::DetectorInputError;
use veins_evi_bridge::domains::collision::{collision, Footprint, Interval, Vec2, VehicleClass};
use veins_evi_bridge::domains::vehicle::{Coord, Heading};

// Farthest any corner gets from the front bumper anchor.
fn reach(class: VehicleClass) -> f64 {
    (class.length().powi(2) + class.half_width().powi(2)).sqrt()
}

fn random_footprint(rng: &mut StdRng, class: VehicleClass) -> Footprint {
    let front = Vec2::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
    let heading = Heading::from_rad(rng.gen_range(-PI..PI)).to_coord();
    Footprint::new(class, front, heading.into()).unwrap()
}

#[test]
fn overlap_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let car = random_footprint(&mut rng, VehicleClass::Car);
        let bicycle = random_footprint(&mut rng, VehicleClass::Bicycle);
        assert_eq!(car.overlaps(&bicycle).unwrap(), bicycle.overlaps(&car).unwrap());
    }
}

#[test]
fn distant_vehicles_never_collide() {
    let mut rng = StdRng::seed_from_u64(7);
    let clearance = reach(VehicleClass::Car) + reach(VehicleClass::Bicycle) + 0.01;
    for _ in 0..500 {
        let bearing = rng.gen_range(-PI..PI);
        let distance = clearance + rng.gen_range(0.0..20.0);
        let ego = Coord::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        let fellow = Coord::new(ego.x + distance * bearing.cos(), ego.y + distance * bearing.sin());
        let hit = collision(
            fellow,
            ego,
            Heading::from_rad(rng.gen_range(-PI..PI)),
            Heading::from_rad(rng.gen_range(-PI..PI)),
        )
        .unwrap();
        assert!(!hit, "{fellow:?} vs {ego:?} at {distance}");
    }
}

#[test]
fn identical_poses_collide() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let position = Coord::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        let heading = Heading::from_rad(rng.gen_range(-PI..PI));
        assert!(collision(position, position, heading, heading).unwrap());
    }
}

#[test]
fn side_by_side_with_a_gap_is_clear() {
    let heading = Heading::from_rad(0.0);
    // car occupies y in [-0.9, 0.9], bicycle centred 1.5 m to the side
    assert!(!collision(Coord::new(0.0, 0.0), Coord::new(0.0, 1.5), heading, heading).unwrap());
    assert!(collision(Coord::new(0.0, 0.0), Coord::new(0.0, 1.2), heading, heading).unwrap());
}

#[test]
fn crossing_at_right_angles_is_detected() {
    // bicycle crossing the middle of the car at a right angle
    let hit = collision(
        Coord::new(0.0, 0.0),
        Coord::new(2.0, 0.5),
        Heading::from_rad(0.0),
        Heading::from_rad(PI / 2.0),
    )
    .unwrap();
    assert!(hit);
}

#[test]
fn interval_overlap_is_reflexive_and_closed() {
    let a = Interval::new(1.0, 3.0);
    assert!(a.overlaps(&a));
    assert!(a.overlaps(&Interval::new(3.0, 5.0)));
    assert!(Interval::new(3.0, 5.0).overlaps(&a));
    assert!(!a.overlaps(&Interval::new(3.0 + 1e-9, 5.0)));
    assert!(a.overlaps(&Interval::new(1.5, 2.5)));
    assert!(Interval::new(1.5, 2.5).overlaps(&a));
}

#[test]
fn bad_input_is_reported_not_hidden() {
    assert_eq!(
        Footprint::new(VehicleClass::Car, Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0)),
        Err(DetectorInputError::ZeroLengthHeading)
    );
    assert!(matches!(
        Footprint::new(VehicleClass::Bicycle, Vec2::new(f64::NAN, 0.0), Vec2::new(1.0, 0.0)),
        Err(DetectorInputError::NonFinitePose(_))
    ));
}
