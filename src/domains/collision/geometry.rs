//! Separating axis test for rectangular vehicle footprints.
//!
//! A footprint is anchored at the middle of the front bumper. The two front
//! corners sit half a width to either side along the normal of the heading,
//! the other two corners `length` further along the heading.

use crate::common::DetectorInputError;
use crate::domains::vehicle::{Coord, Heading};

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized(&self) -> Option<Vec2> {
        let length = self.length();
        if !length.is_finite() || length < EPSILON {
            return None;
        }
        Some(Vec2::new(self.x / length, self.y / length))
    }

    /// Unit normal `(y, -x)`.
    pub fn normal(&self) -> Option<Vec2> {
        Vec2::new(self.y, -self.x).normalized()
    }

    pub fn offset(&self, direction: Vec2, distance: f64) -> Vec2 {
        Vec2::new(self.x + direction.x * distance, self.y + direction.y * distance)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Coord> for Vec2 {
    fn from(coord: Coord) -> Self {
        Vec2::new(coord.x, coord.y)
    }
}

/// Body dimensions per vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleClass {
    Car,
    Bicycle,
}

impl VehicleClass {
    pub fn half_width(&self) -> f64 {
        match self {
            VehicleClass::Car => 0.9,
            VehicleClass::Bicycle => 0.325,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            VehicleClass::Car => 4.3,
            VehicleClass::Bicycle => 1.6,
        }
    }

    pub fn half_diagonal(&self) -> f64 {
        (self.half_width().powi(2) + (self.length() / 2.0).powi(2)).sqrt()
    }
}

/// Position of a point along `axis`, found by intersecting the line through
/// `point` with direction `across` and the line through the origin along `axis`.
pub fn project_point(axis: Vec2, across: Vec2, point: Vec2) -> Result<f64, DetectorInputError> {
    let denominator = across.x * axis.y - axis.x * across.y;
    if denominator.abs() < EPSILON {
        return Err(DetectorInputError::DegenerateAxis);
    }
    Ok((point.y * across.x - point.x * across.y) / denominator)
}

/// How two closed intervals relate, when they overlap at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalRelation {
    Contains,
    ContainedBy,
    Precedes,
    Follows,
}

/// Closed interval on a projection axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_values(values: &[f64]) -> Self {
        values.iter().fold(
            Interval {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, value| Interval {
                min: acc.min.min(*value),
                max: acc.max.max(*value),
            },
        )
    }

    /// `None` when the intervals are disjoint. Touching endpoints overlap.
    pub fn relation(&self, other: &Interval) -> Option<IntervalRelation> {
        if self.min <= other.min && other.max <= self.max {
            Some(IntervalRelation::Contains)
        } else if other.min <= self.min && self.max <= other.max {
            Some(IntervalRelation::ContainedBy)
        } else if self.min <= other.min && other.min <= self.max {
            Some(IntervalRelation::Precedes)
        } else if other.min <= self.min && self.min <= other.max {
            Some(IntervalRelation::Follows)
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.relation(other).is_some()
    }
}

/// Rectangular planar body of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    corners: [Vec2; 4],
    direction: Vec2,
    normal: Vec2,
}

impl Footprint {
    pub fn new(class: VehicleClass, front: Vec2, heading: Vec2) -> Result<Self, DetectorInputError> {
        if !front.is_finite() || !heading.is_finite() {
            return Err(DetectorInputError::NonFinitePose(format!("{front:?}")));
        }
        let direction = heading.normalized().ok_or(DetectorInputError::ZeroLengthHeading)?;
        let normal = direction.normal().ok_or(DetectorInputError::ZeroLengthHeading)?;

        let front_left = front.offset(normal, class.half_width());
        let front_right = front.offset(normal, -class.half_width());
        let rear_left = front_left.offset(direction, class.length());
        let rear_right = front_right.offset(direction, class.length());

        Ok(Self {
            corners: [front_left, front_right, rear_left, rear_right],
            direction,
            normal,
        })
    }

    pub fn from_pose(class: VehicleClass, position: Coord, heading: Heading) -> Result<Self, DetectorInputError> {
        Self::new(class, position.into(), heading.to_coord().into())
    }

    pub fn corners(&self) -> &[Vec2; 4] {
        &self.corners
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    pub fn project(&self, axis: Vec2, across: Vec2) -> Result<Interval, DetectorInputError> {
        let mut values = [0.0; 4];
        for (value, corner) in values.iter_mut().zip(self.corners.iter()) {
            *value = project_point(axis, across, *corner)?;
        }
        Ok(Interval::from_values(&values))
    }

    /// Separating axis test over both bodies' heading and normal axes.
    pub fn overlaps(&self, other: &Footprint) -> Result<bool, DetectorInputError> {
        let axes = [
            (self.direction, self.normal),
            (self.normal, self.direction),
            (other.normal, other.direction),
            (other.direction, other.normal),
        ];
        for (axis, across) in axes {
            let a = self.project(axis, across)?;
            let b = other.project(axis, across)?;
            if !a.overlaps(&b) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Collision between a car (the fellow) and a bicycle (the ego vehicle).
///
/// Only this pairing is modelled.
pub fn collision(
    fellow_position: Coord,
    ego_position: Coord,
    fellow_heading: Heading,
    ego_heading: Heading,
) -> Result<bool, DetectorInputError> {
    let fellow = Footprint::from_pose(VehicleClass::Car, fellow_position, fellow_heading)?;
    let ego = Footprint::from_pose(VehicleClass::Bicycle, ego_position, ego_heading)?;
    fellow.overlaps(&ego)
}
