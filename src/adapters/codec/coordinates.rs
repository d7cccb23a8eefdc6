use super::wire::{NetworkBoundaries, Point};
use crate::domains::vehicle::{Coord, Heading};

/// Peer degrees (0 = north, clockwise) to local radians (0 = east, counter-clockwise).
pub fn peer_angle_to_heading(degrees: f64) -> Heading {
    Heading::from_rad((90.0 - degrees).to_radians()).normalized()
}

pub fn heading_to_peer_angle(heading: Heading) -> f64 {
    let degrees = 90.0 - heading.rad().to_degrees();
    degrees.rem_euclid(360.0)
}

/// Maps the peer's network coordinates into the local playground and back.
///
/// The local y axis is flipped and everything is shifted by the margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    topleft: Point,
    height: f64,
    margin: f64,
}

impl CoordinateTransform {
    pub fn new(boundaries: NetworkBoundaries, margin: f64) -> Self {
        Self {
            topleft: boundaries.topleft,
            height: boundaries.bottomright.y - boundaries.topleft.y,
            margin,
        }
    }

    pub fn to_local(&self, point: Point) -> Coord {
        Coord::new(
            point.x - self.topleft.x + self.margin,
            self.height - (point.y - self.topleft.y) + self.margin,
        )
    }

    pub fn to_peer(&self, coord: Coord) -> Point {
        Point {
            x: coord.x + self.topleft.x - self.margin,
            y: self.height - (coord.y - self.margin) + self.topleft.y,
        }
    }

    pub fn heading_to_local(&self, degrees: f64) -> Heading {
        peer_angle_to_heading(degrees)
    }

    pub fn heading_to_peer(&self, heading: Heading) -> f64 {
        heading_to_peer_angle(heading)
    }
}
