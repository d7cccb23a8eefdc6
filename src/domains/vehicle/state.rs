use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::marker::PhantomData;

/// Planar position in local simulation coordinates (y axis points down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Coord) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Heading in radians, 0 pointing east, counter-clockwise positive as seen on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading(f64);

impl Heading {
    pub fn from_rad(rad: f64) -> Self {
        Heading(rad)
    }

    pub fn rad(&self) -> f64 {
        self.0
    }

    /// Unit vector in local coordinates. The y component is negated because
    /// the local y axis points down.
    pub fn to_coord(&self) -> Coord {
        Coord::new(self.0.cos(), -self.0.sin())
    }

    /// Same heading, wrapped into `[-pi, pi)`.
    pub fn normalized(&self) -> Self {
        let mut rad = self.0 % (2.0 * PI);
        if rad < -PI {
            rad += 2.0 * PI;
        }
        if rad >= PI {
            rad -= 2.0 * PI;
        }
        Heading(rad)
    }
}

/// A single named bit of a [`FlagSet`].
pub trait Flag: Copy + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn bit(self) -> u32;
}

/// Fixed-size set of flags, stored as the bit sum the peer exchanges.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct FlagSet<F> {
    bits: u32,
    #[serde(skip)]
    _flag: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    pub fn empty() -> Self {
        Self::from_bits(0)
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            bits,
            _flag: PhantomData,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn test(&self, flag: F) -> bool {
        self.bits & flag.bit() != 0
    }

    pub fn set(&mut self, flag: F, value: bool) {
        if value {
            self.bits |= flag.bit();
        } else {
            self.bits &= !flag.bit();
        }
    }

    pub fn with(mut self, flag: F) -> Self {
        self.set(flag, true);
        self
    }

    /// Flags that are set, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(move |flag| self.test(*flag))
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |set, flag| set.with(flag))
    }
}

impl<F: Flag> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleSignal {
    BlinkerRight,
    BlinkerLeft,
    BlinkerEmergency,
    BrakeLight,
    FrontLight,
    FogLight,
    HighBeam,
    BackDrive,
    Wiper,
    DoorOpenLeft,
    DoorOpenRight,
    EmergencyBlue,
    EmergencyRed,
    EmergencyYellow,
}

impl Flag for VehicleSignal {
    const ALL: &'static [Self] = &[
        VehicleSignal::BlinkerRight,
        VehicleSignal::BlinkerLeft,
        VehicleSignal::BlinkerEmergency,
        VehicleSignal::BrakeLight,
        VehicleSignal::FrontLight,
        VehicleSignal::FogLight,
        VehicleSignal::HighBeam,
        VehicleSignal::BackDrive,
        VehicleSignal::Wiper,
        VehicleSignal::DoorOpenLeft,
        VehicleSignal::DoorOpenRight,
        VehicleSignal::EmergencyBlue,
        VehicleSignal::EmergencyRed,
        VehicleSignal::EmergencyYellow,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStopState {
    Stopped,
    Parking,
    Triggered,
    ContainerTriggered,
    AtBusStop,
    AtContainerStop,
    AtChargingStation,
    AtParkingArea,
}

impl Flag for VehicleStopState {
    const ALL: &'static [Self] = &[
        VehicleStopState::Stopped,
        VehicleStopState::Parking,
        VehicleStopState::Triggered,
        VehicleStopState::ContainerTriggered,
        VehicleStopState::AtBusStop,
        VehicleStopState::AtContainerStop,
        VehicleStopState::AtChargingStation,
        VehicleStopState::AtParkingArea,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

pub type VehicleSignalSet = FlagSet<VehicleSignal>;
pub type VehicleStopStateSet = FlagSet<VehicleStopState>;

/// Last known kinematic state of a vehicle. Replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// Middle of the front bumper.
    pub road_position: Coord,
    pub heading: Heading,
    pub speed: f64,
    pub road_id: String,
    pub signals: VehicleSignalSet,
    pub stop_states: VehicleStopStateSet,
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-vehicle settings fixed at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfiguration {
    pub external_id: String,
    pub is_ego_vehicle: bool,
    pub antenna_position_offset: f64,
}
