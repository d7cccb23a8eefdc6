use super::state::*;

/// Offsets below this are treated as "antenna sits on the bumper".
const MIN_ANTENNA_OFFSET: f64 = 0.001;

/// Projects the antenna point `offset` metres behind the front bumper.
pub fn antenna_position(road_position: Coord, heading: Heading, offset: f64) -> Coord {
    if offset < MIN_ANTENNA_OFFSET {
        return road_position;
    }
    let direction = heading.to_coord();
    Coord::new(
        road_position.x - direction.x * offset,
        road_position.y - direction.y * offset,
    )
}

/// Pose model of one managed vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Mobility {
    config: VehicleConfiguration,
    state: VehicleState,
    position: Coord,
}

impl Mobility {
    pub fn new(config: VehicleConfiguration, state: VehicleState) -> Self {
        let position = antenna_position(state.road_position, state.heading, config.antenna_position_offset);
        Self {
            config,
            state,
            position,
        }
    }

    pub fn update(&mut self, state: VehicleState) {
        self.position = antenna_position(
            state.road_position,
            state.heading,
            self.config.antenna_position_offset,
        );
        self.state = state;
    }

    pub fn external_id(&self) -> &str {
        &self.config.external_id
    }

    pub fn is_ego_vehicle(&self) -> bool {
        self.config.is_ego_vehicle
    }

    pub fn configuration(&self) -> &VehicleConfiguration {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Antenna position, i.e. where downstream radio models see the vehicle.
    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn road_position(&self) -> Coord {
        self.state.road_position
    }

    pub fn heading(&self) -> Heading {
        self.state.heading
    }

    pub fn speed(&self) -> f64 {
        self.state.speed
    }

    pub fn signal(&self, signal: VehicleSignal) -> bool {
        self.state.signals.test(signal)
    }

    pub fn stop_state(&self, stop_state: VehicleStopState) -> bool {
        self.state.stop_states.test(stop_state)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_state(VehicleStopState::Stopped)
    }

    pub(crate) fn set_signal(&mut self, signal: VehicleSignal, value: bool) {
        self.state.signals.set(signal, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(offset: f64) -> VehicleConfiguration {
        VehicleConfiguration {
            external_id: "7".to_string(),
            is_ego_vehicle: false,
            antenna_position_offset: offset,
        }
    }

    #[test]
    fn small_offsets_leave_position_untouched() {
        let pos = Coord::new(10.0, 20.0);
        assert_eq!(antenna_position(pos, Heading::from_rad(1.0), 0.0005), pos);
    }

    #[test]
    fn antenna_sits_behind_the_bumper() {
        let pos = antenna_position(Coord::new(10.0, 20.0), Heading::from_rad(0.0), 2.0);
        assert!((pos.x - 8.0).abs() < 1e-12);
        assert!((pos.y - 20.0).abs() < 1e-12);
    }

    #[test]
    fn update_replaces_state_and_recomputes_antenna() {
        let mut mobility = Mobility::new(config(1.0), VehicleState::default());
        let state = VehicleState {
            road_position: Coord::new(5.0, 5.0),
            heading: Heading::from_rad(std::f64::consts::FRAC_PI_2),
            speed: 3.0,
            ..VehicleState::default()
        };
        mobility.update(state.clone());

        assert_eq!(mobility.state(), &state);
        // heading north means the antenna is one metre further down the screen
        assert!((mobility.position().y - 6.0).abs() < 1e-12);
    }
}
