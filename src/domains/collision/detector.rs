use super::geometry::collision;
use crate::common::{external_id_for, DetectorInputError, SimTime};
use crate::config::CollisionConfig;
use crate::domains::scenario::{PoseListener, Registry};
use crate::domains::sync::OpenDoorMessage;
use crate::domains::vehicle::{Coord, Heading, Mobility, VehicleSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A detected overlap between a fellow vehicle and the ego vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub sim_time: SimTime,
    pub fellow_id: String,
    pub ego_id: String,
    pub fellow_position: Coord,
    pub ego_position: Coord,
    pub fellow_heading: f64,
    pub ego_heading: f64,
    pub distance: f64,
    pub detected_at: DateTime<Utc>,
}

/// Shared record of every collision a detector reported.
#[derive(Debug, Clone, Default)]
pub struct CollisionLog {
    events: Arc<Mutex<Vec<CollisionEvent>>>,
}

impl CollisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CollisionEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, event: CollisionEvent) {
        self.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<CollisionEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Checks the ego vehicle against every other managed vehicle whenever a
/// pose changes, and opens or closes fellow vehicles' doors on the way.
pub struct CollisionDetector {
    config: CollisionConfig,
    ego_external_id: Option<String>,
    log: CollisionLog,
}

impl CollisionDetector {
    pub fn new(config: CollisionConfig) -> Self {
        let ego_external_id = config.ego_vehicle.as_deref().map(external_id_for);
        Self {
            config,
            ego_external_id,
            log: CollisionLog::new(),
        }
    }

    pub fn with_log(mut self, log: CollisionLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> CollisionLog {
        self.log.clone()
    }

    /// External id of the configured ego vehicle, falling back to the first
    /// host flagged as ego.
    fn find_ego(&self, registry: &Registry) -> Option<String> {
        match &self.ego_external_id {
            Some(id) => registry.contains(id).then(|| id.clone()),
            None => registry
                .hosts()
                .iter()
                .find(|(_, host)| host.mobility.is_ego_vehicle())
                .map(|(id, _)| id.clone()),
        }
    }

    pub fn check_for_collision(&mut self, registry: &mut Registry, now: SimTime) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        if registry.len() < 2 {
            return events;
        }
        let Some(ego_id) = self.find_ego(registry) else {
            debug!("no ego vehicle managed, skipping collision check");
            return events;
        };
        let fellow_ids: Vec<String> = registry.hosts().keys().filter(|id| **id != ego_id).cloned().collect();

        for fellow_id in fellow_ids {
            let (Some(ego), Some(fellow)) = (registry.mobility(&ego_id), registry.mobility(&fellow_id)) else {
                continue;
            };
            let ego_position = ego.road_position();
            let ego_heading = ego.heading();
            let fellow_position = fellow.road_position();
            let fellow_heading = fellow.heading();
            let fellow_stopped = fellow.is_stopped();
            let distance = ego_position.distance(&fellow_position);
            // door handling only runs in stopped-only mode
            let manage_doors = self.config.check_only_stopped_vehicles;

            if manage_doors && fellow_stopped && distance < self.config.open_door_threshold_m {
                if let Err(err) = self.set_both_doors(registry, &fellow_id, true) {
                    warn!(vehicle_id = %fellow_id, error = %err, "cannot open doors");
                }
            }

            let tested = fellow_stopped || !self.config.check_only_stopped_vehicles;
            if tested && distance < self.config.collision_test_threshold_m {
                match collision(fellow_position, ego_position, fellow_heading, ego_heading) {
                    Ok(true) => {
                        events.push(self.report(
                            now,
                            &fellow_id,
                            &ego_id,
                            (fellow_position, fellow_heading),
                            (ego_position, ego_heading),
                            distance,
                        ));
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(fellow = %fellow_id, ego = %ego_id, error = %err, "skipping collision test");
                    }
                }
            }

            if manage_doors && !fellow_stopped {
                if let Err(err) = self.close_open_doors(registry, &fellow_id) {
                    warn!(vehicle_id = %fellow_id, error = %err, "cannot close doors");
                }
            }
        }
        events
    }

    fn report(
        &self,
        now: SimTime,
        fellow_id: &str,
        ego_id: &str,
        fellow: (Coord, Heading),
        ego: (Coord, Heading),
        distance: f64,
    ) -> CollisionEvent {
        info!(
            sim_time = %now,
            fellow = %fellow_id,
            ego = %ego_id,
            distance,
            fellow_x = fellow.0.x,
            fellow_y = fellow.0.y,
            ego_x = ego.0.x,
            ego_y = ego.0.y,
            fellow_heading = fellow.1.rad(),
            ego_heading = ego.1.rad(),
            "Actual collision"
        );
        let event = CollisionEvent {
            sim_time: now,
            fellow_id: fellow_id.to_string(),
            ego_id: ego_id.to_string(),
            fellow_position: fellow.0,
            ego_position: ego.0,
            fellow_heading: fellow.1.rad(),
            ego_heading: ego.1.rad(),
            distance,
            detected_at: Utc::now(),
        };
        self.log.push(event.clone());
        event
    }

    fn close_open_doors(&self, registry: &mut Registry, external_id: &str) -> Result<(), DetectorInputError> {
        let mobility = mobility_of(registry, external_id)?;
        let left_open = mobility.signal(VehicleSignal::DoorOpenLeft);
        let right_open = mobility.signal(VehicleSignal::DoorOpenRight);
        if left_open {
            self.set_left_door(registry, external_id, false)?;
        }
        if right_open {
            self.set_right_door(registry, external_id, false)?;
        }
        Ok(())
    }

    /// Returns whether a door command was queued.
    pub fn set_both_doors(&self, registry: &mut Registry, external_id: &str, open: bool) -> Result<bool, DetectorInputError> {
        let mobility = mobility_of(registry, external_id)?;
        let left = mobility.signal(VehicleSignal::DoorOpenLeft);
        let right = mobility.signal(VehicleSignal::DoorOpenRight);
        let needed = if open { !left || !right } else { left || right };
        if !needed {
            return Ok(false);
        }
        self.command_doors(registry, external_id, open, open)?;
        Ok(true)
    }

    pub fn set_left_door(&self, registry: &mut Registry, external_id: &str, open: bool) -> Result<bool, DetectorInputError> {
        let mobility = mobility_of(registry, external_id)?;
        if mobility.signal(VehicleSignal::DoorOpenLeft) == open {
            return Ok(false);
        }
        let right = mobility.signal(VehicleSignal::DoorOpenRight);
        self.command_doors(registry, external_id, open, right)?;
        Ok(true)
    }

    pub fn set_right_door(&self, registry: &mut Registry, external_id: &str, open: bool) -> Result<bool, DetectorInputError> {
        let mobility = mobility_of(registry, external_id)?;
        if mobility.signal(VehicleSignal::DoorOpenRight) == open {
            return Ok(false);
        }
        let left = mobility.signal(VehicleSignal::DoorOpenLeft);
        self.command_doors(registry, external_id, left, open)?;
        Ok(true)
    }

    fn command_doors(&self, registry: &mut Registry, external_id: &str, left: bool, right: bool) -> Result<(), DetectorInputError> {
        let vehicle_id: u32 = external_id
            .parse()
            .map_err(|_| DetectorInputError::NonNumericVehicleId(external_id.to_string()))?;
        registry.register_open_door_message(OpenDoorMessage {
            vehicle_id,
            open_left_door: left,
            open_right_door: right,
        });
        registry.set_door_signal(external_id, VehicleSignal::DoorOpenLeft, left);
        registry.set_door_signal(external_id, VehicleSignal::DoorOpenRight, right);
        debug!(vehicle_id, left, right, "door command queued");
        Ok(())
    }
}

fn mobility_of<'a>(registry: &'a Registry, external_id: &str) -> Result<&'a Mobility, DetectorInputError> {
    registry
        .mobility(external_id)
        .ok_or_else(|| DetectorInputError::UnknownVehicle(external_id.to_string()))
}

impl PoseListener for CollisionDetector {
    fn pose_changed(&mut self, external_id: &str, registry: &mut Registry, now: SimTime) {
        debug!(vehicle_id = %external_id, "pose changed");
        self.check_for_collision(registry, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::scenario::{EntityId, ManagedHost};
    use crate::domains::vehicle::{VehicleConfiguration, VehicleState, VehicleStopState, VehicleStopStateSet};
    use std::f64::consts::PI;

    fn add(registry: &mut Registry, id: &str, is_ego: bool, x: f64, heading: f64, stopped: bool) {
        let stop_states = if stopped {
            VehicleStopStateSet::empty().with(VehicleStopState::Stopped)
        } else {
            VehicleStopStateSet::empty()
        };
        let state = VehicleState {
            road_position: Coord::new(x, 0.0),
            heading: Heading::from_rad(heading),
            stop_states,
            ..VehicleState::default()
        };
        let config = VehicleConfiguration {
            external_id: id.to_string(),
            is_ego_vehicle: is_ego,
            antenna_position_offset: 0.0,
        };
        let host = ManagedHost {
            entity: EntityId(registry.len() as u64 + 1),
            slot: registry.len(),
            mobility: Mobility::new(config, state),
        };
        registry.insert(id, host).unwrap();
    }

    fn move_to(registry: &mut Registry, id: &str, x: f64, heading: f64, stopped: bool) {
        let mut state = registry.mobility(id).unwrap().state().clone();
        state.road_position = Coord::new(x, 0.0);
        state.heading = Heading::from_rad(heading);
        state.stop_states.set(VehicleStopState::Stopped, stopped);
        registry.update(id, state).unwrap();
    }

    #[test]
    fn open_doors_twice_queues_one_command() {
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, "2", false, 3.5, PI, true);
        let detector = CollisionDetector::new(CollisionConfig::default());

        assert!(detector.set_both_doors(&mut registry, "2", true).unwrap());
        assert!(!detector.set_both_doors(&mut registry, "2", true).unwrap());

        let pending = registry.take_pending();
        assert_eq!(
            pending.open_door_messages,
            vec![OpenDoorMessage {
                vehicle_id: 2,
                open_left_door: true,
                open_right_door: true
            }]
        );
        let mobility = registry.mobility("2").unwrap();
        assert!(mobility.signal(VehicleSignal::DoorOpenLeft));
        assert!(mobility.signal(VehicleSignal::DoorOpenRight));
    }

    #[test]
    fn stopped_fellow_nearby_gets_doors_opened_without_collision() {
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, "2", false, 3.5, PI, true);
        let mut detector = CollisionDetector::new(CollisionConfig::default());

        let events = detector.check_for_collision(&mut registry, SimTime::ZERO);
        assert!(events.is_empty());
        assert_eq!(registry.pending().open_door_messages.len(), 1);
    }

    #[test]
    fn driving_off_closes_each_open_door() {
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, "2", false, 3.5, PI, true);
        let mut detector = CollisionDetector::new(CollisionConfig::default());
        detector.check_for_collision(&mut registry, SimTime::ZERO);
        registry.take_pending();

        move_to(&mut registry, "2", 3.5, PI, false);
        // update keeps the locally opened doors since the state was cloned
        detector.check_for_collision(&mut registry, SimTime::ZERO);

        let doors = registry.take_pending().open_door_messages;
        assert_eq!(doors.len(), 2);
        assert_eq!((doors[0].open_left_door, doors[0].open_right_door), (false, true));
        assert_eq!((doors[1].open_left_door, doors[1].open_right_door), (false, false));
    }

    #[test]
    fn overlapping_stopped_car_is_reported() {
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, "2", false, 0.3, 0.0, true);
        let log = CollisionLog::new();
        let mut detector = CollisionDetector::new(CollisionConfig::default()).with_log(log.clone());

        let events = detector.check_for_collision(&mut registry, SimTime::from_secs_f64(0.1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fellow_id, "2");
        assert_eq!(events[0].ego_id, "1");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn moving_fellow_is_only_tested_when_configured() {
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, "2", false, 0.3, 0.0, false);

        let mut only_stopped = CollisionDetector::new(CollisionConfig::default());
        assert!(only_stopped.check_for_collision(&mut registry, SimTime::ZERO).is_empty());

        let mut all = CollisionDetector::new(CollisionConfig {
            check_only_stopped_vehicles: false,
            ..CollisionConfig::default()
        });
        assert_eq!(all.check_for_collision(&mut registry, SimTime::ZERO).len(), 1);
    }

    #[test]
    fn doors_are_left_alone_when_every_fellow_is_tested() {
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, "2", false, 3.5, PI, true);
        let mut detector = CollisionDetector::new(CollisionConfig {
            check_only_stopped_vehicles: false,
            ..CollisionConfig::default()
        });

        assert!(detector.check_for_collision(&mut registry, SimTime::ZERO).is_empty());
        assert!(registry.pending().open_door_messages.is_empty());
        assert!(!registry.mobility("2").unwrap().signal(VehicleSignal::DoorOpenLeft));
    }

    #[test]
    fn configured_ego_name_is_matched_by_hash() {
        let ego_name = "ego-0";
        let ego_id = external_id_for(ego_name);
        let mut registry = Registry::default();
        add(&mut registry, "1", true, 0.0, 0.0, false);
        add(&mut registry, &ego_id, false, 10.0, 0.0, false);
        add(&mut registry, "2", false, 10.3, 0.0, true);
        let mut detector = CollisionDetector::new(CollisionConfig {
            ego_vehicle: Some(ego_name.to_string()),
            ..CollisionConfig::default()
        });

        let events = detector.check_for_collision(&mut registry, SimTime::ZERO);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ego_id, ego_id);
    }

    #[test]
    fn non_numeric_ids_cannot_get_door_commands() {
        let mut registry = Registry::default();
        add(&mut registry, "ego", true, 0.0, 0.0, false);
        add(&mut registry, "car", false, 2.0, 0.0, true);
        let detector = CollisionDetector::new(CollisionConfig::default());

        assert_eq!(
            detector.set_both_doors(&mut registry, "car", true),
            Err(DetectorInputError::NonNumericVehicleId("car".to_string()))
        );
        assert!(registry.pending().is_empty());
    }
}
