use super::command_interface::CommandInterface;
use crate::common::{parse_id_list, ConsistencyError, ScenarioError, ScenarioResult, SimTime};
use crate::config::ScenarioConfig;
use crate::domains::scenario::{
    EntitySpec, HostKernel, ManagedHost, ObstacleControl, PoseListener, Registry, ScenarioTimer,
};
use crate::domains::sync::{
    ExchangeOutcome, GenericWarning, OpenDoorMessage, ReceivedWirelessMessage, TimestepReply, Transport, Vehicle,
};
use crate::domains::vehicle::{Mobility, VehicleConfiguration};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Allowed difference between requested and replied sync time.
pub const TIME_TOLERANCE_S: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScenarioState {
    Uninitialized,
    Connecting,
    Running,
    TearingDown,
    Stopped,
}

impl ScenarioState {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioState::Uninitialized => "Uninitialized",
            ScenarioState::Connecting => "Connecting",
            ScenarioState::Running => "Running",
            ScenarioState::TearingDown => "TearingDown",
            ScenarioState::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatistics {
    pub completed_cycles: u64,
    pub active_vehicles: usize,
    pub peak_active_vehicles: usize,
    pub vehicles_added: u64,
    pub vehicles_removed: u64,
    pub time_skew_warnings: u64,
}

/// Drives the sync cycle and owns the vehicle registry.
pub struct ScenarioManager<T: Transport> {
    state: ScenarioState,
    command_interface: CommandInterface<T>,
    config: ScenarioConfig,
    registry: Registry,
    obstacles: Option<ObstacleControl>,
    listeners: Vec<Box<dyn PoseListener>>,
    sync_interval: Option<SimTime>,
    statistics: SyncStatistics,
}

impl<T: Transport> ScenarioManager<T> {
    pub fn new(command_interface: CommandInterface<T>, config: ScenarioConfig) -> Self {
        let registry = Registry::new(parse_id_list(&config.ego_vehicle_ids));
        Self {
            state: ScenarioState::Uninitialized,
            command_interface,
            config,
            registry,
            obstacles: None,
            listeners: Vec::new(),
            sync_interval: None,
            statistics: SyncStatistics::default(),
        }
    }

    pub fn with_obstacle_control(mut self, obstacles: ObstacleControl) -> Self {
        self.obstacles = Some(obstacles);
        self
    }

    pub fn add_pose_listener(&mut self, listener: Box<dyn PoseListener>) {
        self.listeners.push(listener);
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ScenarioState::Running | ScenarioState::TearingDown)
    }

    pub fn sync_interval(&self) -> Option<SimTime> {
        self.sync_interval
    }

    pub fn statistics(&self) -> &SyncStatistics {
        &self.statistics
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn managed_hosts(&self) -> &BTreeMap<String, ManagedHost> {
        self.registry.hosts()
    }

    pub fn is_ego_vehicle(&self, external_id: &str) -> bool {
        self.registry.is_ego_vehicle(external_id)
    }

    pub fn obstacles(&self) -> Option<&ObstacleControl> {
        self.obstacles.as_ref()
    }

    pub fn command_interface(&self) -> &CommandInterface<T> {
        &self.command_interface
    }

    pub fn register_generic_warning(&mut self, warning: GenericWarning) {
        self.registry.register_generic_warning(warning);
    }

    pub fn register_received_wireless_message(&mut self, message: ReceivedWirelessMessage) {
        self.registry.register_received_wireless_message(message);
    }

    pub fn register_open_door_message(&mut self, message: OpenDoorMessage) {
        self.registry.register_open_door_message(message);
    }

    /// Schedules the connection callback at time zero.
    pub fn start<K: HostKernel>(&mut self, kernel: &mut K) -> ScenarioResult<()> {
        self.expect_state(ScenarioState::Uninitialized)?;
        info!(
            ego_vehicles = ?self.registry.ego_vehicle_ids(),
            "Scenario manager starting"
        );
        kernel.schedule_at(SimTime::ZERO, ScenarioTimer::ConnectAndStart);
        self.state = ScenarioState::Connecting;
        Ok(())
    }

    pub async fn handle_timer<K: HostKernel>(&mut self, timer: ScenarioTimer, kernel: &mut K) -> ScenarioResult<()> {
        match timer {
            ScenarioTimer::ConnectAndStart => self.connect_and_start(kernel).await,
            ScenarioTimer::Timestep => self.execute_one_timestep(kernel).await,
            ScenarioTimer::Teardown => self.teardown(kernel),
        }
    }

    async fn connect_and_start<K: HostKernel>(&mut self, kernel: &mut K) -> ScenarioResult<()> {
        self.expect_state(ScenarioState::Connecting)?;
        let init = self.command_interface.initialize(self.config.margin).await?;
        let interval = SimTime::from_secs_f64(init.sync_interval_s);
        self.sync_interval = Some(interval);

        if let Some(obstacles) = self.obstacles.as_mut() {
            let added = obstacles.add_supported(&init.polygons);
            info!("Added {} of {} polygons as obstacles", added, init.polygons.len());
        }

        kernel.schedule_at(kernel.now(), ScenarioTimer::Timestep);
        self.state = ScenarioState::Running;
        info!("Connected to EVI, syncing every {}", interval);
        Ok(())
    }

    async fn execute_one_timestep<K: HostKernel>(&mut self, kernel: &mut K) -> ScenarioResult<()> {
        if self.state != ScenarioState::Running {
            debug!(state = self.state.name(), "ignoring timestep");
            return Ok(());
        }
        let interval = self.sync_interval.ok_or(ScenarioError::InvalidState {
            expected: "sync interval",
            actual: self.state.name(),
        })?;
        let now = kernel.now();
        kernel.schedule_at(now + interval, ScenarioTimer::Timestep);

        let request = self.registry.take_pending().into_request(now.as_secs_f64());
        match self.command_interface.exchange_timestep(&request).await? {
            ExchangeOutcome::Teardown => {
                self.state = ScenarioState::TearingDown;
                kernel.schedule_at(now, ScenarioTimer::Teardown);
            }
            ExchangeOutcome::Reply(reply) => self.apply_reply(kernel, now, reply)?,
        }
        Ok(())
    }

    fn apply_reply<K: HostKernel>(&mut self, kernel: &mut K, now: SimTime, reply: TimestepReply) -> ScenarioResult<()> {
        let skew = (now.as_secs_f64() - reply.sync_time_s).abs();
        if skew >= TIME_TOLERANCE_S {
            warn!(
                requested = now.as_secs_f64(),
                replied = reply.sync_time_s,
                "Time mismatch with EVI"
            );
            self.statistics.time_skew_warnings += 1;
        }

        for vehicle in &reply.add_vehicles {
            self.add_vehicle(kernel, vehicle)?;
        }
        for vehicle in &reply.mod_vehicles {
            self.update_vehicle(kernel.now(), vehicle)?;
        }
        for external_id in &reply.del_vehicles {
            self.remove_vehicle(kernel, external_id)?;
        }

        self.statistics.completed_cycles += 1;
        self.statistics.active_vehicles = self.registry.len();
        self.statistics.peak_active_vehicles = self.statistics.peak_active_vehicles.max(self.registry.len());
        debug!(active_vehicles = self.registry.len(), "cycle applied");
        Ok(())
    }

    fn add_vehicle<K: HostKernel>(&mut self, kernel: &mut K, vehicle: &Vehicle) -> ScenarioResult<()> {
        let id = &vehicle.external_id;
        if self.registry.contains(id) {
            return Err(ConsistencyError::DuplicateVehicle(id.clone()).into());
        }
        let interval = self.sync_interval.unwrap_or(SimTime::ZERO);
        let slot = self.registry.slot_for(id);
        let entity = kernel.create_entity(EntitySpec {
            external_id: id.clone(),
            slot,
            module_type: self.config.module_type.clone(),
            display_string: display_string(&self.config.module_display_string, id),
            start_at: kernel.now() + interval,
        })?;
        let mobility = Mobility::new(
            VehicleConfiguration {
                external_id: id.clone(),
                is_ego_vehicle: vehicle.is_ego_vehicle,
                antenna_position_offset: self.config.antenna_position_offset_m,
            },
            vehicle.state(),
        );
        self.registry.insert(id, ManagedHost { entity, slot, mobility })?;
        self.statistics.vehicles_added += 1;
        info!(vehicle_id = %id, slot, is_ego = vehicle.is_ego_vehicle, "Added vehicle");

        self.notify_pose_changed(id, kernel.now());
        Ok(())
    }

    fn update_vehicle(&mut self, now: SimTime, vehicle: &Vehicle) -> ScenarioResult<()> {
        self.registry.update(&vehicle.external_id, vehicle.state())?;
        self.notify_pose_changed(&vehicle.external_id, now);
        Ok(())
    }

    fn remove_vehicle<K: HostKernel>(&mut self, kernel: &mut K, external_id: &str) -> ScenarioResult<()> {
        let host = self.registry.remove(external_id)?;
        kernel.destroy_entity(host.entity)?;
        self.statistics.vehicles_removed += 1;
        info!(vehicle_id = %external_id, "Removed vehicle");
        Ok(())
    }

    fn notify_pose_changed(&mut self, external_id: &str, now: SimTime) {
        for listener in self.listeners.iter_mut() {
            listener.pose_changed(external_id, &mut self.registry, now);
        }
    }

    fn teardown<K: HostKernel>(&mut self, kernel: &mut K) -> ScenarioResult<()> {
        self.expect_state(ScenarioState::TearingDown)?;
        let ids: Vec<String> = self.registry.hosts().keys().cloned().collect();
        info!("Tearing down {} vehicle(s)", ids.len());
        for id in ids {
            self.remove_vehicle(kernel, &id)?;
        }
        if !self.registry.is_empty() {
            return Err(ConsistencyError::RegistryNotEmpty(self.registry.len()).into());
        }
        self.statistics.active_vehicles = 0;
        self.state = ScenarioState::Stopped;
        kernel.end_simulation();
        Ok(())
    }

    fn expect_state(&self, expected: ScenarioState) -> ScenarioResult<()> {
        if self.state != expected {
            return Err(ScenarioError::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }
}

/// Tags the display string with the vehicle id unless it already has a tag.
pub fn display_string(template: &str, external_id: &str) -> String {
    if template.contains("t=") {
        template.to_string()
    } else if template.is_empty() {
        format!("t={external_id}")
    } else {
        format!("{template};t={external_id}")
    }
}
