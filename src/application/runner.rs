use super::scenario_manager::{ScenarioManager, ScenarioState, SyncStatistics};
use crate::adapters::outbound::{DiscreteEventKernel, TcpConnection};
use crate::application::CommandInterface;
use crate::common::ScenarioResult;
use crate::config::Config;
use crate::domains::collision::{CollisionDetector, CollisionLog};
use crate::domains::scenario::{HostKernel, ObstacleControl};
use crate::domains::sync::Transport;
use serde::Serialize;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

/// Runs timers until the kernel runs dry, ends, or a fatal error occurs.
pub async fn run_scenario<T: Transport>(
    manager: &mut ScenarioManager<T>,
    kernel: &mut DiscreteEventKernel,
) -> ScenarioResult<()> {
    manager.start(kernel)?;
    while let Some((at, timer)) = kernel.next_timer() {
        debug!(at = %at, ?timer, "timer fired");
        manager.handle_timer(timer, kernel).await?;
    }
    Ok(())
}

/// Builds a manager from configuration around an already bound transport.
pub fn build_manager<T: Transport>(config: &Config, connection: T) -> (ScenarioManager<T>, CollisionLog) {
    let mut manager = ScenarioManager::new(CommandInterface::new(connection), config.scenario.clone());
    if !config.obstacles.supported_types.is_empty() {
        manager = manager.with_obstacle_control(ObstacleControl::new(config.obstacles.supported_types.iter().cloned()));
    }
    let log = CollisionLog::new();
    if config.collision.enabled {
        let detector = CollisionDetector::new(config.collision.clone()).with_log(log.clone());
        manager.add_pose_listener(Box::new(detector));
    }
    (manager, log)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub final_state: ScenarioState,
    pub statistics: SyncStatistics,
    pub collisions: usize,
    pub end_time_s: f64,
}

/// Binds the TCP endpoint and runs one full session with the peer.
pub async fn run_bridge(config: &Config) -> anyhow::Result<RunSummary> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("bridge", %run_id);
    async move {
        let connection = TcpConnection::bind(&config.connection.host_iface, config.connection.port).await?;
        let (mut manager, collisions) = build_manager(config, connection);
        let mut kernel = DiscreteEventKernel::new();
        run_scenario(&mut manager, &mut kernel).await?;

        let summary = RunSummary {
            run_id,
            final_state: manager.state(),
            statistics: manager.statistics().clone(),
            collisions: collisions.len(),
            end_time_s: kernel.now().as_secs_f64(),
        };
        info!(
            cycles = summary.statistics.completed_cycles,
            peak_vehicles = summary.statistics.peak_active_vehicles,
            collisions = summary.collisions,
            "Run finished"
        );
        Ok::<_, anyhow::Error>(summary)
    }
    .instrument(span)
    .await
}
