use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `VEINS_EVI__CONNECTION__PORT=12400`.
pub const ENV_PREFIX: &str = "VEINS_EVI";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub scenario: ScenarioConfig,
    pub collision: CollisionConfig,
    pub obstacles: ObstacleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host_iface: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Comma-separated list of ego vehicle ids.
    pub ego_vehicle_ids: String,
    pub margin: f64,
    pub module_type: String,
    pub module_display_string: String,
    pub antenna_position_offset_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub enabled: bool,
    /// Peer-side vehicle name; matched against hashed external ids.
    pub ego_vehicle: Option<String>,
    pub check_only_stopped_vehicles: bool,
    pub open_door_threshold_m: f64,
    pub collision_test_threshold_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Polygon types turned into obstacles. Empty disables obstacle control.
    pub supported_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Config {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    pub fn evi_address(&self) -> String {
        format!("tcp://{}:{}", self.connection.host_iface, self.connection.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host_iface: "0.0.0.0".to_string(),
            port: 12347,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            ego_vehicle_ids: String::new(),
            margin: 25.0,
            module_type: "veins_evi.Car".to_string(),
            module_display_string: String::new(),
            antenna_position_offset_m: 0.0,
        }
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ego_vehicle: None,
            check_only_stopped_vehicles: true,
            open_door_threshold_m: 4.0,
            collision_test_threshold_m: 1.0,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            supported_types: vec!["building".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
