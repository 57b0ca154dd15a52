use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::errors::{OrchestratorError, Result};
use crate::scheduler::model::Operator;

pub const ENV_HOST: &str = "ORCHESTRATOR_HOST";
pub const ENV_PORT: &str = "ORCHESTRATOR_PORT";
pub const ENV_ADDITION: &str = "TIME_ADDITION_MS";
pub const ENV_SUBTRACTION: &str = "TIME_SUBTRACTION_MS";
pub const ENV_MULTIPLICATION: &str = "TIME_MULTIPLICATIONS_MS";
pub const ENV_DIVISION: &str = "TIME_DIVISIONS_MS";
pub const ENV_TASK_LEASE: &str = "TASK_LEASE_MS";
pub const ENV_DEBUG: &str = "ORCHESTRATOR_DEBUG";

/// Simulated duration per operator in milliseconds.
///
/// Purely advisory: the values travel to workers with each task and are never
/// enforced by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDurations {
    pub addition: u64,
    pub subtraction: u64,
    pub multiplication: u64,
    pub division: u64,
}

impl Default for OperationDurations {
    fn default() -> Self {
        Self {
            addition: 1000,
            subtraction: 1000,
            multiplication: 1000,
            division: 1000,
        }
    }
}

impl OperationDurations {
    pub fn for_operator(&self, operator: Operator) -> u64 {
        match operator {
            Operator::Add => self.addition,
            Operator::Sub => self.subtraction,
            Operator::Mul => self.multiplication,
            Operator::Div => self.division,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Interface the HTTP server binds to
    pub host: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Duration hints forwarded to workers
    pub durations: OperationDurations,
    /// How long a dispatched task may stay unreported before it is handed out again.
    /// `None` keeps dispatched tasks in progress until their worker reports.
    pub task_lease: Option<Duration>,
    /// Enable debug-level logging
    pub debug: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            durations: OperationDurations::default(),
            task_lease: None,
            debug: false,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new builder for OrchestratorConfig
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::new()
    }

    /// Load `.env` (if present) and read the configuration from the environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            host: lookup(ENV_HOST).unwrap_or(defaults.host),
            port: parse_or(&lookup, ENV_PORT, defaults.port)?,
            durations: OperationDurations {
                addition: parse_or(&lookup, ENV_ADDITION, defaults.durations.addition)?,
                subtraction: parse_or(&lookup, ENV_SUBTRACTION, defaults.durations.subtraction)?,
                multiplication: parse_or(
                    &lookup,
                    ENV_MULTIPLICATION,
                    defaults.durations.multiplication,
                )?,
                division: parse_or(&lookup, ENV_DIVISION, defaults.durations.division)?,
            },
            task_lease: match parse_or(&lookup, ENV_TASK_LEASE, 0u64)? {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            debug: match lookup(ENV_DEBUG) {
                None => defaults.debug,
                Some(value) => parse_flag(&value).ok_or_else(|| {
                    OrchestratorError::configuration_field(
                        format!("invalid boolean '{}'", value),
                        ENV_DEBUG,
                    )
                })?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(OrchestratorError::configuration_field(
                "port must be greater than 0",
                "port",
            ));
        }
        if self.host.trim().is_empty() {
            return Err(OrchestratorError::configuration_field(
                "host cannot be empty",
                "host",
            ));
        }
        if self.task_lease == Some(Duration::ZERO) {
            return Err(OrchestratorError::configuration_field(
                "task_lease must be greater than 0 when set",
                "task_lease",
            ));
        }
        Ok(())
    }

    /// Full `host:port` address for the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            OrchestratorError::configuration_field(format!("invalid value '{}'", raw), key)
        }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for OrchestratorConfig
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl Default for OrchestratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set all four duration hints at once
    pub fn durations(mut self, durations: OperationDurations) -> Self {
        self.config.durations = durations;
        self
    }

    /// Set the duration hint of a single operator
    pub fn duration(mut self, operator: Operator, millis: u64) -> Self {
        let durations = &mut self.config.durations;
        match operator {
            Operator::Add => durations.addition = millis,
            Operator::Sub => durations.subtraction = millis,
            Operator::Mul => durations.multiplication = millis,
            Operator::Div => durations.division = millis,
        }
        self
    }

    /// Enable re-dispatch of tasks whose worker stays silent longer than `lease`
    pub fn task_lease(mut self, lease: Option<Duration>) -> Self {
        self.config.task_lease = lease;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<OrchestratorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
