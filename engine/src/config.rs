use std::{env, net::SocketAddr, time::Duration};

use crate::carbon::DEFAULT_MILESTONES_M;

const DEFAULT_USER_ID: &str = "test-user-001";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("milestones must be positive and strictly ascending, got {0:?}")]
    UnorderedMilestones(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub user_id: String,
    pub bind_addr: SocketAddr,
    /// Artificial delay of the in-process trip service.
    pub mock_latency: Duration,
    pub milestones: Vec<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            mock_latency: Duration::ZERO,
            milestones: DEFAULT_MILESTONES_M.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Reads `TRIP_USER_ID`, `TRIP_BIND_ADDR`, `TRIP_MOCK_LATENCY_MS` and
    /// `TRIP_MILESTONES`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let user_id = lookup("TRIP_USER_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

        let bind_addr = lookup("TRIP_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                key: "TRIP_BIND_ADDR",
                message: err.to_string(),
            })?;

        let mock_latency = match lookup("TRIP_MOCK_LATENCY_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse().map_err(
                |err: std::num::ParseIntError| ConfigError::Invalid {
                    key: "TRIP_MOCK_LATENCY_MS",
                    message: err.to_string(),
                },
            )?),
            None => Duration::ZERO,
        };

        let milestones = match lookup("TRIP_MILESTONES") {
            Some(raw) => parse_milestones(&raw)?,
            None => DEFAULT_MILESTONES_M.to_vec(),
        };

        Ok(Self {
            user_id,
            bind_addr,
            mock_latency,
            milestones,
        })
    }
}

/// Parses a comma separated list of metres, e.g. `"500,1000,2500"`.
pub fn parse_milestones(raw: &str) -> Result<Vec<f64>, ConfigError> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>().map_err(|err| ConfigError::Invalid {
                key: "TRIP_MILESTONES",
                message: format!("{part:?}: {err}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ascending = values.windows(2).all(|w| w[0] < w[1]);
    let positive = values.iter().all(|v| v.is_finite() && *v > 0.0);
    if values.is_empty() || !ascending || !positive {
        return Err(ConfigError::UnorderedMilestones(values));
    }
    Ok(values)
}
