/// Persisted shape of workflow execution records
///
/// Table and column names are fixed by the deployed runtime and kept as
/// constants so every statement in the migrator refers to the same spelling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CORRELATIONS: &str = "Correlations";
pub const FLOW_NODE_INSTANCES: &str = "FlowNodeInstances";
pub const PROCESS_TOKENS: &str = "ProcessTokens";
pub const EXTERNAL_TASKS: &str = "ExternalTasks";

/// Lifecycle state of a correlation
///
/// Rows written before the state column existed default to `Finished`
/// until the backfill derives their real value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationState {
    Running,
    #[default]
    Finished,
    Error,
}

impl CorrelationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CorrelationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "error" => Ok(Self::Error),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Execution state of a single flow node instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowNodeInstanceState {
    Running,
    Suspended,
    Finished,
    Error,
    Terminated,
}

impl FlowNodeInstanceState {
    /// States that keep a correlation alive
    pub const ACTIVE: [FlowNodeInstanceState; 2] = [Self::Running, Self::Suspended];
    /// States that mark a correlation as failed when nothing is active
    pub const FAILED: [FlowNodeInstanceState; 2] = [Self::Error, Self::Terminated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Terminated => "terminated",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_failed(&self) -> bool {
        Self::FAILED.contains(self)
    }
}

impl fmt::Display for FlowNodeInstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowNodeInstanceState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "suspended" => Ok(Self::Suspended),
            "finished" => Ok(Self::Finished),
            "error" => Ok(Self::Error),
            "terminated" => Ok(Self::Terminated),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// A state string that matches no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state: {0}")]
pub struct UnknownState(pub String);
