//! Agent identity, kinds and the per-kind operation table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::LuxbinError;

/// Sequential identifier of an agent record, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl AgentId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Role of a simulated detection/response unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Flags suspicious activity; the only kind that earns positive outcomes
    Detector,
    /// Executes responses to confirmed threats
    Defender,
    /// Retains signatures of past threats
    Memory,
    /// Dampens over-reaction of the other kinds
    Regulatory,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Detector,
        AgentKind::Defender,
        AgentKind::Memory,
        AgentKind::Regulatory,
    ];

    /// Whether this kind may be the target of `op`
    pub fn allows(self, op: AgentOperation) -> bool {
        match op {
            AgentOperation::PositiveOutcome => self == AgentKind::Detector,
            AgentOperation::ResponseExecuted => self == AgentKind::Defender,
            AgentOperation::NegativeOutcome => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Detector => "detector",
            AgentKind::Defender => "defender",
            AgentKind::Memory => "memory",
            AgentKind::Regulatory => "regulatory",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = LuxbinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "detector" => Ok(AgentKind::Detector),
            "defender" => Ok(AgentKind::Defender),
            "memory" => Ok(AgentKind::Memory),
            "regulatory" => Ok(AgentKind::Regulatory),
            other => Err(LuxbinError::Config {
                message: format!("unknown agent kind: {other}"),
            }),
        }
    }
}

/// Kind-restricted registry operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentOperation {
    PositiveOutcome,
    NegativeOutcome,
    ResponseExecuted,
}

impl fmt::Display for AgentOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentOperation::PositiveOutcome => "record_positive_outcome",
            AgentOperation::NegativeOutcome => "record_negative_outcome",
            AgentOperation::ResponseExecuted => "record_response_executed",
        };
        f.write_str(name)
    }
}
