//! Execution strategies for task batches

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, task::invalid_mode};

/// How a batch of tasks is scheduled onto threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// One task after another on the calling thread
    Sequential,
    /// One thread per task
    #[default]
    Concurrent,
    /// One thread per task, at most `max_concurrency` running at once
    Bounded,
    /// `max_concurrency` threads pulling from a shared queue
    WorkerPool,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Concurrent => "concurrent",
            ExecutionMode::Bounded => "bounded",
            ExecutionMode::WorkerPool => "worker-pool",
        }
    }

    /// Whether this mode honours a concurrency limit
    pub fn is_limited(self) -> bool {
        matches!(self, ExecutionMode::Bounded | ExecutionMode::WorkerPool)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = crate::error::RocketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            "bounded" => Ok(ExecutionMode::Bounded),
            "worker-pool" | "workerpool" | "pool" => Ok(ExecutionMode::WorkerPool),
            _ => Err(invalid_mode(s)),
        }
    }
}
