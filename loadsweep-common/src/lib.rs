use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection-pool floor applied regardless of phase rate; a phase targeting
/// `r` requests/second gets a pool of `max(MIN_POOL_CONNECTIONS, 2 * r)`.
pub const MIN_POOL_CONNECTIONS: usize = 1_000;

/// Error types for loadsweep operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadSweepError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Result type for loadsweep operations
pub type Result<T> = std::result::Result<T, LoadSweepError>;

/// JSON error envelope returned by OpenAI-compatible servers for error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Body of one generation request sent to the target endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub model: String,
    pub input: String,
}

/// One step of the load sweep: hold `target_rps` for `duration_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpec {
    pub target_rps: u32,
    pub duration_secs: u32,
}

impl PhaseSpec {
    pub fn new(target_rps: u32, duration_secs: u32) -> Result<Self> {
        if target_rps == 0 {
            return Err(LoadSweepError::InvalidConfig(
                "target rate must be positive".to_string(),
            ));
        }
        if duration_secs == 0 {
            return Err(LoadSweepError::InvalidConfig(
                "phase duration must be positive".to_string(),
            ));
        }
        Ok(Self { target_rps, duration_secs })
    }

    /// Number of requests the scheduler will issue if the phase runs uninterrupted.
    pub fn planned_requests(&self) -> u64 {
        self.target_rps as u64 * self.duration_secs as u64
    }
}

impl fmt::Display for PhaseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.target_rps, self.duration_secs)
    }
}

impl FromStr for PhaseSpec {
    type Err = LoadSweepError;

    /// Parse the `RATExSECONDS` form used by the CLI, e.g. `100x10`.
    fn from_str(s: &str) -> Result<Self> {
        let (rate, duration) = s.split_once('x').ok_or_else(|| invalid_phase(s))?;
        let target_rps = rate.trim().parse::<u32>().map_err(|_| invalid_phase(s))?;
        let duration_secs = duration.trim().parse::<u32>().map_err(|_| invalid_phase(s))?;
        Self::new(target_rps, duration_secs)
    }
}

fn invalid_phase(s: &str) -> LoadSweepError {
    LoadSweepError::InvalidConfig(format!(
        "phase {s:?} is not of the form RATExSECONDS (e.g. 100x10)"
    ))
}

/// How a single request attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transport returned a well-formed 2xx response.
    Success { status: u16 },
    /// Timeout, connection failure, non-2xx status, or malformed response.
    Failure { error: String },
}

/// One observed outcome of a single request attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Wall-clock time from issue to completion or failure, in milliseconds.
    pub latency_ms: f64,
    pub outcome: Outcome,
    /// Index of the phase that issued the request, assigned at issue time.
    pub phase: usize,
}

impl Sample {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// The failure description, or `None` for successful samples.
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } => Some(error),
        }
    }
}

/// Throughput and latency summary over one slice of the run (a single phase,
/// or every sample for the global summary). Constructed once after the slice's
/// last sample has been recorded; never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStats {
    pub requests_sent: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Wall-clock seconds from the first spawn to the end of the drain.
    pub actual_duration_s: f64,
    pub achieved_rps: f64,
    pub latency_avg_ms: f64,
    pub latency_median_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    /// Up to five distinct failure descriptions, in first-seen order.
    pub error_sample: Vec<String>,
}
