//! Open-loop phased load generation: pace requests at a target rate per
//! one-second window, sweep a ladder of (rate, duration) phases, and
//! aggregate per-phase and global latency statistics.

pub mod driver;
pub mod issuer;
pub mod phase;
pub mod scheduler;
pub mod sink;
pub mod stats;
pub mod transport;
