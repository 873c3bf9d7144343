//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events on stderr)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//! ```
//!
//! Command output goes to stdout, so logs never mix with it. Metrics are
//! recorded against whatever recorder the embedding application installs;
//! without one they are no-ops.

pub mod logging;
pub mod metrics;
