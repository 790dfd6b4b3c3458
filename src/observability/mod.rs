//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request/transaction ids flow through every log event
//! - Metric updates are cheap; recording never blocks a request
//! - Tracing hooks are separate and opt-in (see the reactor module)

pub mod logging;
pub mod metrics;
