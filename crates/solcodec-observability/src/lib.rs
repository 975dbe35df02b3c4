//! # solcodec-observability
//!
//! OpenTelemetry metrics and structured logging for SolCodec.
//!
//! ## Built-in metrics
//! - `solcodec.frames_received`     : counter, tagged with stream kind
//! - `solcodec.transactions_decoded`: counter
//! - `solcodec.accounts_decoded`    : counter, tagged with account type
//! - `solcodec.decode_errors`       : counter, tagged with stage
//! - `solcodec.reconnections`       : counter, tagged with endpoint
//! - `solcodec.decode_latency_ms`   : histogram, tagged with stream kind
//!
//! ## Structured logging
//! Text or JSON logs through `tracing-subscriber`, with a global level and
//! per-crate overrides.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::SolCodecMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
