//! # solcodec-batch
//!
//! Parallel batch decoding for backfills and replays.
//!
//! ## Features
//! - Memory-bounded chunking (default 10,000 items per chunk)
//! - CPU-parallel decoding via Rayon, on the global pool or a sized one
//! - Progress callbacks after each chunk
//! - Three error modes: Skip, Collect, Throw
//!
//! Output order always matches input order.
//!
//! ## Usage
//! ```no_run
//! use solcodec_batch::{BatchEngine, BatchRequest};
//! use solcodec_core::ErrorMode;
//!
//! // let engine = BatchEngine::new(decoder);
//! // let out = engine.decode_accounts(BatchRequest::new(accounts).error_mode(ErrorMode::Collect))?;
//! ```

pub mod engine;
pub mod request;

pub use engine::BatchEngine;
pub use request::BatchRequest;
