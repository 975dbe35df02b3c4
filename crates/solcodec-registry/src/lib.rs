//! # solcodec-registry
//!
//! Program schema registry for SolCodec.
//!
//! Parses Anchor IDL documents in either dialect into
//! `solcodec_core::ProgramSchema` and stores them by program address.
//! The public-facing read API is the `SchemaRegistry` trait from `solcodec-core`.

pub mod idl;
pub mod memory;

pub use idl::IdlParser;
pub use memory::MemoryRegistry;
