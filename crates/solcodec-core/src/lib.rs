//! # solcodec-core
//!
//! Core types and primitives shared across all SolCodec crates.
//! The registry, decoders and streaming connection are all built on top of
//! the data model and the [`SchemaRegistry`] trait defined here.

pub mod account;
pub mod address;
pub mod decoder;
pub mod encoding;
pub mod error;
pub mod event;
pub mod instruction;
pub mod schema;
pub mod transaction;
pub mod types;

pub use account::{AccountInfo, DecodedAccount, ParsedAccount};
pub use decoder::{BatchDecodeResult, ErrorMode, ProgressCallback};
pub use error::{BatchDecodeError, DecodeError, RegistryError, StreamError};
pub use event::DecodedEvent;
pub use instruction::{DecodedInstruction, InstructionData, NamedAccount, ParsedInstruction};
pub use schema::{
    sighash, AccountDef, Dialect, Discriminator, EnumVariant, EventDef, FieldDef,
    InstructionAccountDef, InstructionDef, ProgramSchema, SchemaRegistry, TypeDef, VariantFields,
};
pub use transaction::{
    AccountMeta, CompiledInstruction, DecodedInnerGroup, DecodedMeta, DecodedTransaction,
    InnerInstructionGroup, MessageHeader, RawMeta, RawTransaction, TokenBalance,
    TransactionVersion,
};
pub use types::{FieldLayout, NormalizedValue};
