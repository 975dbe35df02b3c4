//! # solcodec-solana
//!
//! Solana decoders for SolCodec.
//!
//! ## Implementation notes
//! - Instruction, account and event payloads are Borsh-encoded
//! - Anchor programs prefix payloads with an 8-byte discriminator
//!   (`sha256("<namespace>:<name>")[..8]` or declared in the IDL)
//! - System, SPL-Token and SPL-Token-2022 are decoded without an IDL, using
//!   the programs' own instruction crates
//! - Instruction and event decoding never fail; account decoding does

pub mod account;
pub mod cursor;
pub mod encoder;
pub mod event;
pub mod instruction;
pub mod normalizer;
pub mod programs;
pub mod value;

pub use account::AccountDecoder;
pub use encoder::InstructionEncoder;
pub use event::EventDecoder;
pub use instruction::InstructionDecoder;
pub use normalizer::TransactionNormalizer;

use solcodec_core::{
    account::{AccountInfo, DecodedAccount},
    error::DecodeError,
    schema::SchemaRegistry,
    transaction::{DecodedTransaction, RawTransaction},
    types::NormalizedValue,
};
use std::sync::Arc;

/// One-stop decoder over a shared registry.
#[derive(Clone)]
pub struct SolanaDecoder {
    registry: Arc<dyn SchemaRegistry>,
    normalizer: TransactionNormalizer,
    accounts: AccountDecoder,
}

impl SolanaDecoder {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            normalizer: TransactionNormalizer::new(Arc::clone(&registry)),
            accounts: AccountDecoder::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// Toggle the built-in System / SPL-Token / SPL-Token-2022 decoders.
    pub fn with_default_programs(mut self, enabled: bool) -> Self {
        self.normalizer = self.normalizer.with_default_programs(enabled);
        self
    }

    pub fn registry(&self) -> &Arc<dyn SchemaRegistry> {
        &self.registry
    }

    pub fn decode_transaction(&self, raw: &RawTransaction) -> DecodedTransaction {
        self.normalizer.normalize(raw)
    }

    pub fn decode_account(&self, info: AccountInfo) -> Result<DecodedAccount, DecodeError> {
        self.accounts.decode(info)
    }

    /// Build instruction data for a registered program.
    pub fn encode_instruction(
        &self,
        program: &str,
        instruction: &str,
        args: &NormalizedValue,
    ) -> Result<Vec<u8>, DecodeError> {
        let schema = self
            .registry
            .get(program)
            .ok_or_else(|| DecodeError::UnknownInstruction {
                program: program.to_string(),
            })?;
        InstructionEncoder::new(&schema).encode(instruction, args)
    }

    /// [`Self::encode_instruction`] with arguments as a JSON object.
    pub fn encode_instruction_json(
        &self,
        program: &str,
        instruction: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>, DecodeError> {
        let schema = self
            .registry
            .get(program)
            .ok_or_else(|| DecodeError::UnknownInstruction {
                program: program.to_string(),
            })?;
        InstructionEncoder::new(&schema).encode_json(instruction, args)
    }
}
