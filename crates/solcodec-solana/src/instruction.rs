//! Instruction decoder.
//!
//! Resolution order for one instruction:
//! 1. built-in decoder for System / SPL-Token / SPL-Token-2022 (when enabled),
//! 2. registered IDL, matched by discriminator prefix,
//! 3. base58 text of the raw bytes.
//!
//! Failures in 1 or 2 fall through to 3. Decoding an instruction never errors.

use solcodec_core::{
    error::DecodeError,
    instruction::{DecodedInstruction, InstructionData, NamedAccount, ParsedInstruction},
    schema::{ProgramSchema, SchemaRegistry},
    transaction::{AccountMeta, CompiledInstruction},
};
use std::sync::Arc;
use tracing::debug;

use crate::cursor::BorshCursor;
use crate::programs::default_decoder_for;
use crate::value::decode_fields;

/// Decodes compiled instructions against the registry and the built-in
/// program tables.
#[derive(Clone)]
pub struct InstructionDecoder {
    registry: Arc<dyn SchemaRegistry>,
    default_programs: bool,
}

impl InstructionDecoder {
    /// Default-program decoding is enabled.
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            default_programs: true,
        }
    }

    pub fn with_default_programs(mut self, enabled: bool) -> Self {
        self.default_programs = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<dyn SchemaRegistry> {
        &self.registry
    }

    pub fn default_programs_enabled(&self) -> bool {
        self.default_programs
    }

    /// Decode one instruction. `accounts` are the instruction's own accounts
    /// in order.
    pub fn decode(&self, program: &str, accounts: &[AccountMeta], data: &[u8]) -> DecodedInstruction {
        let addresses: Vec<String> = accounts.iter().map(|m| m.pubkey.clone()).collect();
        match self.try_decode(program, accounts, data) {
            Ok(Some(parsed)) => DecodedInstruction {
                program_address: program.to_string(),
                account_addresses: addresses,
                data: InstructionData::Parsed(parsed),
            },
            Ok(None) => DecodedInstruction::raw(program, addresses, data),
            Err(e) => {
                debug!(program, error = %e, "instruction decode failed, keeping raw data");
                DecodedInstruction::raw(program, addresses, data)
            }
        }
    }

    /// Strict variant of [`Self::decode`]. `Ok(None)` when no decoder
    /// applies to `program`.
    pub fn try_decode(
        &self,
        program: &str,
        accounts: &[AccountMeta],
        data: &[u8],
    ) -> Result<Option<ParsedInstruction>, DecodeError> {
        if self.default_programs {
            if let Some(builtin) = default_decoder_for(program) {
                return builtin.decode(accounts, data).map(Some);
            }
        }
        match self.registry.get(program) {
            Some(schema) => decode_with_schema(&schema, accounts, data).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a compiled instruction's indexes against the transaction's
    /// account metas, then decode it.
    pub fn decode_compiled(&self, ix: &CompiledInstruction, metas: &[AccountMeta]) -> DecodedInstruction {
        let program = match metas.get(ix.program_id_index as usize) {
            Some(m) => m.pubkey.as_str(),
            None => {
                debug!(
                    index = ix.program_id_index,
                    keys = metas.len(),
                    "program index out of bounds"
                );
                return DecodedInstruction::raw("", Vec::new(), &ix.data);
            }
        };

        let mut accounts = Vec::with_capacity(ix.accounts.len());
        for &i in &ix.accounts {
            match metas.get(i as usize) {
                Some(m) => accounts.push(m.clone()),
                None => {
                    debug!(program, index = i, keys = metas.len(), "account index out of bounds");
                    let known = accounts.iter().map(|m: &AccountMeta| m.pubkey.clone()).collect();
                    return DecodedInstruction::raw(program, known, &ix.data);
                }
            }
        }
        self.decode(program, &accounts, &ix.data)
    }
}

/// Decode `data` against a registered IDL. Accounts past the declared list
/// are named `remaining_<n>`.
pub fn decode_with_schema(
    schema: &ProgramSchema,
    accounts: &[AccountMeta],
    data: &[u8],
) -> Result<ParsedInstruction, DecodeError> {
    let def = schema
        .instruction_for(data)
        .ok_or_else(|| DecodeError::UnknownInstruction {
            program: schema.program_address.clone(),
        })?;

    let mut cur = BorshCursor::new(&data[def.discriminator.len()..]);
    let args = decode_fields(&mut cur, &def.args, &schema.type_definitions)?;

    let named = accounts
        .iter()
        .enumerate()
        .map(|(i, m)| NamedAccount {
            name: def
                .accounts
                .get(i)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| format!("remaining_{}", i - def.accounts.len())),
            pubkey: m.pubkey.clone(),
            is_signer: m.is_signer,
            is_writable: m.is_writable,
        })
        .collect();

    Ok(ParsedInstruction::new(def.name.clone(), named, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::test_support::metas;
    use solcodec_core::{address::SYSTEM_PROGRAM_ID, types::NormalizedValue};
    use solcodec_registry::MemoryRegistry;

    const VAULT: &str = "5UTRCg1MkqZXFGT1iLzAP6y82pgyBJXSQNhQPysi3FfD";
    const DEPOSIT: [u8; 8] = [242, 35, 198, 137, 82, 225, 242, 182];

    fn registry() -> Arc<MemoryRegistry> {
        let reg = MemoryRegistry::new();
        let idl = include_str!("../../../fixtures/idl/vault.json");
        reg.register(VAULT, idl).unwrap();
        Arc::new(reg)
    }

    fn deposit_data(amount: u64) -> Vec<u8> {
        let mut d = DEPOSIT.to_vec();
        d.extend_from_slice(&amount.to_le_bytes());
        d
    }

    #[test]
    fn idl_instruction_names_args_and_accounts() {
        let dec = InstructionDecoder::new(registry());
        let ix = dec.decode(VAULT, &metas(4), &deposit_data(42));
        let parsed = ix.parsed().expect("parsed");
        assert_eq!(parsed.name, "deposit");
        assert_eq!(parsed.args.get("amount"), Some(&NormalizedValue::Uint(42)));
        let names: Vec<_> = parsed.accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["vault", "owner", "system_program", "remaining_0"]);
    }

    #[test]
    fn unknown_program_keeps_raw_base58() {
        let dec = InstructionDecoder::new(registry());
        let ix = dec.decode("Unknown1111111111111111111111111", &metas(2), &[1, 2, 3]);
        assert!(!ix.is_parsed());
        assert_eq!(ix.data, InstructionData::Raw("Ldp".into()));
        assert_eq!(ix.account_addresses.len(), 2);
    }

    #[test]
    fn truncated_args_fall_back_to_raw() {
        let dec = InstructionDecoder::new(registry());
        let mut data = DEPOSIT.to_vec();
        data.push(1);
        let ix = dec.decode(VAULT, &metas(3), &data);
        assert!(!ix.is_parsed());
        assert!(dec.try_decode(VAULT, &metas(3), &data).is_err());
    }

    #[test]
    fn unmatched_discriminator_falls_back_to_raw() {
        let dec = InstructionDecoder::new(registry());
        let ix = dec.decode(VAULT, &metas(1), &[9; 16]);
        assert!(!ix.is_parsed());
    }

    #[test]
    fn default_programs_can_be_disabled() {
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(&5u64.to_le_bytes());

        let dec = InstructionDecoder::new(registry());
        assert_eq!(dec.decode(SYSTEM_PROGRAM_ID, &metas(2), &data).name(), Some("transfer"));

        let dec = dec.with_default_programs(false);
        assert!(!dec.decode(SYSTEM_PROGRAM_ID, &metas(2), &data).is_parsed());
    }

    #[test]
    fn compiled_indexes_resolve_through_metas() {
        let dec = InstructionDecoder::new(registry());
        let mut all = metas(3);
        all.push(AccountMeta {
            pubkey: VAULT.into(),
            is_signer: false,
            is_writable: false,
        });
        let ix = CompiledInstruction {
            program_id_index: 3,
            accounts: vec![1, 0, 2],
            data: deposit_data(7),
        };
        let decoded = dec.decode_compiled(&ix, &all);
        assert_eq!(decoded.program_address, VAULT);
        assert_eq!(decoded.account_addresses[0], all[1].pubkey);
        assert_eq!(decoded.parsed().and_then(|p| p.account("owner")), Some(all[0].pubkey.as_str()));
    }

    #[test]
    fn compiled_index_out_of_bounds_is_raw() {
        let dec = InstructionDecoder::new(registry());
        let ix = CompiledInstruction {
            program_id_index: 0,
            accounts: vec![5],
            data: vec![1],
        };
        let decoded = dec.decode_compiled(&ix, &metas(2));
        assert!(!decoded.is_parsed());
        assert!(decoded.account_addresses.is_empty());
    }
}
