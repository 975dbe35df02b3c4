//! Transaction normalizer: `RawTransaction` → `DecodedTransaction`.
//!
//! Legacy and version-0 messages come out in the same shape: the account key
//! list is always static ∪ loaded-writable ∪ loaded-readonly, and inner
//! instructions stay grouped by their originating top-level index.

use solcodec_core::{
    schema::SchemaRegistry,
    transaction::{DecodedInnerGroup, DecodedMeta, DecodedTransaction, RawTransaction},
};
use std::sync::Arc;
use tracing::trace;

use crate::event::EventDecoder;
use crate::instruction::InstructionDecoder;

#[derive(Clone)]
pub struct TransactionNormalizer {
    instructions: InstructionDecoder,
    events: EventDecoder,
}

impl TransactionNormalizer {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            instructions: InstructionDecoder::new(Arc::clone(&registry)),
            events: EventDecoder::new(registry),
        }
    }

    pub fn with_default_programs(mut self, enabled: bool) -> Self {
        self.instructions = self.instructions.with_default_programs(enabled);
        self
    }

    pub fn instruction_decoder(&self) -> &InstructionDecoder {
        &self.instructions
    }

    pub fn normalize(&self, raw: &RawTransaction) -> DecodedTransaction {
        let metas = raw.account_metas();

        let instructions = raw
            .instructions
            .iter()
            .map(|ix| self.instructions.decode_compiled(ix, &metas))
            .collect();

        let inner_instructions = raw
            .meta
            .inner_instructions
            .iter()
            .map(|group| DecodedInnerGroup {
                index: group.index,
                instructions: group
                    .instructions
                    .iter()
                    .map(|ix| self.instructions.decode_compiled(ix, &metas))
                    .collect(),
            })
            .collect();

        let events = self.events.decode(raw);
        trace!(
            signature = raw.signature().unwrap_or_default(),
            instructions = raw.instructions.len(),
            events = events.len(),
            "transaction normalized"
        );

        let m = &raw.meta;
        DecodedTransaction {
            signatures: raw.signatures.clone(),
            version: raw.version,
            header: raw.header,
            account_keys: metas.into_iter().map(|meta| meta.pubkey).collect(),
            recent_blockhash: raw.recent_blockhash.clone(),
            slot: raw.slot,
            observed_at: raw.observed_at,
            instructions,
            events,
            meta: DecodedMeta {
                fee: m.fee,
                err: m.err.clone(),
                pre_balances: m.pre_balances.clone(),
                post_balances: m.post_balances.clone(),
                pre_token_balances: m.pre_token_balances.clone(),
                post_token_balances: m.post_token_balances.clone(),
                log_messages: m.log_messages.clone(),
                inner_instructions,
                compute_units_consumed: m.compute_units_consumed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use solcodec_core::{
        address::SYSTEM_PROGRAM_ID,
        transaction::{CompiledInstruction, InnerInstructionGroup, MessageHeader, RawMeta, TransactionVersion},
    };
    use solcodec_registry::MemoryRegistry;

    fn transfer_data(lamports: u64) -> Vec<u8> {
        let mut d = 2u32.to_le_bytes().to_vec();
        d.extend_from_slice(&lamports.to_le_bytes());
        d
    }

    fn raw(version: TransactionVersion) -> RawTransaction {
        RawTransaction {
            signatures: vec!["sig1".into()],
            version,
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec!["Payer".into(), "Dest".into(), SYSTEM_PROGRAM_ID.into()],
            recent_blockhash: "hash".into(),
            instructions: vec![CompiledInstruction {
                program_id_index: 2,
                accounts: vec![0, 1],
                data: transfer_data(10),
            }],
            address_table_lookups: vec![],
            slot: 7,
            observed_at: Utc::now(),
            meta: RawMeta {
                fee: 5000,
                inner_instructions: vec![InnerInstructionGroup {
                    index: 0,
                    instructions: vec![CompiledInstruction {
                        program_id_index: 2,
                        accounts: vec![1, 3],
                        data: transfer_data(3),
                    }],
                }],
                loaded_writable_addresses: vec!["Loaded".into()],
                ..Default::default()
            },
        }
    }

    fn normalizer() -> TransactionNormalizer {
        TransactionNormalizer::new(Arc::new(MemoryRegistry::new()))
    }

    #[test]
    fn v0_keys_include_loaded_addresses() {
        let tx = normalizer().normalize(&raw(TransactionVersion::V0));
        assert_eq!(tx.account_keys, vec!["Payer", "Dest", SYSTEM_PROGRAM_ID, "Loaded"]);
        let inner = &tx.meta.inner_instructions[0].instructions[0];
        assert_eq!(inner.name(), Some("transfer"));
        assert_eq!(inner.account_addresses, vec!["Dest", "Loaded"]);
    }

    #[test]
    fn legacy_inner_reference_to_loaded_key_is_raw() {
        let tx = normalizer().normalize(&raw(TransactionVersion::Legacy));
        assert_eq!(tx.account_keys.len(), 3);
        assert!(!tx.meta.inner_instructions[0].instructions[0].is_parsed());
        assert_eq!(tx.instructions[0].name(), Some("transfer"));
    }

    #[test]
    fn meta_and_envelope_are_carried() {
        let tx = normalizer().normalize(&raw(TransactionVersion::V0));
        assert_eq!(tx.signature(), Some("sig1"));
        assert_eq!(tx.slot, 7);
        assert_eq!(tx.meta.fee, 5000);
        assert_eq!(tx.instructions_in_dispatch_order().count(), 2);
        assert!(tx.events.is_empty());
    }
}
