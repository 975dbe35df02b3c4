//! Event decoder: `Program data:` log frames and Anchor CPI event instructions.
//!
//! Log frames carry no program id of their own, so a program-invocation stack
//! built from `Program <id> invoke [n]` / `Program <id> success|failed` lines
//! attributes each frame to the program executing at that point.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use solcodec_core::{
    error::DecodeError,
    event::DecodedEvent,
    schema::{ProgramSchema, SchemaRegistry},
    transaction::RawTransaction,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::cursor::BorshCursor;
use crate::value::decode_fields;

/// Leading tag of Anchor's self-CPI event instruction (`emit_cpi!`).
pub const ANCHOR_EVENT_IX_TAG: [u8; 8] = [0xe4, 0x45, 0xa5, 0x2e, 0x51, 0xcb, 0x9a, 0x1d];

const DATA_PREFIX: &str = "Program data: ";

#[derive(Clone)]
pub struct EventDecoder {
    registry: Arc<dyn SchemaRegistry>,
}

impl EventDecoder {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Decode every event emitted by a transaction. Any failure yields an
    /// empty list.
    pub fn decode(&self, tx: &RawTransaction) -> Vec<DecodedEvent> {
        match self.try_decode(tx) {
            Ok(events) => events,
            Err(e) => {
                debug!(signature = tx.signature().unwrap_or_default(), error = %e, "event decode failed");
                Vec::new()
            }
        }
    }

    pub fn try_decode(&self, tx: &RawTransaction) -> Result<Vec<DecodedEvent>, DecodeError> {
        let keys = tx.all_account_keys();
        let invoked = tx
            .instructions
            .iter()
            .chain(tx.meta.inner_instructions.iter().flat_map(|g| g.instructions.iter()))
            .filter_map(|ix| keys.get(ix.program_id_index as usize));

        // Registered programs that declare at least one event
        let mut candidates: HashMap<&str, Arc<ProgramSchema>> = HashMap::new();
        for program in invoked {
            if candidates.contains_key(program.as_str()) {
                continue;
            }
            if let Some(schema) = self.registry.get(program).filter(|s| s.has_events()) {
                candidates.insert(program.as_str(), schema);
            }
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut events = self.decode_logs(&candidates, &tx.meta.log_messages)?;

        for ix in tx.meta.inner_instructions.iter().flat_map(|g| g.instructions.iter()) {
            let Some(program) = keys.get(ix.program_id_index as usize) else {
                continue;
            };
            let Some(schema) = candidates.get(program.as_str()) else {
                continue;
            };
            if let Some(payload) = ix.data.strip_prefix(&ANCHOR_EVENT_IX_TAG[..]) {
                if let Some(event) = decode_event(schema, payload)? {
                    events.push(event);
                }
            }
        }
        Ok(events)
    }

    fn decode_logs(
        &self,
        candidates: &HashMap<&str, Arc<ProgramSchema>>,
        logs: &[String],
    ) -> Result<Vec<DecodedEvent>, DecodeError> {
        let mut stack: Vec<&str> = Vec::new();
        let mut events = Vec::new();

        for line in logs {
            if let Some(encoded) = line.strip_prefix(DATA_PREFIX) {
                let Some(schema) = stack.last().and_then(|p| candidates.get(p)) else {
                    continue;
                };
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| DecodeError::InvalidFrame {
                        reason: format!("bad base64 in program data: {e}"),
                    })?;
                if let Some(event) = decode_event(schema, &bytes)? {
                    events.push(event);
                }
                continue;
            }

            let Some(rest) = line.strip_prefix("Program ") else {
                continue;
            };
            let mut parts = rest.split_whitespace();
            let (Some(program), Some(verb)) = (parts.next(), parts.next()) else {
                continue;
            };
            match verb {
                "invoke" => stack.push(program),
                "success" => {
                    stack.pop();
                }
                v if v.starts_with("failed") => {
                    stack.pop();
                }
                _ => {}
            }
        }
        Ok(events)
    }
}

/// `Ok(None)` when the first 8 bytes match no event of the program.
fn decode_event(schema: &ProgramSchema, data: &[u8]) -> Result<Option<DecodedEvent>, DecodeError> {
    let Some(def) = schema.event_for(data) else {
        return Ok(None);
    };
    let mut cur = BorshCursor::new(&data[8..]);
    let fields = decode_fields(&mut cur, &def.fields, &schema.type_definitions)?;
    Ok(Some(DecodedEvent {
        program_address: schema.program_address.clone(),
        name: def.name.clone(),
        data: fields,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use solcodec_core::{
        transaction::{CompiledInstruction, InnerInstructionGroup, MessageHeader, RawMeta},
        types::NormalizedValue,
    };
    use solcodec_registry::MemoryRegistry;

    const VAULT: &str = "5UTRCg1MkqZXFGT1iLzAP6y82pgyBJXSQNhQPysi3FfD";
    const OTHER: &str = "Other11111111111111111111111111111";
    const DEPOSIT_EVENT: [u8; 8] = [120, 248, 61, 83, 31, 142, 107, 144];

    fn decoder() -> EventDecoder {
        let reg = MemoryRegistry::new();
        reg.register(VAULT, include_str!("../../../fixtures/idl/vault.json"))
            .unwrap();
        EventDecoder::new(Arc::new(reg))
    }

    fn event_bytes(amount: u64) -> Vec<u8> {
        let mut d = DEPOSIT_EVENT.to_vec();
        d.extend_from_slice(&[3u8; 32]);
        d.extend_from_slice(&amount.to_le_bytes());
        d
    }

    fn tx(logs: Vec<String>, inner: Vec<InnerInstructionGroup>) -> RawTransaction {
        RawTransaction {
            signatures: vec!["sig".into()],
            version: Default::default(),
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 2,
            },
            account_keys: vec!["Payer".into(), VAULT.into(), OTHER.into()],
            recent_blockhash: "hash".into(),
            instructions: vec![
                CompiledInstruction {
                    program_id_index: 1,
                    accounts: vec![0],
                    data: vec![],
                },
                CompiledInstruction {
                    program_id_index: 2,
                    accounts: vec![],
                    data: vec![],
                },
            ],
            address_table_lookups: vec![],
            slot: 1,
            observed_at: Utc::now(),
            meta: RawMeta {
                log_messages: logs,
                inner_instructions: inner,
                ..Default::default()
            },
        }
    }

    fn data_line(bytes: &[u8]) -> String {
        format!("{DATA_PREFIX}{}", STANDARD.encode(bytes))
    }

    #[test]
    fn attributes_frames_to_the_executing_program() {
        let logs = vec![
            format!("Program {VAULT} invoke [1]"),
            format!("Program {OTHER} invoke [2]"),
            // emitted by OTHER: ignored even though the tag matches
            data_line(&event_bytes(1)),
            format!("Program {OTHER} success"),
            data_line(&event_bytes(2)),
            format!("Program {VAULT} success"),
        ];
        let events = decoder().decode(&tx(logs, vec![]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "DepositEvent");
        assert_eq!(events[0].field("amount"), Some(&NormalizedValue::Uint(2)));
    }

    #[test]
    fn failed_programs_pop_the_stack() {
        let logs = vec![
            format!("Program {OTHER} invoke [1]"),
            format!("Program {VAULT} invoke [2]"),
            format!("Program {VAULT} failed: custom program error: 0x1"),
            data_line(&event_bytes(9)),
        ];
        assert!(decoder().decode(&tx(logs, vec![])).is_empty());
    }

    #[test]
    fn non_matching_frames_are_skipped() {
        let logs = vec![
            format!("Program {VAULT} invoke [1]"),
            data_line(&[0u8; 12]),
            data_line(&event_bytes(4)),
            format!("Program {VAULT} success"),
        ];
        assert_eq!(decoder().decode(&tx(logs, vec![])).len(), 1);
    }

    #[test]
    fn bad_base64_empties_the_stage() {
        let logs = vec![
            format!("Program {VAULT} invoke [1]"),
            data_line(&event_bytes(4)),
            format!("{DATA_PREFIX}!!!not-base64"),
        ];
        assert!(decoder().decode(&tx(logs, vec![])).is_empty());
    }

    #[test]
    fn anchor_cpi_events() {
        let mut data = ANCHOR_EVENT_IX_TAG.to_vec();
        data.extend(event_bytes(77));
        let inner = vec![InnerInstructionGroup {
            index: 0,
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![],
                data,
            }],
        }];
        let events = decoder().decode(&tx(vec![], inner));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field("amount"), Some(&NormalizedValue::Uint(77)));
        assert_eq!(events[0].program_address, VAULT);
    }
}
