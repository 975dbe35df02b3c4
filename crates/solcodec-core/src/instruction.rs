//! Decoded instruction types.
//!
//! Instruction decoding never fails: when no decoder applies, the raw data is
//! carried as base58 text instead of a parsed body.

use crate::types::NormalizedValue;
use serde::Serialize;

/// An instruction account paired with the name its program gives it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedAccount {
    pub name: String,
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedInstruction {
    /// Instruction name, `"unknown"` for unrecognized built-in opcodes
    pub name: String,
    pub accounts: Vec<NamedAccount>,
    /// Decoded arguments, always a struct value
    pub args: NormalizedValue,
}

impl ParsedInstruction {
    pub fn new(name: impl Into<String>, accounts: Vec<NamedAccount>, args: NormalizedValue) -> Self {
        Self {
            name: name.into(),
            accounts,
            args,
        }
    }

    pub fn unknown() -> Self {
        Self::new("unknown", Vec::new(), NormalizedValue::empty())
    }

    /// Look up a named account's address.
    pub fn account(&self, name: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.pubkey.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InstructionData {
    Parsed(ParsedInstruction),
    /// Base58 text of the undecodable bytes
    Raw(String),
}

/// A single decoded instruction, top-level or inner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInstruction {
    pub program_address: String,
    /// Account addresses in instruction order
    pub account_addresses: Vec<String>,
    pub data: InstructionData,
}

impl DecodedInstruction {
    /// Undecoded fallback carrying the raw bytes as base58.
    pub fn raw(program_address: impl Into<String>, account_addresses: Vec<String>, data: &[u8]) -> Self {
        Self {
            program_address: program_address.into(),
            account_addresses,
            data: InstructionData::Raw(bs58::encode(data).into_string()),
        }
    }

    /// The parsed instruction name, if decoding succeeded.
    pub fn name(&self) -> Option<&str> {
        match &self.data {
            InstructionData::Parsed(p) => Some(p.name.as_str()),
            InstructionData::Raw(_) => None,
        }
    }

    pub fn parsed(&self) -> Option<&ParsedInstruction> {
        match &self.data {
            InstructionData::Parsed(p) => Some(p),
            InstructionData::Raw(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.data, InstructionData::Parsed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_fallback_keeps_addresses() {
        let ix = DecodedInstruction::raw("Prog111", vec!["A".into(), "B".into()], &[1, 2, 3]);
        assert_eq!(ix.account_addresses, vec!["A", "B"]);
        assert_eq!(ix.data, InstructionData::Raw("Ldp".into()));
        assert!(ix.name().is_none());
    }

    #[test]
    fn raw_data_serializes_as_plain_string() {
        let ix = DecodedInstruction::raw("Prog111", vec![], &[1, 2, 3]);
        let json = serde_json::to_value(&ix).unwrap();
        assert_eq!(json["data"], "Ldp");
        assert_eq!(json["programAddress"], "Prog111");
    }

    #[test]
    fn unknown_has_empty_args() {
        let p = ParsedInstruction::unknown();
        assert_eq!(p.name, "unknown");
        assert_eq!(p.args, NormalizedValue::empty());
    }
}
