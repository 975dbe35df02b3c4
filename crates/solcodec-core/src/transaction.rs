//! Raw and decoded transaction types.
//!
//! [`RawTransaction`] is the canonical input of the normalizer regardless of
//! where it came from (gRPC frame, JSON file). [`DecodedTransaction`] is the
//! normalizer's output.

use crate::encoding::base58_bytes;
use crate::event::DecodedEvent;
use crate::instruction::DecodedInstruction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransactionVersion {
    #[default]
    #[serde(rename = "legacy")]
    Legacy,
    #[serde(rename = "0")]
    V0,
}

impl std::fmt::Display for TransactionVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionVersion::Legacy => write!(f, "legacy"),
            TransactionVersion::V0 => write!(f, "0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// Instruction as it appears in a message: indexes into the account key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    #[serde(with = "base58_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressTableLookup {
    pub account_key: String,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// Inner instructions executed on behalf of one top-level instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerInstructionGroup {
    /// Index of the originating top-level instruction
    pub index: u8,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMeta {
    pub fee: u64,
    pub err: Option<serde_json::Value>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    pub inner_instructions: Vec<InnerInstructionGroup>,
    /// Addresses loaded from lookup tables (version 0 only)
    pub loaded_writable_addresses: Vec<String>,
    pub loaded_readonly_addresses: Vec<String>,
    pub compute_units_consumed: Option<u64>,
}

/// Signer/writable flags for one account key, synthesized from the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Canonical undecoded transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub signatures: Vec<String>,
    #[serde(default)]
    pub version: TransactionVersion,
    pub header: MessageHeader,
    /// Static account keys from the message
    pub account_keys: Vec<String>,
    pub recent_blockhash: String,
    pub instructions: Vec<CompiledInstruction>,
    #[serde(default)]
    pub address_table_lookups: Vec<AddressTableLookup>,
    #[serde(default)]
    pub slot: u64,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: RawMeta,
}

impl RawTransaction {
    /// First signature, the transaction id.
    pub fn signature(&self) -> Option<&str> {
        self.signatures.first().map(String::as_str)
    }

    /// Static keys, then loaded-writable, then loaded-readonly. Loaded
    /// addresses only apply to version 0 messages.
    pub fn all_account_keys(&self) -> Vec<String> {
        let mut keys = self.account_keys.clone();
        if self.version == TransactionVersion::V0 {
            keys.extend(self.meta.loaded_writable_addresses.iter().cloned());
            keys.extend(self.meta.loaded_readonly_addresses.iter().cloned());
        }
        keys
    }

    /// Account metas for [`Self::all_account_keys`], in the same order.
    pub fn account_metas(&self) -> Vec<AccountMeta> {
        let h = &self.header;
        let n_static = self.account_keys.len();
        let signers = h.num_required_signatures as usize;
        let writable_signers = signers.saturating_sub(h.num_readonly_signed_accounts as usize);
        let writable_unsigned_end = n_static.saturating_sub(h.num_readonly_unsigned_accounts as usize);

        let mut metas: Vec<AccountMeta> = self
            .account_keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let is_signer = i < signers;
                let is_writable = if is_signer {
                    i < writable_signers
                } else {
                    i < writable_unsigned_end
                };
                AccountMeta {
                    pubkey: key.clone(),
                    is_signer,
                    is_writable,
                }
            })
            .collect();

        if self.version == TransactionVersion::V0 {
            metas.extend(self.meta.loaded_writable_addresses.iter().map(|k| AccountMeta {
                pubkey: k.clone(),
                is_signer: false,
                is_writable: true,
            }));
            metas.extend(self.meta.loaded_readonly_addresses.iter().map(|k| AccountMeta {
                pubkey: k.clone(),
                is_signer: false,
                is_writable: false,
            }));
        }
        metas
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInnerGroup {
    pub index: u8,
    pub instructions: Vec<DecodedInstruction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedMeta {
    pub fee: u64,
    pub err: Option<serde_json::Value>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    pub inner_instructions: Vec<DecodedInnerGroup>,
    pub compute_units_consumed: Option<u64>,
}

/// Fully decoded transaction, the primary output of the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    pub signatures: Vec<String>,
    pub version: TransactionVersion,
    pub header: MessageHeader,
    pub account_keys: Vec<String>,
    pub recent_blockhash: String,
    pub slot: u64,
    pub observed_at: DateTime<Utc>,
    pub instructions: Vec<DecodedInstruction>,
    pub events: Vec<DecodedEvent>,
    pub meta: DecodedMeta,
}

impl DecodedTransaction {
    pub fn signature(&self) -> Option<&str> {
        self.signatures.first().map(String::as_str)
    }

    /// Top-level instructions in order, then inner instructions in group order.
    pub fn instructions_in_dispatch_order(&self) -> impl Iterator<Item = &DecodedInstruction> {
        self.instructions.iter().chain(
            self.meta
                .inner_instructions
                .iter()
                .flat_map(|g| g.instructions.iter()),
        )
    }

    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DecodedEvent> {
        self.events.iter().filter(move |e| e.name == name)
    }
}
