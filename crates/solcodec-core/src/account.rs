//! Raw and decoded account types.

use crate::encoding::base64_bytes;
use crate::types::NormalizedValue;
use serde::{Deserialize, Serialize};

/// Account state as delivered by a stream frame or loaded from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub pubkey: String,
    pub owner: String,
    pub lamports: u64,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub rent_epoch: u64,
    #[serde(default)]
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAccount {
    /// Matched account type name
    pub type_name: String,
    pub fields: NormalizedValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedAccount {
    pub pubkey: String,
    pub owner: String,
    pub lamports: u64,
    pub executable: bool,
    pub rent_epoch: u64,
    pub slot: u64,
    #[serde(with = "base64_bytes")]
    pub raw_data: Vec<u8>,
    pub parsed: ParsedAccount,
}

impl DecodedAccount {
    pub fn new(info: AccountInfo, parsed: ParsedAccount) -> Self {
        Self {
            pubkey: info.pubkey,
            owner: info.owner,
            lamports: info.lamports,
            executable: info.executable,
            rent_epoch: info.rent_epoch,
            slot: info.slot,
            raw_data: info.data,
            parsed,
        }
    }

    pub fn field(&self, name: &str) -> Option<&NormalizedValue> {
        self.parsed.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_info_reads_base64_data() {
        let info: AccountInfo = serde_json::from_value(serde_json::json!({
            "pubkey": "Acc111",
            "owner": "Own111",
            "lamports": 10,
            "data": "AQID"
        }))
        .unwrap();
        assert_eq!(info.data, vec![1, 2, 3]);
        assert!(!info.executable);
        assert_eq!(info.slot, 0);
    }
}
