//! Account decoder: owner → schema → 8-byte discriminator → struct.
//!
//! Unlike instructions, account decoding is hard-fail: an unknown owner or
//! an unmatched discriminator is returned as an error.

use solcodec_core::{
    account::{AccountInfo, DecodedAccount, ParsedAccount},
    error::DecodeError,
    schema::SchemaRegistry,
};
use std::sync::Arc;

use crate::cursor::BorshCursor;
use crate::value::decode_fields;

#[derive(Clone)]
pub struct AccountDecoder {
    registry: Arc<dyn SchemaRegistry>,
}

impl AccountDecoder {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Decode a full account snapshot.
    pub fn decode(&self, info: AccountInfo) -> Result<DecodedAccount, DecodeError> {
        let parsed = self.decode_data(&info.owner, &info.data)?;
        Ok(DecodedAccount::new(info, parsed))
    }

    /// Decode raw account bytes owned by `owner`.
    pub fn decode_data(&self, owner: &str, data: &[u8]) -> Result<ParsedAccount, DecodeError> {
        let schema = self
            .registry
            .get(owner)
            .ok_or_else(|| DecodeError::AccountParserNotFound {
                owner: owner.to_string(),
            })?;
        let def = schema
            .account_for(data)
            .ok_or_else(|| DecodeError::DiscriminatorNotFound {
                owner: owner.to_string(),
            })?;

        let mut cur = BorshCursor::new(&data[8..]);
        let fields = decode_fields(&mut cur, &def.fields, &schema.type_definitions)?;
        Ok(ParsedAccount {
            type_name: def.name.clone(),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solcodec_core::types::NormalizedValue;
    use solcodec_registry::MemoryRegistry;

    const VAULT: &str = "5UTRCg1MkqZXFGT1iLzAP6y82pgyBJXSQNhQPysi3FfD";
    const VAULT_TAG: [u8; 8] = [211, 8, 232, 43, 2, 152, 117, 119];

    fn decoder() -> AccountDecoder {
        let reg = MemoryRegistry::new();
        reg.register(VAULT, include_str!("../../../fixtures/idl/vault.json"))
            .unwrap();
        AccountDecoder::new(Arc::new(reg))
    }

    fn vault_bytes(mode: &[u8]) -> Vec<u8> {
        let mut d = VAULT_TAG.to_vec();
        d.extend_from_slice(&[7u8; 32]);
        d.extend_from_slice(&1_000u64.to_le_bytes());
        d.extend_from_slice(mode);
        d.push(254);
        d
    }

    #[test]
    fn decodes_struct_with_enum_field() {
        let mut mode = vec![1];
        mode.extend_from_slice(&(-5i64).to_le_bytes());
        let parsed = decoder().decode_data(VAULT, &vault_bytes(&mode)).unwrap();
        assert_eq!(parsed.type_name, "Vault");
        assert_eq!(parsed.fields.get("balance"), Some(&NormalizedValue::Uint(1_000)));
        assert_eq!(parsed.fields.get("bump"), Some(&NormalizedValue::Uint(254)));
        assert_eq!(
            parsed.fields.get("mode").map(NormalizedValue::to_json),
            Some(serde_json::json!({ "Locked": { "until": -5 } }))
        );
    }

    #[test]
    fn full_snapshot_keeps_metadata() {
        let info = AccountInfo {
            pubkey: "Acc1111111111111111111111111111111".into(),
            owner: VAULT.into(),
            lamports: 5,
            data: vault_bytes(&[0]),
            executable: false,
            rent_epoch: 3,
            slot: 99,
        };
        let acc = decoder().decode(info).unwrap();
        assert_eq!(acc.slot, 99);
        assert_eq!(acc.parsed.type_name, "Vault");
        assert!(acc.field("owner").is_some());
    }

    #[test]
    fn unknown_owner_is_an_error() {
        let err = decoder().decode_data("Other11111111111111111111111111", &[0; 16]).unwrap_err();
        assert!(matches!(err, DecodeError::AccountParserNotFound { .. }));
    }

    #[test]
    fn discriminator_mismatch_is_an_error() {
        let mut data = vault_bytes(&[0]);
        data[7] ^= 0xff;
        let err = decoder().decode_data(VAULT, &data).unwrap_err();
        assert!(matches!(err, DecodeError::DiscriminatorNotFound { .. }));

        let err = decoder().decode_data(VAULT, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DecodeError::DiscriminatorNotFound { .. }));
    }
}
