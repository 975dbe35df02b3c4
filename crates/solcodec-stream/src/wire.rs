//! Channel-frame adapter: Yellowstone protobuf updates → canonical raw types.
//!
//! Keys, signatures and blockhashes arrive as raw bytes and are base58-encoded
//! here; indexes arrive as u32 and are narrowed to u8.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use solcodec_core::{
    account::AccountInfo,
    address::encode_pubkey,
    error::DecodeError,
    transaction::{
        AddressTableLookup, CompiledInstruction, InnerInstructionGroup, MessageHeader, RawMeta,
        RawTransaction, TokenBalance, TransactionVersion, UiTokenAmount,
    },
};
use yellowstone_grpc_proto::prelude::{
    SubscribeUpdateAccount, SubscribeUpdateTransaction, TokenBalance as ProtoTokenBalance,
    TransactionStatusMeta,
};

fn b58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

fn pubkey(bytes: &[u8], what: &str) -> Result<String, DecodeError> {
    let key: &[u8; 32] = bytes.try_into().map_err(|_| DecodeError::InvalidFrame {
        reason: format!("{what} is {} bytes, expected 32", bytes.len()),
    })?;
    Ok(encode_pubkey(key))
}

fn index(value: u32, what: &str) -> Result<u8, DecodeError> {
    u8::try_from(value).map_err(|_| DecodeError::InvalidFrame {
        reason: format!("{what} {value} does not fit in u8"),
    })
}

/// Convert a transaction update into the normalizer's input.
pub fn from_channel_frame(
    frame: &SubscribeUpdateTransaction,
    observed_at: DateTime<Utc>,
) -> Result<RawTransaction, DecodeError> {
    let missing = |what: &str| DecodeError::InvalidFrame {
        reason: format!("transaction frame without {what}"),
    };
    let info = frame.transaction.as_ref().ok_or_else(|| missing("transaction info"))?;
    let tx = info.transaction.as_ref().ok_or_else(|| missing("transaction"))?;
    let msg = tx.message.as_ref().ok_or_else(|| missing("message"))?;

    let header = msg
        .header
        .as_ref()
        .map(|h| -> Result<MessageHeader, DecodeError> {
            Ok(MessageHeader {
                num_required_signatures: index(h.num_required_signatures, "numRequiredSignatures")?,
                num_readonly_signed_accounts: index(h.num_readonly_signed_accounts, "numReadonlySignedAccounts")?,
                num_readonly_unsigned_accounts: index(
                    h.num_readonly_unsigned_accounts,
                    "numReadonlyUnsignedAccounts",
                )?,
            })
        })
        .transpose()?
        .unwrap_or_default();

    let account_keys = msg
        .account_keys
        .iter()
        .map(|k| pubkey(k, "account key"))
        .collect::<Result<Vec<_>, _>>()?;

    let instructions = msg
        .instructions
        .iter()
        .map(|ix| {
            Ok(CompiledInstruction {
                program_id_index: index(ix.program_id_index, "programIdIndex")?,
                accounts: ix.accounts.clone(),
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    let address_table_lookups = msg
        .address_table_lookups
        .iter()
        .map(|l| {
            Ok(AddressTableLookup {
                account_key: pubkey(&l.account_key, "lookup table key")?,
                writable_indexes: l.writable_indexes.clone(),
                readonly_indexes: l.readonly_indexes.clone(),
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    let mut signatures: Vec<String> = tx.signatures.iter().map(|s| b58(s)).collect();
    if signatures.is_empty() && !info.signature.is_empty() {
        signatures.push(b58(&info.signature));
    }

    let meta = info.meta.as_ref().map(convert_meta).transpose()?.unwrap_or_default();

    Ok(RawTransaction {
        signatures,
        version: if msg.versioned {
            TransactionVersion::V0
        } else {
            TransactionVersion::Legacy
        },
        header,
        account_keys,
        recent_blockhash: b58(&msg.recent_blockhash),
        instructions,
        address_table_lookups,
        slot: frame.slot,
        observed_at,
        meta,
    })
}

fn convert_meta(meta: &TransactionStatusMeta) -> Result<RawMeta, DecodeError> {
    let inner_instructions = if meta.inner_instructions_none {
        Vec::new()
    } else {
        meta.inner_instructions
            .iter()
            .map(|group| {
                let instructions = group
                    .instructions
                    .iter()
                    .map(|ix| {
                        Ok(CompiledInstruction {
                            program_id_index: index(ix.program_id_index, "inner programIdIndex")?,
                            accounts: ix.accounts.clone(),
                            data: ix.data.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, DecodeError>>()?;
                Ok(InnerInstructionGroup {
                    index: index(group.index, "inner instruction group index")?,
                    instructions,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?
    };

    let balances = |list: &[ProtoTokenBalance]| -> Result<Vec<TokenBalance>, DecodeError> {
        list.iter().map(token_balance).collect()
    };

    Ok(RawMeta {
        fee: meta.fee,
        // bincode-encoded TransactionError, kept opaque
        err: meta
            .err
            .as_ref()
            .map(|e| serde_json::json!({ "raw": STANDARD.encode(&e.err) })),
        pre_balances: meta.pre_balances.clone(),
        post_balances: meta.post_balances.clone(),
        pre_token_balances: balances(&meta.pre_token_balances)?,
        post_token_balances: balances(&meta.post_token_balances)?,
        log_messages: if meta.log_messages_none {
            Vec::new()
        } else {
            meta.log_messages.clone()
        },
        inner_instructions,
        loaded_writable_addresses: meta
            .loaded_writable_addresses
            .iter()
            .map(|k| pubkey(k, "loaded writable address"))
            .collect::<Result<_, _>>()?,
        loaded_readonly_addresses: meta
            .loaded_readonly_addresses
            .iter()
            .map(|k| pubkey(k, "loaded readonly address"))
            .collect::<Result<_, _>>()?,
        compute_units_consumed: meta.compute_units_consumed,
    })
}

fn token_balance(tb: &ProtoTokenBalance) -> Result<TokenBalance, DecodeError> {
    let amount = tb.ui_token_amount.as_ref();
    Ok(TokenBalance {
        account_index: index(tb.account_index, "token balance accountIndex")?,
        mint: tb.mint.clone(),
        owner: Some(tb.owner.clone()).filter(|s| !s.is_empty()),
        program_id: Some(tb.program_id.clone()).filter(|s| !s.is_empty()),
        ui_token_amount: UiTokenAmount {
            amount: amount.map(|a| a.amount.clone()).unwrap_or_default(),
            decimals: amount.map(|a| a.decimals as u8).unwrap_or(0),
            ui_amount_string: amount.map(|a| a.ui_amount_string.clone()).unwrap_or_default(),
        },
    })
}

/// Convert an account update into the account decoder's input.
pub fn account_from_frame(frame: &SubscribeUpdateAccount) -> Result<AccountInfo, DecodeError> {
    let acc = frame.account.as_ref().ok_or_else(|| DecodeError::InvalidFrame {
        reason: "account frame without account info".into(),
    })?;
    Ok(AccountInfo {
        pubkey: pubkey(&acc.pubkey, "account pubkey")?,
        owner: pubkey(&acc.owner, "account owner")?,
        lamports: acc.lamports,
        data: acc.data.clone(),
        executable: acc.executable,
        rent_epoch: acc.rent_epoch,
        slot: frame.slot,
    })
}
