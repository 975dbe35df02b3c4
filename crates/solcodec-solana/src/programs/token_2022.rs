//! SPL Token-2022: the SPL Token opcodes, opcodes 25–41 whose extension
//! families carry a second-byte sub-instruction, and the token-metadata and
//! token-group interfaces identified by 8-byte name-derived tags.
//!
//! Base opcodes go through `spl_token_2022::instruction::TokenInstruction`,
//! extension families through their own instruction modules, and interface
//! calls through `spl_token_metadata_interface` / `spl_token_group_interface`.

use solcodec_core::{
    address::TOKEN_2022_PROGRAM_ID,
    error::DecodeError,
    instruction::ParsedInstruction,
    schema::{sighash, Discriminator},
    transaction::AccountMeta,
    types::NormalizedValue,
};
use spl_token_2022::{
    extension::{
        cpi_guard::instruction::CpiGuardInstruction,
        default_account_state::instruction::{decode_instruction as decode_default_state, DefaultAccountStateInstruction},
        group_member_pointer::instruction::{self as member_pointer, GroupMemberPointerInstruction},
        group_pointer::instruction::{self as group_pointer, GroupPointerInstruction},
        interest_bearing_mint::{
            instruction::{self as interest, InterestBearingMintInstruction},
            BasisPoints,
        },
        memo_transfer::instruction::RequiredMemoTransfersInstruction,
        metadata_pointer::instruction::{self as metadata_pointer, MetadataPointerInstruction},
        transfer_fee::instruction::TransferFeeInstruction,
        transfer_hook::instruction::{self as transfer_hook, TransferHookInstruction},
    },
    instruction::{decode_instruction_data, decode_instruction_type, TokenInstruction},
};
use spl_token_group_interface::instruction::TokenGroupInstruction;
use spl_token_metadata_interface::{instruction::TokenMetadataInstruction, state::Field};
use std::sync::OnceLock;

use super::{malformed, parsed, variant_name, Args, ProgramDecoder};

const PROGRAM: &str = "spl-token-2022";

/// `GroupMemberPointerExtension`, the last opcode decoded here.
const LAST_OPCODE: u8 = 41;

const METADATA_NS: &str = "spl_token_metadata_interface";
const GROUP_NS: &str = "spl_token_group_interface";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interface {
    Metadata,
    Group,
}

fn interface_tags() -> &'static [(Discriminator, Interface)] {
    static TAGS: OnceLock<Vec<(Discriminator, Interface)>> = OnceLock::new();
    TAGS.get_or_init(|| {
        let metadata = ["initialize_account", "updating_field", "remove_key_ix", "update_the_authority", "emitter"]
            .into_iter()
            .map(|name| (sighash(METADATA_NS, name), Interface::Metadata));
        let group = [
            "initialize_token_group",
            "update_group_max_size",
            "update_authority",
            "initialize_member",
        ]
        .into_iter()
        .map(|name| (sighash(GROUP_NS, name), Interface::Group));
        metadata.chain(group).collect()
    })
}

pub struct Token2022Program;

impl ProgramDecoder for Token2022Program {
    fn program_id(&self) -> &'static str {
        TOKEN_2022_PROGRAM_ID
    }

    fn decode(&self, accounts: &[AccountMeta], data: &[u8]) -> Result<ParsedInstruction, DecodeError> {
        if let Some(head) = data.get(..8) {
            if let Some((_, interface)) = interface_tags().iter().find(|(tag, _)| tag[..] == *head) {
                return match interface {
                    Interface::Metadata => decode_metadata(data, accounts),
                    Interface::Group => decode_group(data, accounts),
                };
            }
        }

        match data.first() {
            Some(&opcode) if opcode <= LAST_OPCODE => {}
            _ => return Ok(ParsedInstruction::unknown()),
        }
        let ix = TokenInstruction::unpack(data).map_err(|e| malformed(PROGRAM, e))?;
        decode_token_instruction(ix, &data[1..], accounts)
    }
}

// ─── Token instructions ───────────────────────────────────────────────────────

/// `rest` is the data after the opcode byte, where extension families keep
/// their sub-instruction.
#[allow(deprecated)]
fn decode_token_instruction(
    ix: TokenInstruction<'_>,
    rest: &[u8],
    accounts: &[AccountMeta],
) -> Result<ParsedInstruction, DecodeError> {
    let ix = match ix {
        TokenInstruction::InitializeMint {
            decimals,
            mint_authority,
            freeze_authority,
        } => parsed(
            "initializeMint",
            &["mint", "rentSysvar"],
            accounts,
            Args::new()
                .u64("decimals", decimals)
                .pubkey("mintAuthority", &mint_authority)
                .coption("freezeAuthority", freeze_authority),
        ),
        TokenInstruction::InitializeAccount => parsed(
            "initializeAccount",
            &["account", "mint", "owner", "rentSysvar"],
            accounts,
            Args::new(),
        ),
        TokenInstruction::InitializeMultisig { m } => {
            parsed("initializeMultisig", &["multisig", "rentSysvar"], accounts, Args::new().u64("m", m))
        }
        TokenInstruction::Transfer { amount } => parsed(
            "transfer",
            &["source", "destination", "authority"],
            accounts,
            Args::new().u64("amount", amount),
        ),
        TokenInstruction::Approve { amount } => parsed(
            "approve",
            &["source", "delegate", "owner"],
            accounts,
            Args::new().u64("amount", amount),
        ),
        TokenInstruction::Revoke => parsed("revoke", &["source", "owner"], accounts, Args::new()),
        TokenInstruction::SetAuthority {
            authority_type,
            new_authority,
        } => parsed(
            "setAuthority",
            &["account", "currentAuthority"],
            accounts,
            Args::new()
                .variant("authorityType", &authority_type)
                .coption("newAuthority", new_authority),
        ),
        TokenInstruction::MintTo { amount } => parsed(
            "mintTo",
            &["mint", "account", "mintAuthority"],
            accounts,
            Args::new().u64("amount", amount),
        ),
        TokenInstruction::Burn { amount } => parsed(
            "burn",
            &["account", "mint", "authority"],
            accounts,
            Args::new().u64("amount", amount),
        ),
        TokenInstruction::CloseAccount => parsed(
            "closeAccount",
            &["account", "destination", "owner"],
            accounts,
            Args::new(),
        ),
        TokenInstruction::FreezeAccount => parsed(
            "freezeAccount",
            &["account", "mint", "freezeAuthority"],
            accounts,
            Args::new(),
        ),
        TokenInstruction::ThawAccount => parsed(
            "thawAccount",
            &["account", "mint", "freezeAuthority"],
            accounts,
            Args::new(),
        ),
        TokenInstruction::TransferChecked { amount, decimals } => parsed(
            "transferChecked",
            &["source", "mint", "destination", "authority"],
            accounts,
            Args::new().u64("amount", amount).u64("decimals", decimals),
        ),
        TokenInstruction::ApproveChecked { amount, decimals } => parsed(
            "approveChecked",
            &["source", "mint", "delegate", "owner"],
            accounts,
            Args::new().u64("amount", amount).u64("decimals", decimals),
        ),
        TokenInstruction::MintToChecked { amount, decimals } => parsed(
            "mintToChecked",
            &["mint", "account", "mintAuthority"],
            accounts,
            Args::new().u64("amount", amount).u64("decimals", decimals),
        ),
        TokenInstruction::BurnChecked { amount, decimals } => parsed(
            "burnChecked",
            &["account", "mint", "authority"],
            accounts,
            Args::new().u64("amount", amount).u64("decimals", decimals),
        ),
        TokenInstruction::InitializeAccount2 { owner } => parsed(
            "initializeAccount2",
            &["account", "mint", "rentSysvar"],
            accounts,
            Args::new().pubkey("owner", &owner),
        ),
        TokenInstruction::SyncNative => parsed("syncNative", &["account"], accounts, Args::new()),
        TokenInstruction::InitializeAccount3 { owner } => parsed(
            "initializeAccount3",
            &["account", "mint"],
            accounts,
            Args::new().pubkey("owner", &owner),
        ),
        TokenInstruction::InitializeMultisig2 { m } => {
            parsed("initializeMultisig2", &["multisig"], accounts, Args::new().u64("m", m))
        }
        TokenInstruction::InitializeMint2 {
            decimals,
            mint_authority,
            freeze_authority,
        } => parsed(
            "initializeMint2",
            &["mint"],
            accounts,
            Args::new()
                .u64("decimals", decimals)
                .pubkey("mintAuthority", &mint_authority)
                .coption("freezeAuthority", freeze_authority),
        ),
        TokenInstruction::GetAccountDataSize { extension_types } => parsed(
            "getAccountDataSize",
            &["mint"],
            accounts,
            Args::new().with("extensionTypes", variant_list(&extension_types)),
        ),
        TokenInstruction::InitializeImmutableOwner => {
            parsed("initializeImmutableOwner", &["account"], accounts, Args::new())
        }
        TokenInstruction::AmountToUiAmount { amount } => {
            parsed("amountToUiAmount", &["mint"], accounts, Args::new().u64("amount", amount))
        }
        TokenInstruction::UiAmountToAmount { ui_amount } => parsed(
            "uiAmountToAmount",
            &["mint"],
            accounts,
            Args::new().str("uiAmount", ui_amount),
        ),
        TokenInstruction::InitializeMintCloseAuthority { close_authority } => parsed(
            "initializeMintCloseAuthority",
            &["mint"],
            accounts,
            Args::new().coption("closeAuthority", close_authority),
        ),
        TokenInstruction::TransferFeeExtension => return transfer_fee(rest, accounts),
        TokenInstruction::ConfidentialTransferExtension => {
            parsed("confidentialTransferExtension", &[], accounts, Args::new())
        }
        TokenInstruction::DefaultAccountStateExtension => return default_account_state(rest, accounts),
        TokenInstruction::Reallocate { extension_types } => parsed(
            "reallocate",
            &["account", "payer", "systemProgram", "owner"],
            accounts,
            Args::new().with("extensionTypes", variant_list(&extension_types)),
        ),
        TokenInstruction::MemoTransferExtension => {
            let Ok(sub) = decode_instruction_type::<RequiredMemoTransfersInstruction>(rest) else {
                return Ok(ParsedInstruction::unknown());
            };
            let name = match sub {
                RequiredMemoTransfersInstruction::Enable => "enableRequiredMemoTransfers",
                RequiredMemoTransfersInstruction::Disable => "disableRequiredMemoTransfers",
            };
            parsed(name, &["account", "owner"], accounts, Args::new())
        }
        TokenInstruction::CreateNativeMint => parsed(
            "createNativeMint",
            &["payer", "nativeMint", "systemProgram"],
            accounts,
            Args::new(),
        ),
        TokenInstruction::InitializeNonTransferableMint => {
            parsed("initializeNonTransferableMint", &["mint"], accounts, Args::new())
        }
        TokenInstruction::InterestBearingMintExtension => return interest_bearing(rest, accounts),
        TokenInstruction::CpiGuardExtension => {
            let Ok(sub) = decode_instruction_type::<CpiGuardInstruction>(rest) else {
                return Ok(ParsedInstruction::unknown());
            };
            let name = match sub {
                CpiGuardInstruction::Enable => "enableCpiGuard",
                CpiGuardInstruction::Disable => "disableCpiGuard",
            };
            parsed(name, &["account", "owner"], accounts, Args::new())
        }
        TokenInstruction::InitializePermanentDelegate { delegate } => parsed(
            "initializePermanentDelegate",
            &["mint"],
            accounts,
            Args::new().pubkey("delegate", &delegate),
        ),
        TokenInstruction::TransferHookExtension => return transfer_hook_ix(rest, accounts),
        TokenInstruction::ConfidentialTransferFeeExtension => {
            parsed("confidentialTransferFeeExtension", &[], accounts, Args::new())
        }
        TokenInstruction::WithdrawExcessLamports => parsed(
            "withdrawExcessLamports",
            &["source", "destination", "authority"],
            accounts,
            Args::new(),
        ),
        TokenInstruction::MetadataPointerExtension => return metadata_pointer_ix(rest, accounts),
        TokenInstruction::GroupPointerExtension => return group_pointer_ix(rest, accounts),
        TokenInstruction::GroupMemberPointerExtension => return member_pointer_ix(rest, accounts),
        _ => ParsedInstruction::unknown(),
    };
    Ok(ix)
}

fn variant_list<T: std::fmt::Debug>(items: &[T]) -> NormalizedValue {
    NormalizedValue::Array(items.iter().map(|t| NormalizedValue::Str(variant_name(t))).collect())
}

// ─── Extension families ───────────────────────────────────────────────────────

/// `TransferFeeInstruction` numbers its sub-instructions 0–5.
const LAST_TRANSFER_FEE_OP: u8 = 5;

fn transfer_fee(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    match rest.first() {
        Some(&sub) if sub <= LAST_TRANSFER_FEE_OP => {}
        _ => return Ok(ParsedInstruction::unknown()),
    }
    let ix = match TransferFeeInstruction::unpack(rest).map_err(|e| malformed(PROGRAM, e))? {
        TransferFeeInstruction::InitializeTransferFeeConfig {
            transfer_fee_config_authority,
            withdraw_withheld_authority,
            transfer_fee_basis_points,
            maximum_fee,
        } => parsed(
            "initializeTransferFeeConfig",
            &["mint"],
            accounts,
            Args::new()
                .coption("transferFeeConfigAuthority", transfer_fee_config_authority)
                .coption("withdrawWithheldAuthority", withdraw_withheld_authority)
                .u64("transferFeeBasisPoints", transfer_fee_basis_points)
                .u64("maximumFee", maximum_fee),
        ),
        TransferFeeInstruction::TransferCheckedWithFee { amount, decimals, fee } => parsed(
            "transferCheckedWithFee",
            &["source", "mint", "destination", "authority"],
            accounts,
            Args::new()
                .u64("amount", amount)
                .u64("decimals", decimals)
                .u64("fee", fee),
        ),
        TransferFeeInstruction::WithdrawWithheldTokensFromMint => parsed(
            "withdrawWithheldTokensFromMint",
            &["mint", "feeRecipient", "withdrawWithheldAuthority"],
            accounts,
            Args::new(),
        ),
        TransferFeeInstruction::WithdrawWithheldTokensFromAccounts { num_token_accounts } => ParsedInstruction::new(
            "withdrawWithheldTokensFromAccounts",
            super::named_accounts(&["mint", "feeRecipient", "withdrawWithheldAuthority"], accounts, "source"),
            Args::new().u64("numTokenAccounts", num_token_accounts).build(),
        ),
        TransferFeeInstruction::HarvestWithheldTokensToMint => ParsedInstruction::new(
            "harvestWithheldTokensToMint",
            super::named_accounts(&["mint"], accounts, "source"),
            Args::new().build(),
        ),
        TransferFeeInstruction::SetTransferFee {
            transfer_fee_basis_points,
            maximum_fee,
        } => parsed(
            "setTransferFee",
            &["mint", "transferFeeConfigAuthority"],
            accounts,
            Args::new()
                .u64("transferFeeBasisPoints", transfer_fee_basis_points)
                .u64("maximumFee", maximum_fee),
        ),
    };
    Ok(ix)
}

fn default_account_state(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    if decode_instruction_type::<DefaultAccountStateInstruction>(rest).is_err() {
        return Ok(ParsedInstruction::unknown());
    }
    let (sub, state) = decode_default_state(rest).map_err(|e| malformed(PROGRAM, e))?;
    let args = Args::new().variant("accountState", &state);
    Ok(match sub {
        DefaultAccountStateInstruction::Initialize => {
            parsed("initializeDefaultAccountState", &["mint"], accounts, args)
        }
        DefaultAccountStateInstruction::Update => {
            parsed("updateDefaultAccountState", &["mint", "freezeAuthority"], accounts, args)
        }
    })
}

fn interest_bearing(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let Ok(sub) = decode_instruction_type::<InterestBearingMintInstruction>(rest) else {
        return Ok(ParsedInstruction::unknown());
    };
    let ix = match sub {
        InterestBearingMintInstruction::Initialize => {
            let data: &interest::InitializeInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "initializeInterestBearingConfig",
                &["mint"],
                accounts,
                Args::new()
                    .nonzero("rateAuthority", data.rate_authority)
                    .with("rate", NormalizedValue::Int(i16::from(data.rate).into())),
            )
        }
        InterestBearingMintInstruction::UpdateRate => {
            let rate: &BasisPoints = decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "updateInterestBearingConfigRate",
                &["mint", "rateAuthority"],
                accounts,
                Args::new().with("rate", NormalizedValue::Int(i16::from(*rate).into())),
            )
        }
    };
    Ok(ix)
}

fn transfer_hook_ix(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let Ok(sub) = decode_instruction_type::<TransferHookInstruction>(rest) else {
        return Ok(ParsedInstruction::unknown());
    };
    let ix = match sub {
        TransferHookInstruction::Initialize => {
            let data: &transfer_hook::InitializeInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "initializeTransferHook",
                &["mint"],
                accounts,
                Args::new()
                    .nonzero("authority", data.authority)
                    .nonzero("programId", data.program_id),
            )
        }
        TransferHookInstruction::Update => {
            let data: &transfer_hook::UpdateInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "updateTransferHook",
                &["mint", "authority"],
                accounts,
                Args::new().nonzero("programId", data.program_id),
            )
        }
    };
    Ok(ix)
}

// Metadata, group and member pointers share one shape:
// Initialize { authority, address } and Update { address }.

fn metadata_pointer_ix(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let Ok(sub) = decode_instruction_type::<MetadataPointerInstruction>(rest) else {
        return Ok(ParsedInstruction::unknown());
    };
    let ix = match sub {
        MetadataPointerInstruction::Initialize => {
            let data: &metadata_pointer::InitializeInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "initializeMetadataPointer",
                &["mint"],
                accounts,
                Args::new()
                    .nonzero("authority", data.authority)
                    .nonzero("metadataAddress", data.metadata_address),
            )
        }
        MetadataPointerInstruction::Update => {
            let data: &metadata_pointer::UpdateInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "updateMetadataPointer",
                &["mint", "authority"],
                accounts,
                Args::new().nonzero("metadataAddress", data.metadata_address),
            )
        }
    };
    Ok(ix)
}

fn group_pointer_ix(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let Ok(sub) = decode_instruction_type::<GroupPointerInstruction>(rest) else {
        return Ok(ParsedInstruction::unknown());
    };
    let ix = match sub {
        GroupPointerInstruction::Initialize => {
            let data: &group_pointer::InitializeInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "initializeGroupPointer",
                &["mint"],
                accounts,
                Args::new()
                    .nonzero("authority", data.authority)
                    .nonzero("groupAddress", data.group_address),
            )
        }
        GroupPointerInstruction::Update => {
            let data: &group_pointer::UpdateInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "updateGroupPointer",
                &["mint", "authority"],
                accounts,
                Args::new().nonzero("groupAddress", data.group_address),
            )
        }
    };
    Ok(ix)
}

fn member_pointer_ix(rest: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let Ok(sub) = decode_instruction_type::<GroupMemberPointerInstruction>(rest) else {
        return Ok(ParsedInstruction::unknown());
    };
    let ix = match sub {
        GroupMemberPointerInstruction::Initialize => {
            let data: &member_pointer::InitializeInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "initializeGroupMemberPointer",
                &["mint"],
                accounts,
                Args::new()
                    .nonzero("authority", data.authority)
                    .nonzero("memberAddress", data.member_address),
            )
        }
        GroupMemberPointerInstruction::Update => {
            let data: &member_pointer::UpdateInstructionData =
                decode_instruction_data(rest).map_err(|e| malformed(PROGRAM, e))?;
            parsed(
                "updateGroupMemberPointer",
                &["mint", "authority"],
                accounts,
                Args::new().nonzero("memberAddress", data.member_address),
            )
        }
    };
    Ok(ix)
}

// ─── Metadata and group interfaces ────────────────────────────────────────────

fn decode_metadata(data: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let ix = match TokenMetadataInstruction::unpack(data).map_err(|e| malformed(PROGRAM, e))? {
        TokenMetadataInstruction::Initialize(init) => parsed(
            "initializeTokenMetadata",
            &["metadata", "updateAuthority", "mint", "mintAuthority"],
            accounts,
            Args::new()
                .str("name", init.name)
                .str("symbol", init.symbol)
                .str("uri", init.uri),
        ),
        TokenMetadataInstruction::UpdateField(update) => {
            let field = match update.field {
                Field::Name => "name".to_string(),
                Field::Symbol => "symbol".to_string(),
                Field::Uri => "uri".to_string(),
                Field::Key(key) => key,
            };
            parsed(
                "updateTokenMetadataField",
                &["metadata", "updateAuthority"],
                accounts,
                Args::new().str("field", field).str("value", update.value),
            )
        }
        TokenMetadataInstruction::RemoveKey(remove) => parsed(
            "removeTokenMetadataKey",
            &["metadata", "updateAuthority"],
            accounts,
            Args::new()
                .with("idempotent", NormalizedValue::Bool(remove.idempotent))
                .str("key", remove.key),
        ),
        TokenMetadataInstruction::UpdateAuthority(update) => parsed(
            "updateTokenMetadataUpdateAuthority",
            &["metadata", "updateAuthority"],
            accounts,
            Args::new().nonzero("newUpdateAuthority", update.new_authority),
        ),
        TokenMetadataInstruction::Emit(emit) => {
            let bound = |v: Option<u64>| v.map_or(NormalizedValue::Null, NormalizedValue::Uint);
            parsed(
                "emitTokenMetadata",
                &["metadata"],
                accounts,
                Args::new()
                    .with("start", bound(emit.start))
                    .with("end", bound(emit.end)),
            )
        }
    };
    Ok(ix)
}

fn decode_group(data: &[u8], accounts: &[AccountMeta]) -> Result<ParsedInstruction, DecodeError> {
    let ix = match TokenGroupInstruction::unpack(data).map_err(|e| malformed(PROGRAM, e))? {
        TokenGroupInstruction::InitializeGroup(init) => parsed(
            "initializeGroup",
            &["group", "mint", "mintAuthority"],
            accounts,
            Args::new()
                .nonzero("updateAuthority", init.update_authority)
                .u64("maxSize", init.max_size),
        ),
        TokenGroupInstruction::UpdateGroupMaxSize(update) => parsed(
            "updateGroupMaxSize",
            &["group", "updateAuthority"],
            accounts,
            Args::new().u64("maxSize", update.max_size),
        ),
        TokenGroupInstruction::UpdateGroupAuthority(update) => parsed(
            "updateGroupAuthority",
            &["group", "updateAuthority"],
            accounts,
            Args::new().nonzero("newAuthority", update.new_authority),
        ),
        TokenGroupInstruction::InitializeMember(_) => parsed(
            "initializeMember",
            &["member", "memberMint", "memberMintAuthority", "group", "groupUpdateAuthority"],
            accounts,
            Args::new(),
        ),
    };
    Ok(ix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::test_support::{key, metas};
    use spl_token_2022::{extension::ExtensionType, solana_program::program_option::COption};
    use spl_token_metadata_interface::instruction::{Emit, Initialize, UpdateField};

    fn decode(data: &[u8], n: usize) -> ParsedInstruction {
        Token2022Program.decode(&metas(n), data).unwrap()
    }

    #[test]
    fn base_opcodes_still_decode() {
        let data = TokenInstruction::MintTo { amount: 9 }.pack();
        assert_eq!(decode(&data, 3).name, "mintTo");
    }

    #[test]
    fn transfer_checked_with_fee() {
        let mut data = vec![26, 1];
        data.extend_from_slice(&1000u64.to_le_bytes());
        data.push(9);
        data.extend_from_slice(&5u64.to_le_bytes());
        let ix = decode(&data, 4);
        assert_eq!(ix.name, "transferCheckedWithFee");
        assert_eq!(
            ix.args.to_json(),
            serde_json::json!({ "amount": 1000, "decimals": 9, "fee": 5 })
        );
    }

    #[test]
    fn close_authority_and_extension_lists() {
        let data = TokenInstruction::InitializeMintCloseAuthority {
            close_authority: COption::Some(key(6)),
        }
        .pack();
        let ix = decode(&data, 1);
        assert_eq!(ix.name, "initializeMintCloseAuthority");
        assert_eq!(
            ix.args.get("closeAuthority"),
            Some(&NormalizedValue::Pubkey(key(6).to_string()))
        );

        let data = TokenInstruction::GetAccountDataSize {
            extension_types: vec![ExtensionType::ImmutableOwner, ExtensionType::MemoTransfer],
        }
        .pack();
        let ix = decode(&data, 1);
        assert_eq!(
            ix.args.to_json(),
            serde_json::json!({ "extensionTypes": ["immutableOwner", "memoTransfer"] })
        );
    }

    #[test]
    fn confidential_families_are_name_only() {
        let ix = decode(&[27, 5, 1, 2, 3], 1);
        assert_eq!(ix.name, "confidentialTransferExtension");
        assert_eq!(ix.args, NormalizedValue::empty());
        assert_eq!(decode(&[37, 0], 1).name, "confidentialTransferFeeExtension");
    }

    #[test]
    fn pointer_families() {
        let mut data = vec![39, 0];
        data.extend_from_slice(&[0u8; 32]);
        data.extend_from_slice(key(7).as_ref());
        let ix = decode(&data, 1);
        assert_eq!(ix.name, "initializeMetadataPointer");
        assert_eq!(ix.args.get("authority"), Some(&NormalizedValue::Null));
        assert_eq!(
            ix.args.get("metadataAddress"),
            Some(&NormalizedValue::Pubkey(key(7).to_string()))
        );

        let mut data = vec![41, 1];
        data.extend_from_slice(key(2).as_ref());
        assert_eq!(decode(&data, 2).name, "updateGroupMemberPointer");
    }

    #[test]
    fn pointer_with_short_payload_is_malformed() {
        let err = Token2022Program.decode(&metas(1), &[40, 0, 1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedInstruction { .. }));
    }

    #[test]
    fn default_account_state() {
        let ix = decode(&[28, 0, 2], 1);
        assert_eq!(ix.name, "initializeDefaultAccountState");
        assert_eq!(ix.args.get("accountState").and_then(|v| v.as_str()), Some("frozen"));
    }

    #[test]
    fn interest_bearing_rate_is_signed() {
        let mut data = vec![33, 1];
        data.extend_from_slice(&(-25i16).to_le_bytes());
        let ix = decode(&data, 2);
        assert_eq!(ix.name, "updateInterestBearingConfigRate");
        assert_eq!(ix.args.get("rate"), Some(&NormalizedValue::Int(-25)));
    }

    #[test]
    fn unknown_sub_instruction() {
        assert_eq!(decode(&[30, 9], 1).name, "unknown");
        assert_eq!(decode(&[26, 9], 1).name, "unknown");
        assert_eq!(decode(&[42], 1).name, "unknown");
    }

    #[test]
    fn token_metadata_initialize() {
        let data = TokenMetadataInstruction::Initialize(Initialize {
            name: "Token".into(),
            symbol: "TKN".into(),
            uri: "https://x.y/meta.json".into(),
        })
        .pack();
        assert_eq!(&data[..8], &sighash(METADATA_NS, "initialize_account"));
        let ix = decode(&data, 4);
        assert_eq!(ix.name, "initializeTokenMetadata");
        assert_eq!(ix.args.get("symbol"), Some(&NormalizedValue::Str("TKN".into())));
        assert_eq!(ix.accounts[2].name, "mint");
    }

    #[test]
    fn token_metadata_update_custom_field() {
        let data = TokenMetadataInstruction::UpdateField(UpdateField {
            field: Field::Key("website".into()),
            value: "https://example.org".into(),
        })
        .pack();
        let ix = decode(&data, 2);
        assert_eq!(ix.name, "updateTokenMetadataField");
        assert_eq!(ix.args.get("field"), Some(&NormalizedValue::Str("website".into())));
    }

    #[test]
    fn token_metadata_emit_bounds() {
        let data = TokenMetadataInstruction::Emit(Emit {
            start: Some(4),
            end: None,
        })
        .pack();
        let ix = decode(&data, 1);
        assert_eq!(ix.args.to_json(), serde_json::json!({ "start": 4, "end": null }));
    }

    #[test]
    fn token_metadata_emit_rejects_bad_option_tag() {
        let mut data = sighash(METADATA_NS, "emitter").to_vec();
        data.push(2);
        data.extend_from_slice(&4u64.to_le_bytes());
        data.push(0);
        let err = Token2022Program.decode(&metas(1), &data).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedInstruction { program: PROGRAM, .. }));
    }

    #[test]
    fn group_interface() {
        let mut data = sighash(GROUP_NS, "initialize_token_group").to_vec();
        data.extend_from_slice(key(8).as_ref());
        data.extend_from_slice(&100u64.to_le_bytes());
        let ix = decode(&data, 3);
        assert_eq!(ix.name, "initializeGroup");
        assert_eq!(ix.args.get("maxSize"), Some(&NormalizedValue::Uint(100)));

        let data = sighash(GROUP_NS, "initialize_member").to_vec();
        assert_eq!(decode(&data, 5).name, "initializeMember");
    }
}
