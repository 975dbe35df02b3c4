//! SPL Token program: 1-byte opcode, packed little-endian arguments,
//! unpacked with `spl_token::instruction::TokenInstruction`.

use solcodec_core::{
    address::TOKEN_PROGRAM_ID, error::DecodeError, instruction::ParsedInstruction, transaction::AccountMeta,
};
use spl_token::instruction::TokenInstruction;

use super::{malformed, parsed, Args, ProgramDecoder};

/// `UiAmountToAmount`, the last opcode SPL Token defines.
const LAST_OPCODE: u8 = 24;

pub struct TokenProgram;

impl ProgramDecoder for TokenProgram {
    fn program_id(&self) -> &'static str {
        TOKEN_PROGRAM_ID
    }

    fn decode(&self, accounts: &[AccountMeta], data: &[u8]) -> Result<ParsedInstruction, DecodeError> {
        match data.first() {
            Some(&opcode) if opcode <= LAST_OPCODE => {}
            _ => return Ok(ParsedInstruction::unknown()),
        }
        let ix = TokenInstruction::unpack(data).map_err(|e| malformed("spl-token", e))?;

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
            TokenInstruction::GetAccountDataSize => parsed("getAccountDataSize", &["mint"], accounts, Args::new()),
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
        };
        Ok(ix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::test_support::{key, metas};
    use solcodec_core::types::NormalizedValue;
    use spl_token::{instruction::AuthorityType, solana_program::program_option::COption};

    fn decode(ix: &TokenInstruction<'_>, n_accounts: usize) -> ParsedInstruction {
        TokenProgram.decode(&metas(n_accounts), &ix.pack()).unwrap()
    }

    #[test]
    fn transfer_checked() {
        let ix = decode(&TokenInstruction::TransferChecked { amount: 500, decimals: 6 }, 4);
        assert_eq!(ix.name, "transferChecked");
        assert_eq!(ix.args.to_json(), serde_json::json!({ "amount": 500, "decimals": 6 }));
        assert_eq!(ix.accounts[1].name, "mint");
    }

    #[test]
    fn multisig_signers_follow_named_accounts() {
        let ix = decode(&TokenInstruction::Transfer { amount: 1 }, 5);
        assert_eq!(ix.accounts[3].name, "signer0");
        assert_eq!(ix.accounts[4].name, "signer1");
    }

    #[test]
    fn initialize_mint_with_and_without_freeze_authority() {
        let ix = decode(
            &TokenInstruction::InitializeMint {
                decimals: 9,
                mint_authority: key(4),
                freeze_authority: COption::None,
            },
            2,
        );
        assert_eq!(ix.args.get("freezeAuthority"), Some(&NormalizedValue::Null));

        let ix = decode(
            &TokenInstruction::InitializeMint {
                decimals: 9,
                mint_authority: key(4),
                freeze_authority: COption::Some(key(5)),
            },
            2,
        );
        assert_eq!(
            ix.args.get("freezeAuthority"),
            Some(&NormalizedValue::Pubkey(key(5).to_string()))
        );
    }

    #[test]
    fn set_authority_names_the_type() {
        let ix = decode(
            &TokenInstruction::SetAuthority {
                authority_type: AuthorityType::AccountOwner,
                new_authority: COption::None,
            },
            2,
        );
        assert_eq!(ix.args.get("authorityType").and_then(|v| v.as_str()), Some("accountOwner"));
    }

    #[test]
    fn amount_to_ui_amount_and_back_are_distinct() {
        let ix = decode(&TokenInstruction::AmountToUiAmount { amount: 1_500_000 }, 1);
        assert_eq!(ix.name, "amountToUiAmount");
        assert_eq!(ix.args.get("amount"), Some(&NormalizedValue::Uint(1_500_000)));

        let ix = decode(&TokenInstruction::UiAmountToAmount { ui_amount: "1.5" }, 1);
        assert_eq!(ix.name, "uiAmountToAmount");
        assert_eq!(ix.args.get("uiAmount"), Some(&NormalizedValue::Str("1.5".into())));
        assert!(ix.args.get("amount").is_none());
    }

    #[test]
    fn token_2022_opcodes_are_unknown_here() {
        assert_eq!(TokenProgram.decode(&metas(1), &[25]).unwrap().name, "unknown");
        assert_eq!(TokenProgram.decode(&[], &[]).unwrap().name, "unknown");
    }

    #[test]
    fn truncated_known_opcode_is_an_error() {
        let err = TokenProgram.decode(&metas(3), &[3, 1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedInstruction { program: "spl-token", .. }));
    }
}
