//! System program: 4-byte LE opcode, bincode argument layout.

use solana_system_interface::instruction::SystemInstruction;
use solcodec_core::{
    address::SYSTEM_PROGRAM_ID, error::DecodeError, instruction::ParsedInstruction, transaction::AccountMeta,
};

use super::{malformed, parsed, Args, ProgramDecoder};

/// `UpgradeNonceAccount`, the last opcode the program defines.
const LAST_OPCODE: u32 = 12;

pub struct SystemProgram;

impl ProgramDecoder for SystemProgram {
    fn program_id(&self) -> &'static str {
        SYSTEM_PROGRAM_ID
    }

    fn decode(&self, accounts: &[AccountMeta], data: &[u8]) -> Result<ParsedInstruction, DecodeError> {
        let opcode = data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes);
        if !matches!(opcode, Some(op) if op <= LAST_OPCODE) {
            return Ok(ParsedInstruction::unknown());
        }
        let ix: SystemInstruction = bincode::deserialize(data).map_err(|e| malformed("system", e))?;

        let ix = match ix {
            SystemInstruction::CreateAccount { lamports, space, owner } => parsed(
                "createAccount",
                &["source", "newAccount"],
                accounts,
                Args::new()
                    .u64("lamports", lamports)
                    .u64("space", space)
                    .pubkey("owner", &owner),
            ),
            SystemInstruction::Assign { owner } => {
                parsed("assign", &["account"], accounts, Args::new().pubkey("owner", &owner))
            }
            SystemInstruction::Transfer { lamports } => parsed(
                "transfer",
                &["source", "destination"],
                accounts,
                Args::new().u64("lamports", lamports),
            ),
            SystemInstruction::CreateAccountWithSeed {
                base,
                seed,
                lamports,
                space,
                owner,
            } => parsed(
                "createAccountWithSeed",
                &["source", "newAccount", "base"],
                accounts,
                Args::new()
                    .pubkey("base", &base)
                    .str("seed", seed)
                    .u64("lamports", lamports)
                    .u64("space", space)
                    .pubkey("owner", &owner),
            ),
            SystemInstruction::AdvanceNonceAccount => parsed(
                "advanceNonceAccount",
                &["nonceAccount", "recentBlockhashesSysvar", "nonceAuthority"],
                accounts,
                Args::new(),
            ),
            SystemInstruction::WithdrawNonceAccount(lamports) => parsed(
                "withdrawNonceAccount",
                &[
                    "nonceAccount",
                    "destination",
                    "recentBlockhashesSysvar",
                    "rentSysvar",
                    "nonceAuthority",
                ],
                accounts,
                Args::new().u64("lamports", lamports),
            ),
            SystemInstruction::InitializeNonceAccount(authority) => parsed(
                "initializeNonceAccount",
                &["nonceAccount", "recentBlockhashesSysvar", "rentSysvar"],
                accounts,
                Args::new().pubkey("nonceAuthority", &authority),
            ),
            SystemInstruction::AuthorizeNonceAccount(authority) => parsed(
                "authorizeNonceAccount",
                &["nonceAccount", "nonceAuthority"],
                accounts,
                Args::new().pubkey("newAuthority", &authority),
            ),
            SystemInstruction::Allocate { space } => {
                parsed("allocate", &["account"], accounts, Args::new().u64("space", space))
            }
            SystemInstruction::AllocateWithSeed {
                base,
                seed,
                space,
                owner,
            } => parsed(
                "allocateWithSeed",
                &["account", "base"],
                accounts,
                Args::new()
                    .pubkey("base", &base)
                    .str("seed", seed)
                    .u64("space", space)
                    .pubkey("owner", &owner),
            ),
            SystemInstruction::AssignWithSeed { base, seed, owner } => parsed(
                "assignWithSeed",
                &["account", "base"],
                accounts,
                Args::new()
                    .pubkey("base", &base)
                    .str("seed", seed)
                    .pubkey("owner", &owner),
            ),
            SystemInstruction::TransferWithSeed {
                lamports,
                from_seed,
                from_owner,
            } => parsed(
                "transferWithSeed",
                &["source", "base", "destination"],
                accounts,
                Args::new()
                    .u64("lamports", lamports)
                    .str("fromSeed", from_seed)
                    .pubkey("fromOwner", &from_owner),
            ),
            SystemInstruction::UpgradeNonceAccount => {
                parsed("upgradeNonceAccount", &["nonceAccount"], accounts, Args::new())
            }
        };
        Ok(ix)
    }
}
