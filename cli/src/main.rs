//! SolCodec CLI: decode Solana programs from the command line.
//!
//! # Commands
//! ```text
//! solcodec inspect-idl    --file <idl.json> [--address <A>]
//! solcodec decode-account --idl-dir <dir> --owner <A> --data <base64>
//! solcodec decode-tx      --idl-dir <dir> --file <tx.json> [--no-default-programs]
//! solcodec encode-ix      --idl-dir <dir> --program <A> --instruction <name> --args <json>
//! solcodec stream         --config <file> --kind transactions|accounts
//! solcodec info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use solcodec_observability::{init_tracing, LogConfig};
use std::path::PathBuf;

mod cmd_decode;
mod cmd_inspect;
mod cmd_stream;

#[derive(Parser)]
#[command(
    name = "solcodec",
    about = "SolCodec CLI: Solana IDL decoder and Yellowstone stream client",
    long_about = "
SolCodec CLI: decode Anchor instructions, accounts and events, plus System,
SPL-Token and SPL-Token-2022 without an IDL. Streams live transactions or
accounts from a Yellowstone (Dragon's Mouth) gRPC endpoint.

ENVIRONMENT VARIABLES:
  SOLCODEC_GRPC_URL    gRPC endpoint (overrides the stream config file)
  SOLCODEC_X_TOKEN     x-token sent with every gRPC call
  RUST_LOG             log filter (overrides --verbose)
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Transactions,
    Accounts,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an IDL and summarize the resulting schema
    #[command(name = "inspect-idl")]
    InspectIdl {
        /// Path to the IDL JSON file
        #[arg(short, long)]
        file: PathBuf,
        /// Program address (default: the IDL's declared address)
        #[arg(long)]
        address: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode account data against the owner's registered layouts
    #[command(name = "decode-account")]
    DecodeAccount {
        /// Directory of IDL JSON files
        #[arg(long, default_value = "./idl")]
        idl_dir: PathBuf,
        /// Owning program address
        #[arg(long)]
        owner: String,
        /// Account data, base64
        #[arg(long)]
        data: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a raw transaction JSON file
    #[command(name = "decode-tx")]
    DecodeTx {
        /// Directory of IDL JSON files
        #[arg(long, default_value = "./idl")]
        idl_dir: PathBuf,
        /// Raw transaction JSON
        #[arg(short, long)]
        file: PathBuf,
        /// Leave System / SPL-Token / SPL-Token-2022 instructions raw
        #[arg(long)]
        no_default_programs: bool,
    },

    /// Encode instruction data from JSON arguments
    #[command(name = "encode-ix")]
    EncodeIx {
        /// Directory of IDL JSON files
        #[arg(long, default_value = "./idl")]
        idl_dir: PathBuf,
        /// Program address
        #[arg(long)]
        program: String,
        /// Instruction name
        #[arg(long)]
        instruction: String,
        /// JSON object of arguments, e.g. '{"amount": "1000", "side": "Bid"}'
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Stream decoded transactions or accounts as JSON lines until Ctrl-C
    Stream {
        /// Stream config (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// What to subscribe to
        #[arg(long, value_enum, default_value_t = Kind::Transactions)]
        kind: Kind,
        /// Print a line whenever a transaction contains this instruction
        #[arg(long = "on-instruction")]
        instructions: Vec<String>,
    },

    /// Show SolCodec build and capability info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Stream { .. }, false) => "info",
        _ => "warn",
    };
    init_tracing(&LogConfig {
        level: level.into(),
        json: cli.log_json,
        ..LogConfig::default()
    });

    match cli.command {
        Commands::InspectIdl { file, address, json } => cmd_inspect::run(&file, address.as_deref(), json),

        Commands::DecodeAccount {
            idl_dir,
            owner,
            data,
            json,
        } => cmd_decode::account(&idl_dir, &owner, &data, json),

        Commands::DecodeTx {
            idl_dir,
            file,
            no_default_programs,
        } => cmd_decode::transaction(&idl_dir, &file, !no_default_programs),

        Commands::EncodeIx {
            idl_dir,
            program,
            instruction,
            args,
        } => cmd_encode_ix(&idl_dir, &program, &instruction, &args),

        Commands::Stream {
            config,
            kind,
            instructions,
        } => cmd_stream::run(&config, kind, &instructions).await,

        Commands::Info => cmd_info(),
    }
}

fn cmd_encode_ix(idl_dir: &std::path::Path, program: &str, instruction: &str, args_json: &str) -> Result<()> {
    let registry = cmd_decode::load_registry(idl_dir)?;
    let args: serde_json::Value = serde_json::from_str(args_json).context("parse args JSON")?;

    let data = solcodec_solana::SolanaDecoder::new(registry).encode_instruction_json(program, instruction, &args)?;
    println!("0x{}", hex::encode(&data));
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("SolCodec v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ Anchor IDLs              (legacy and 0.30+ dialects)");
    println!("  ✓ Instruction decoding     (Borsh, 8-byte discriminators)");
    println!("  ✓ Account decoding         (discriminator-matched layouts)");
    println!("  ✓ Instruction encoding     (IDL layouts, JSON arguments)");
    println!("  ✓ Event decoding           (Program data logs + CPI event instructions)");
    println!("  ✓ Built-in programs        (System, SPL-Token, SPL-Token-2022 + extensions)");
    println!("  ✓ Legacy + v0 transactions (address lookup tables)");
    println!("  ✓ Yellowstone gRPC stream  (x-token, auto-reconnect, live filter updates)");
    println!("  ✓ Parallel batch decode    (Rayon)");
    Ok(())
}
