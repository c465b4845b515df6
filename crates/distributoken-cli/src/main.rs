//! distributoken
//!
//! Command-line host for distributoken ledgers. Each instance lives in a local
//! state database; owner operations are authorized by revealing the current
//! secret of a hash chain and committing to the next one.
//!
//! Usage:
//!   distributoken keygen       [--count <n>]
//!   distributoken deploy       --caller <addr> [--symbol ..] [--description ..] [--hashed-secret ..] [--checksum ..] [--params <json>] [--config <json>]
//!   distributoken gift         --caller <addr> --instance <id> --secret .. --next-hash .. --next-checksum .. --to <addr> --value <n> [--memo ..]
//!   distributoken distribute   --caller <addr> --instance <id> --secret .. --next-hash .. --next-checksum .. --entry <addr>:<n>[:<memo>]...
//!   distributoken set-owner    --caller <addr> --instance <id> --secret .. --next-hash .. --next-checksum .. --new-owner <addr>
//!   distributoken set-sunset   --caller <addr> --instance <id> --secret .. --next-hash .. --next-checksum .. --sunset <bool>
//!   distributoken transfer     --caller <addr> --instance <id> --to <addr> --value <n>
//!   distributoken approve      --caller <addr> --instance <id> --spender <addr> --value <n>
//!   distributoken transfer-from --caller <addr> --instance <id> --from <addr> --to <addr> --value <n>
//!   distributoken fetch        --instance <id> <query>
//!   distributoken list

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use distributoken_core::operation::OperationKind;
use distributoken_core::types::{AccountId, Balance, Encoding, InstanceId, Memo};
use distributoken_crypto::HashChainLink;
use distributoken_state::{Distributoken, StateDb, SystemClock};

mod args;
mod confirm;
mod preflight;

use args::{
    chain_state, expand_tilde, load_config, parse_account, unzip_entries, ChainArgs, DeployParams,
    EntryArg, Form,
};
use confirm::{AutoConfirm, Confirm, PromptConfirm};
use preflight::preflight;

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "distributoken",
    version,
    about = "Owner-gated token distribution authorized by a secret hash chain"
)]
struct Args {
    /// State database directory.
    #[arg(long, global = true, default_value = "~/.distributoken/data")]
    data_dir: PathBuf,

    /// Text form of secrets, hashed secrets and checksums.
    #[arg(long, global = true, value_enum, default_value_t = Form::Hex)]
    form: Form,

    /// Skip confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Acting account (hex address).
    #[arg(long, global = true)]
    caller: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate hash chain links (secret, hashed secret, checksum).
    Keygen {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Deploy a new instance owned by --caller.
    Deploy {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Initial hashed secret.
        #[arg(long)]
        hashed_secret: Option<String>,
        /// Checksum of the initial hashed secret.
        #[arg(long)]
        checksum: Option<String>,
        /// JSON file with any of the above plus `config`.
        #[arg(long)]
        params: Option<PathBuf>,
        /// JSON ledger config (per-operation secret widths).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Distribute to a single receiver.
    Gift {
        #[arg(long)]
        instance: InstanceId,
        #[command(flatten)]
        chain: ChainArgs,
        #[arg(long)]
        to: String,
        #[arg(long)]
        value: Balance,
        /// Up to 32 bytes.
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Distribute to many receivers with a single chain advance.
    Distribute {
        #[arg(long)]
        instance: InstanceId,
        #[command(flatten)]
        chain: ChainArgs,
        /// <address>:<value>[:<memo>], repeatable.
        #[arg(long = "entry", required = true)]
        entries: Vec<EntryArg>,
    },

    /// Hand ownership to another account.
    SetOwner {
        #[arg(long)]
        instance: InstanceId,
        #[command(flatten)]
        chain: ChainArgs,
        #[arg(long)]
        new_owner: String,
    },

    /// Freeze or unfreeze ordinary transfers.
    SetSunset {
        #[arg(long)]
        instance: InstanceId,
        #[command(flatten)]
        chain: ChainArgs,
        #[arg(long, action = clap::ArgAction::Set)]
        sunset: bool,
    },

    /// Transfer tokens from --caller.
    Transfer {
        #[arg(long)]
        instance: InstanceId,
        #[arg(long)]
        to: String,
        #[arg(long)]
        value: Balance,
    },

    /// Allow a spender to move --caller's tokens.
    Approve {
        #[arg(long)]
        instance: InstanceId,
        #[arg(long)]
        spender: String,
        #[arg(long)]
        value: Balance,
    },

    /// Spend an allowance granted to --caller.
    TransferFrom {
        #[arg(long)]
        instance: InstanceId,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        value: Balance,
    },

    /// Read instance state.
    Fetch {
        #[arg(long)]
        instance: InstanceId,
        #[command(subcommand)]
        query: Query,
    },

    /// List deployed instances.
    List,
}

#[derive(Subcommand, Debug)]
enum Query {
    HashedSecret,
    Owner,
    Sunset,
    Balance { account: String },
    Allowance { owner: String, spender: String },
    Distribution { index: u64 },
    Count,
    Supply,
    Meta,
    Audit,
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,distributoken=info")),
        )
        .init();

    let args = Args::parse();
    let encoding = Encoding::from(args.form);
    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(PromptConfirm::stdio())
    };

    if let Command::Keygen { count } = args.command {
        return cmd_keygen(count, encoding);
    }

    let data_dir = expand_tilde(&args.data_dir);
    let db = open_db(&data_dir)?;
    let caller = args.caller.as_deref();

    match args.command {
        Command::Keygen { count } => cmd_keygen(count, encoding),

        Command::Deploy { symbol, description, hashed_secret, checksum, params, config } => {
            let owner = require_caller(caller)?;
            let params = match params {
                Some(path) => DeployParams::load(&expand_tilde(&path))?,
                None => DeployParams::default(),
            };
            let symbol = symbol.or(params.symbol).context("--symbol is required")?;
            let description = description.or(params.description).unwrap_or_default();
            let hashed_secret =
                hashed_secret.or(params.hashed_secret).context("--hashed-secret is required")?;
            let checksum = checksum.or(params.checksum).context("--checksum is required")?;
            let config = match config {
                Some(path) => load_config(&expand_tilde(&path))?,
                None => params.config.unwrap_or_default(),
            };

            let initial = chain_state(encoding, &hashed_secret, &checksum)?;
            distributoken_crypto::ChainVerifier::check_commitment(&initial)?;
            confirm.require(&format!("Deploy {symbol} owned by {owner}?"))?;

            let token = Distributoken::deploy(
                &db,
                owner,
                &symbol,
                &description,
                initial,
                config,
                Arc::new(SystemClock),
            )?;
            db.flush()?;
            println!("Deployed {} to {}", symbol, token.id());
            Ok(())
        }

        Command::Gift { instance, chain, to, value, memo } => {
            let caller = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let advance = chain.to_advance(encoding)?;
            check_secret(&token, &advance, OperationKind::Distribute)?;
            let to = parse_account(&to)?;
            let memo = Memo::from_text(&memo)?;
            confirm.require(&format!("Gift {value} to {to}?"))?;

            token.gift(&caller, &advance, to, value, memo)?;
            db.flush()?;
            println!("Completed 1 distribution");
            Ok(())
        }

        Command::Distribute { instance, chain, entries } => {
            let caller = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let advance = chain.to_advance(encoding)?;
            check_secret(&token, &advance, OperationKind::Distribute)?;
            let count = entries.len();
            let (receivers, values, memos) = unzip_entries(entries);
            let total = values
                .iter()
                .try_fold(0 as Balance, |acc, v| acc.checked_add(*v))
                .context("batch total overflows")?;
            confirm.require(&format!("Distribute {total} across {count} entries?"))?;

            token.distribute(&caller, &advance, &receivers, &values, &memos)?;
            db.flush()?;
            println!("Completed {count} distributions");
            Ok(())
        }

        Command::SetOwner { instance, chain, new_owner } => {
            let caller = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let advance = chain.to_advance(encoding)?;
            check_secret(&token, &advance, OperationKind::SetOwner)?;
            let new_owner = parse_account(&new_owner)?;
            confirm.require(&format!("Transfer ownership to {new_owner}?"))?;

            token.set_owner(&caller, &advance, new_owner)?;
            db.flush()?;
            println!("Owner is now {new_owner}");
            Ok(())
        }

        Command::SetSunset { instance, chain, sunset } => {
            let caller = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let advance = chain.to_advance(encoding)?;
            check_secret(&token, &advance, OperationKind::SetSunset)?;
            confirm.require(&format!("Set sunset to {sunset}?"))?;

            token.set_sunset(&caller, &advance, sunset)?;
            db.flush()?;
            println!("Sunset is now {sunset}");
            Ok(())
        }

        Command::Transfer { instance, to, value } => {
            let from = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let to = parse_account(&to)?;
            confirm.require(&format!("Transfer {value} from {from} to {to}?"))?;
            token.transfer(&from, &to, value)?;
            db.flush()?;
            println!("Transferred {value} to {to}");
            Ok(())
        }

        Command::Approve { instance, spender, value } => {
            let owner = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let spender = parse_account(&spender)?;
            confirm.require(&format!("Allow {spender} to spend {value}?"))?;
            token.approve(&owner, &spender, value)?;
            db.flush()?;
            println!("Allowance for {spender} set to {value}");
            Ok(())
        }

        Command::TransferFrom { instance, from, to, value } => {
            let spender = require_caller(caller)?;
            let token = open_instance(&db, &instance)?;
            let from = parse_account(&from)?;
            let to = parse_account(&to)?;
            confirm.require(&format!("Transfer {value} from {from} to {to}?"))?;
            token.transfer_from(&spender, &from, &to, value)?;
            db.flush()?;
            println!("Transferred {value} from {from} to {to}");
            Ok(())
        }

        Command::Fetch { instance, query } => {
            let token = open_instance(&db, &instance)?;
            cmd_fetch(&token, query, encoding)
        }

        Command::List => {
            let instances = db.instances()?;
            if instances.is_empty() {
                println!("No instances deployed in {}", data_dir.display());
            }
            for (id, meta) in instances {
                println!("{id}  {:<10} {}  {}", meta.symbol, format_time(meta.deployed_at), meta.description);
            }
            Ok(())
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_keygen(count: usize, encoding: Encoding) -> anyhow::Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    for (i, link) in HashChainLink::generate_many(count).iter().enumerate() {
        println!("Link {i}");
        println!("  Secret:        {}", link.secret().encode(encoding));
        println!("  Hashed secret: {}", link.hashed_secret().encode(encoding));
        println!("  Checksum:      {}", link.checksum().encode(encoding));
    }
    println!();
    println!("Publish a hashed secret and checksum; keep its secret offline until it is spent.");
    Ok(())
}

fn cmd_fetch(token: &Distributoken, query: Query, encoding: Encoding) -> anyhow::Result<()> {
    match query {
        Query::HashedSecret => println!("{}", token.hashed_secret()?.encode(encoding)),
        Query::Owner => println!("{}", token.owner()?),
        Query::Sunset => println!("{}", token.sunset()?),
        Query::Balance { account } => println!("{}", token.balance_of(&parse_account(&account)?)?),
        Query::Allowance { owner, spender } => println!(
            "{}",
            token.allowance(&parse_account(&owner)?, &parse_account(&spender)?)?
        ),
        Query::Distribution { index } => {
            let record = token.distribution(index)?;
            println!("Timestamp: {}", format_time(record.timestamp));
            println!("Receiver:  {}", record.receiver);
            println!("Value:     {}", record.value);
            println!("Memo:      {}", record.memo);
        }
        Query::Count => println!("{}", token.distribution_count()?),
        Query::Supply => println!("{}", token.total_supply()?),
        Query::Meta => {
            let meta = token.token_meta()?;
            let config = token.config();
            println!("Instance:    {}", token.id());
            println!("Symbol:      {}", meta.symbol);
            println!("Description: {}", meta.description);
            println!("Decimals:    {}", meta.decimals);
            println!("Deployed:    {}", format_time(meta.deployed_at));
            println!(
                "Widths:      distribute={} set_owner={} set_sunset={}",
                config.distribute.bytes(),
                config.set_owner.bytes(),
                config.set_sunset.bytes()
            );
        }
        Query::Audit => println!("Supply consistent: {}", token.audit_supply()?),
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn open_db(data_dir: &Path) -> anyhow::Result<StateDb> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    StateDb::open(data_dir).with_context(|| format!("opening state database {}", data_dir.display()))
}

fn open_instance(db: &StateDb, id: &InstanceId) -> anyhow::Result<Distributoken> {
    Ok(Distributoken::open(db, id, Arc::new(SystemClock))?)
}

fn require_caller(caller: Option<&str>) -> anyhow::Result<AccountId> {
    let caller = caller.context("--caller is required for this command")?;
    parse_account(caller).context("parsing --caller")
}

fn check_secret(
    token: &Distributoken,
    advance: &distributoken_core::operation::ChainAdvance,
    kind: OperationKind,
) -> anyhow::Result<()> {
    info!("checking secret");
    preflight(&token.chain_state()?, advance, token.config().width_for(kind))?;
    println!("Secret is correct");
    Ok(())
}

fn format_time(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
