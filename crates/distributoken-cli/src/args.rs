use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use distributoken_core::operation::ChainAdvance;
use distributoken_core::record::{ChainState, LedgerConfig};
use distributoken_core::types::{AccountId, Balance, Checksum, Encoding, HashedSecret, Secret};

/// `--form` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Form {
    #[default]
    Hex,
    Base58,
}

impl From<Form> for Encoding {
    fn from(form: Form) -> Self {
        match form {
            Form::Hex => Encoding::Hex,
            Form::Base58 => Encoding::Base58,
        }
    }
}

/// The reveal-and-commit triple every chain-gated command carries.
#[derive(clap::Args, Debug)]
pub struct ChainArgs {
    /// Current secret.
    #[arg(long)]
    pub secret: String,
    /// Next hashed secret.
    #[arg(long)]
    pub next_hash: String,
    /// Checksum of the next hashed secret.
    #[arg(long)]
    pub next_checksum: String,
}

impl ChainArgs {
    pub fn to_advance(&self, encoding: Encoding) -> anyhow::Result<ChainAdvance> {
        let secret = Secret::decode(encoding, &self.secret).context("decoding --secret")?;
        let next = chain_state(encoding, &self.next_hash, &self.next_checksum)?;
        Ok(ChainAdvance::new(secret, next))
    }
}

pub fn chain_state(encoding: Encoding, hash: &str, checksum: &str) -> anyhow::Result<ChainState> {
    let hashed_secret = HashedSecret::decode(encoding, hash).context("decoding hashed secret")?;
    let checksum = Checksum::decode(encoding, checksum).context("decoding checksum")?;
    Ok(ChainState::new(hashed_secret, checksum))
}

/// Optional deployment parameters file, used in place of individual flags.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployParams {
    pub symbol: Option<String>,
    pub description: Option<String>,
    /// In the `--form` encoding.
    pub hashed_secret: Option<String>,
    /// In the `--form` encoding.
    pub checksum: Option<String>,
    pub config: Option<LedgerConfig>,
}

impl DeployParams {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading deploy params {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing deploy params {}", path.display()))
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<LedgerConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading ledger config {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing ledger config {}", path.display()))
}

pub fn parse_account(s: &str) -> anyhow::Result<AccountId> {
    Ok(AccountId::from_hex(s)?)
}

pub fn parse_value(s: &str) -> anyhow::Result<Balance> {
    s.trim()
        .parse::<Balance>()
        .with_context(|| format!("value {s:?} must be a non-negative integer"))
}

/// One `--entry <address>:<value>[:<memo>]` of a distribution batch. The memo
/// is everything after the second colon, taken as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryArg {
    pub receiver: AccountId,
    pub value: Balance,
    pub memo: Vec<u8>,
}

impl std::str::FromStr for EntryArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(receiver), Some(value)) = (parts.next(), parts.next()) else {
            bail!("entry {s:?} must be <address>:<value>[:<memo>]");
        };
        Ok(Self {
            receiver: parse_account(receiver)?,
            value: parse_value(value)?,
            memo: parts.next().unwrap_or("").as_bytes().to_vec(),
        })
    }
}

/// Split a list of entries into the parallel receivers, values and memos the
/// ledger takes.
pub fn unzip_entries(entries: Vec<EntryArg>) -> (Vec<AccountId>, Vec<Balance>, Vec<Vec<u8>>) {
    let mut receivers = Vec::with_capacity(entries.len());
    let mut values = Vec::with_capacity(entries.len());
    let mut memos = Vec::with_capacity(entries.len());
    for e in entries {
        receivers.push(e.receiver);
        values.push(e.value);
        memos.push(e.memo);
    }
    (receivers, values, memos)
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    expand_tilde_in(path, home.map(PathBuf::from))
}

fn expand_tilde_in(path: &Path, home: Option<PathBuf>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(stripped), Some(home)) => home.join(stripped),
        _ => path.to_path_buf(),
    }
}
