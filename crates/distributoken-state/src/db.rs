use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use distributoken_core::error::DistributokenError;
use distributoken_core::record::{
    ChainState, DistributionRecord, LedgerConfig, OwnerGateState, TokenMeta,
};
use distributoken_core::types::{AccountId, Balance, HashedSecret, InstanceId, RecordIndex};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use tracing::debug;

// ── Keys ──────────────────────────────────────────────────────────────────────

const TOKEN_KEY: &[u8] = b"meta:token";
const CONFIG_KEY: &[u8] = b"meta:config";
const CHAIN_KEY: &[u8] = b"meta:chain";
const GATE_KEY: &[u8] = b"meta:gate";
const SUPPLY_KEY: &[u8] = b"meta:supply";
const COUNT_KEY: &[u8] = b"meta:count";
const BALANCE_PREFIX: &[u8] = b"bal:";
const ALLOWANCE_PREFIX: &[u8] = b"allow:";
const RECORD_PREFIX: &[u8] = b"dist:";
const SPENT_PREFIX: &[u8] = b"spent:";

fn balance_key(id: &AccountId) -> Vec<u8> {
    [BALANCE_PREFIX, &id.as_bytes()[..]].concat()
}

fn allowance_key(owner: &AccountId, spender: &AccountId) -> Vec<u8> {
    [ALLOWANCE_PREFIX, &owner.as_bytes()[..], &spender.as_bytes()[..]].concat()
}

fn record_key(index: RecordIndex) -> Vec<u8> {
    [RECORD_PREFIX, &index.to_be_bytes()[..]].concat()
}

fn spent_key(hash: &HashedSecret) -> Vec<u8> {
    [SPENT_PREFIX, &hash.as_bytes()[..]].concat()
}

fn account_at(bytes: &[u8]) -> AccountId {
    let mut arr = [0u8; 20];
    arr.copy_from_slice(&bytes[..20]);
    AccountId::from_bytes(arr)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DistributokenError> {
    bincode::serialize(value).map_err(|e| DistributokenError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DistributokenError> {
    bincode::deserialize(bytes).map_err(|e| DistributokenError::Serialization(e.to_string()))
}

// ── StateDb ───────────────────────────────────────────────────────────────────

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   instances   : InstanceId bytes → bincode(TokenMeta)   (registry)
///   <0x…id>     : one tree per instance, see `InstanceStore`
pub struct StateDb {
    db: sled::Db,
    instances: sled::Tree,
    /// One writer lock per instance, shared by every handle opened on it.
    handles: Mutex<HashMap<InstanceId, SharedStore>>,
}

/// An instance store behind the lock that serializes its writers.
pub type SharedStore = Arc<RwLock<InstanceStore>>;

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DistributokenError> {
        let db = sled::open(path).map_err(|e| DistributokenError::Storage(e.to_string()))?;
        Self::from_db(db)
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self, DistributokenError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| DistributokenError::Storage(e.to_string()))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, DistributokenError> {
        let instances = db
            .open_tree("instances")
            .map_err(|e| DistributokenError::Storage(e.to_string()))?;
        Ok(Self { db, instances, handles: Mutex::new(HashMap::new()) })
    }

    /// Number of instances ever deployed into this database.
    pub fn instance_count(&self) -> u64 {
        self.instances.len() as u64
    }

    /// Open the tree for `id` without consulting the registry. Used by deploy
    /// to write the initial state before the instance becomes visible.
    pub(crate) fn instance_tree(&self, id: &InstanceId) -> Result<InstanceStore, DistributokenError> {
        let tree = self
            .db
            .open_tree(id.to_hex())
            .map_err(|e| DistributokenError::Storage(e.to_string()))?;
        Ok(InstanceStore { id: *id, tree })
    }

    pub(crate) fn register(&self, id: &InstanceId, meta: &TokenMeta) -> Result<(), DistributokenError> {
        self.instances
            .insert(id.as_bytes(), encode(meta)?)
            .map_err(|e| DistributokenError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Open a registered instance.
    pub fn instance(&self, id: &InstanceId) -> Result<InstanceStore, DistributokenError> {
        let known = self
            .instances
            .contains_key(id.as_bytes())
            .map_err(|e| DistributokenError::Storage(e.to_string()))?;
        if !known {
            return Err(DistributokenError::UnknownInstance(id.to_hex()));
        }
        self.instance_tree(id)
    }

    /// The lock-guarded store for `id`. Every call for the same id returns
    /// the same lock, so handles opened separately still exclude each other.
    pub(crate) fn shared_store(&self, id: &InstanceId) -> Result<SharedStore, DistributokenError> {
        let mut handles = self.handles.lock();
        if let Some(store) = handles.get(id) {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(RwLock::new(self.instance_tree(id)?));
        handles.insert(*id, Arc::clone(&store));
        Ok(store)
    }

    /// All registered instances with their token metadata.
    pub fn instances(&self) -> Result<Vec<(InstanceId, TokenMeta)>, DistributokenError> {
        let mut out = Vec::new();
        for item in self.instances.iter() {
            let (key, value) = item.map_err(|e| DistributokenError::Storage(e.to_string()))?;
            let mut arr = [0u8; 20];
            arr.copy_from_slice(&key);
            out.push((InstanceId(arr), decode(&value)?));
        }
        Ok(out)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), DistributokenError> {
        self.db.flush().map_err(|e| DistributokenError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ── Staged mutations ──────────────────────────────────────────────────────────

/// Every state change of one transition, staged before the atomic commit.
/// Balances and allowances hold absolute post-transition values.
#[derive(Debug, Default)]
pub struct StagedMutations {
    pub token: Option<TokenMeta>,
    pub config: Option<LedgerConfig>,
    pub chain: Option<ChainState>,
    pub gate: Option<OwnerGateState>,
    pub total_supply: Option<Balance>,
    pub balances: BTreeMap<AccountId, Balance>,
    pub allowances: BTreeMap<(AccountId, AccountId), Balance>,
    pub records: Vec<DistributionRecord>,
    /// Hashed secrets retired by this transition.
    pub spent: Vec<HashedSecret>,
}

// ── InstanceStore ─────────────────────────────────────────────────────────────

/// The state of one deployed instance, in a single sled tree.
///
/// Keys:
///   meta:token, meta:config, meta:chain, meta:gate → bincode records
///   meta:supply              → total supply
///   meta:count               → distribution log length
///   bal:<account>            → Balance
///   allow:<owner><spender>   → Balance
///   dist:<u64 big-endian>    → DistributionRecord
///   spent:<hashed secret>    → () once that commitment has been revealed
#[derive(Clone)]
pub struct InstanceStore {
    id: InstanceId,
    tree: sled::Tree,
}

impl InstanceStore {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, DistributokenError> {
        match self.tree.get(key).map_err(|e| DistributokenError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require<T: DeserializeOwned>(&self, key: &[u8]) -> Result<T, DistributokenError> {
        self.get(key)?.ok_or_else(|| {
            DistributokenError::Storage(format!(
                "instance {} is missing {}",
                self.id,
                String::from_utf8_lossy(key)
            ))
        })
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn token_meta(&self) -> Result<TokenMeta, DistributokenError> {
        self.require(TOKEN_KEY)
    }

    pub fn config(&self) -> Result<LedgerConfig, DistributokenError> {
        Ok(self.get(CONFIG_KEY)?.unwrap_or_default())
    }

    pub fn chain(&self) -> Result<ChainState, DistributokenError> {
        self.require(CHAIN_KEY)
    }

    pub fn gate(&self) -> Result<OwnerGateState, DistributokenError> {
        self.require(GATE_KEY)
    }

    pub fn total_supply(&self) -> Result<Balance, DistributokenError> {
        Ok(self.get(SUPPLY_KEY)?.unwrap_or(0))
    }

    pub fn distribution_count(&self) -> Result<u64, DistributokenError> {
        Ok(self.get(COUNT_KEY)?.unwrap_or(0))
    }

    // ── Balances ──────────────────────────────────────────────────────────────

    pub fn balance(&self, id: &AccountId) -> Result<Balance, DistributokenError> {
        Ok(self.get(&balance_key(id))?.unwrap_or(0))
    }

    pub fn balances(&self) -> Result<BTreeMap<AccountId, Balance>, DistributokenError> {
        let mut out = BTreeMap::new();
        for item in self.tree.scan_prefix(BALANCE_PREFIX) {
            let (key, value) = item.map_err(|e| DistributokenError::Storage(e.to_string()))?;
            out.insert(account_at(&key[BALANCE_PREFIX.len()..]), decode(&value)?);
        }
        Ok(out)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance, DistributokenError> {
        Ok(self.get(&allowance_key(owner, spender))?.unwrap_or(0))
    }

    pub fn allowances(
        &self,
    ) -> Result<BTreeMap<(AccountId, AccountId), Balance>, DistributokenError> {
        let mut out = BTreeMap::new();
        for item in self.tree.scan_prefix(ALLOWANCE_PREFIX) {
            let (key, value) = item.map_err(|e| DistributokenError::Storage(e.to_string()))?;
            let pair = &key[ALLOWANCE_PREFIX.len()..];
            out.insert((account_at(&pair[..20]), account_at(&pair[20..])), decode(&value)?);
        }
        Ok(out)
    }

    /// Whether `hash` was committed at some point and has since been revealed.
    pub fn is_spent(&self, hash: &HashedSecret) -> Result<bool, DistributokenError> {
        self.tree
            .contains_key(spent_key(hash))
            .map_err(|e| DistributokenError::Storage(e.to_string()))
    }

    // ── Distribution log ──────────────────────────────────────────────────────

    /// Record at `index`. Reading at or past the log length is an error,
    /// never a zero-filled record.
    pub fn distribution(&self, index: RecordIndex) -> Result<DistributionRecord, DistributokenError> {
        let count = self.distribution_count()?;
        if index >= count {
            return Err(DistributokenError::IndexOutOfRange { index, count });
        }
        self.require(&record_key(index))
    }

    pub fn distributions(&self) -> Result<Vec<DistributionRecord>, DistributokenError> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(RECORD_PREFIX) {
            let (_, value) = item.map_err(|e| DistributokenError::Storage(e.to_string()))?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    // ── Commit ────────────────────────────────────────────────────────────────

    /// Write every staged mutation in one sled transaction.
    ///
    /// Staged records are appended after the current log length. Callers must
    /// hold the instance's writer lock across validate-and-commit.
    pub(crate) fn commit(&self, staged: &StagedMutations) -> Result<(), DistributokenError> {
        let mut writes: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

        if let Some(token) = &staged.token {
            writes.push((TOKEN_KEY.to_vec(), encode(token)?));
        }
        if let Some(config) = &staged.config {
            writes.push((CONFIG_KEY.to_vec(), encode(config)?));
        }
        if let Some(chain) = &staged.chain {
            writes.push((CHAIN_KEY.to_vec(), encode(chain)?));
        }
        if let Some(gate) = &staged.gate {
            writes.push((GATE_KEY.to_vec(), encode(gate)?));
        }
        if let Some(supply) = &staged.total_supply {
            writes.push((SUPPLY_KEY.to_vec(), encode(supply)?));
        }
        for (id, balance) in &staged.balances {
            writes.push((balance_key(id), encode(balance)?));
        }
        for ((owner, spender), value) in &staged.allowances {
            writes.push((allowance_key(owner, spender), encode(value)?));
        }
        for hash in &staged.spent {
            writes.push((spent_key(hash), Vec::new()));
        }
        if !staged.records.is_empty() {
            let base = self.distribution_count()?;
            for (offset, record) in staged.records.iter().enumerate() {
                writes.push((record_key(base + offset as u64), encode(record)?));
            }
            let count = base + staged.records.len() as u64;
            writes.push((COUNT_KEY.to_vec(), encode(&count)?));
        }

        self.tree
            .transaction(|tx| -> ConflictableTransactionResult<(), ()> {
                for (key, value) in &writes {
                    tx.insert(key.as_slice(), value.as_slice())?;
                }
                Ok(())
            })
            .map_err(|e: TransactionError<()>| {
                DistributokenError::Storage(format!("commit failed: {e:?}"))
            })?;

        debug!(instance = %self.id, writes = writes.len(), "committed state transition");
        Ok(())
    }
}
