//! Atomicity and monotonicity of chain-gated operations.

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

use distributoken_core::error::DistributokenError;
use distributoken_core::record::LedgerConfig;
use distributoken_core::types::{AccountId, HashWidth, HashedSecret, Memo};
use distributoken_crypto::HashChainLink;
use distributoken_state::{Distributoken, FixedClock, StateDb};

fn account(n: u8) -> AccountId {
    AccountId::from_bytes([n; 20])
}

const OWNER: u8 = 0xaa;

fn deploy(db: &StateDb, first: &HashChainLink) -> Distributoken {
    deploy_with(db, first, LedgerConfig::default())
}

fn deploy_with(db: &StateDb, first: &HashChainLink, config: LedgerConfig) -> Distributoken {
    Distributoken::deploy(
        db,
        account(OWNER),
        "GIFT",
        "properties",
        first.chain_state(),
        config,
        Arc::new(FixedClock::new(1_000)),
    )
    .unwrap()
}

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("distributoken_test_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Self(dir)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn committed_hash_never_repeats() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(6);
    let token = deploy(&db, &links[0]);
    let owner = account(OWNER);

    let mut seen: Vec<HashedSecret> = vec![token.hashed_secret().unwrap()];
    token.gift(&owner, &links[0].advance_to(&links[1]), account(1), 5, Memo::default()).unwrap();
    seen.push(token.hashed_secret().unwrap());
    token.set_sunset(&owner, &links[1].advance_to(&links[2]), true).unwrap();
    seen.push(token.hashed_secret().unwrap());
    token.set_sunset(&owner, &links[2].advance_to(&links[3]), false).unwrap();
    seen.push(token.hashed_secret().unwrap());
    token.set_owner(&owner, &links[3].advance_to(&links[4]), owner).unwrap();
    seen.push(token.hashed_secret().unwrap());

    for (i, link) in links[..5].iter().enumerate() {
        assert_eq!(seen[i], link.hashed_secret());
    }
    for (i, a) in seen.iter().enumerate() {
        assert!(!seen[i + 1..].contains(a));
    }

    // Proposing the live hash again is refused.
    let err = token.set_sunset(&owner, &links[4].advance_to(&links[4]), true).unwrap_err();
    assert!(matches!(err, DistributokenError::StaleCommitment(_)));
}

#[test]
fn wrong_secret_leaves_snapshot_unchanged() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(3);
    let token = deploy(&db, &links[0]);
    let owner = account(OWNER);
    token.gift(&owner, &links[0].advance_to(&links[1]), account(1), 9, Memo::default()).unwrap();

    let before = token.snapshot().unwrap();
    let impostor = HashChainLink::generate();
    for result in [
        token.gift(&owner, &impostor.advance_to(&links[2]), account(1), 9, Memo::default()),
        token.set_owner(&owner, &impostor.advance_to(&links[2]), account(2)),
        token.set_sunset(&owner, &impostor.advance_to(&links[2]), true),
    ] {
        assert!(matches!(result, Err(DistributokenError::SecretMismatch { .. })));
    }
    assert_eq!(token.snapshot().unwrap(), before);
}

#[test]
fn malformed_batch_changes_nothing() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(2);
    let token = deploy(&db, &links[0]);
    let owner = account(OWNER);
    let advance = links[0].advance_to(&links[1]);
    let before = token.snapshot().unwrap();

    let short_memos: [&[u8]; 1] = [b"only one"];
    let err = token
        .distribute(&owner, &advance, &[account(1), account(2)], &[1, 2], &short_memos)
        .unwrap_err();
    assert!(matches!(err, DistributokenError::MalformedBatch(_)));

    let long = [0x41u8; 33];
    let memos: [&[u8]; 2] = [b"ok", &long];
    let err = token
        .distribute(&owner, &advance, &[account(1), account(2)], &[1, 2], &memos)
        .unwrap_err();
    assert!(matches!(err, DistributokenError::MalformedBatch(_)));

    assert_eq!(token.snapshot().unwrap(), before);

    // The secret was not consumed by the failed attempts.
    token
        .distribute(&owner, &advance, &[account(1), account(2)], &[1, 2], &[b"a", b"b"])
        .unwrap();
    assert_eq!(token.distribution_count().unwrap(), 2);
}

#[test]
fn overflowing_batch_is_all_or_nothing() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(2);
    let token = deploy(&db, &links[0]);
    let before = token.snapshot().unwrap();
    let err = token
        .distribute(
            &account(OWNER),
            &links[0].advance_to(&links[1]),
            &[account(1), account(2)],
            &[u128::MAX, 1],
            &[b"", b""],
        )
        .unwrap_err();
    assert!(matches!(err, DistributokenError::SupplyOverflow));
    assert_eq!(token.snapshot().unwrap(), before);
}

#[test]
fn sunset_freezes_transfers_only() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(5);
    let token = deploy(&db, &links[0]);
    let owner = account(OWNER);
    token.gift(&owner, &links[0].advance_to(&links[1]), account(1), 30, Memo::default()).unwrap();
    token.approve(&account(1), &account(2), 10).unwrap();

    token.set_sunset(&owner, &links[1].advance_to(&links[2]), true).unwrap();
    assert!(token.sunset().unwrap());
    assert!(matches!(
        token.transfer(&account(1), &account(3), 1),
        Err(DistributokenError::SunsetActive)
    ));
    assert!(matches!(
        token.transfer_from(&account(2), &account(1), &account(3), 1),
        Err(DistributokenError::SunsetActive)
    ));
    // Chain-gated operations keep working.
    token.gift(&owner, &links[2].advance_to(&links[3]), account(3), 4, Memo::default()).unwrap();
    assert_eq!(token.balance_of(&account(3)).unwrap(), 4);

    token.set_sunset(&owner, &links[3].advance_to(&links[4]), false).unwrap();
    token.transfer_from(&account(2), &account(1), &account(3), 10).unwrap();
    assert_eq!(token.balance_of(&account(3)).unwrap(), 14);
    assert_eq!(token.allowance(&account(1), &account(2)).unwrap(), 0);
    assert_eq!(token.audit_supply().unwrap(), 34);
}

#[test]
fn four_byte_width_for_configured_operation() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(2);
    let config = LedgerConfig { set_owner: HashWidth::Four, ..Default::default() };
    let token = deploy_with(&db, &links[0], config);
    assert_eq!(token.config().width_for(distributoken_core::operation::OperationKind::SetOwner), HashWidth::Four);
    token
        .set_owner(&account(OWNER), &links[0].advance_to(&links[1]), account(7))
        .unwrap();
    assert_eq!(token.owner().unwrap(), account(7));
}

#[test]
fn racing_callers_on_one_secret_single_winner() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(3);
    let token = Arc::new(deploy(&db, &links[0]));

    let handles: Vec<_> = [1u8, 2u8]
        .into_iter()
        .map(|n| {
            let token = Arc::clone(&token);
            let advance = links[0].advance_to(&links[n as usize]);
            thread::spawn(move || {
                token.gift(&account(OWNER), &advance, account(n), 10, Memo::default())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(DistributokenError::SecretMismatch { .. }))));
    assert_eq!(token.distribution_count().unwrap(), 1);
    assert_eq!(token.total_supply().unwrap(), 10);
}

#[test]
fn separately_opened_handles_share_one_writer() {
    let db = StateDb::temporary().unwrap();
    for _ in 0..50 {
        let links = HashChainLink::generate_many(3);
        let id = deploy(&db, &links[0]).id();
        let barrier = Barrier::new(2);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = [1usize, 2]
                .into_iter()
                .map(|n| {
                    let (db, barrier, links) = (&db, &barrier, &links);
                    s.spawn(move || {
                        let token =
                            Distributoken::open(db, &id, Arc::new(FixedClock::new(1_000))).unwrap();
                        let advance = links[0].advance_to(&links[n]);
                        barrier.wait();
                        token.gift(&account(OWNER), &advance, account(n as u8), 10, Memo::default())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let token = Distributoken::open(&db, &id, Arc::new(FixedClock::new(0))).unwrap();
        assert_eq!(token.distribution_count().unwrap(), 1);
        assert_eq!(token.total_supply().unwrap(), 10);
        assert_eq!(token.audit_supply().unwrap(), 10);
    }
}

#[test]
fn retired_commitment_cannot_come_back() {
    let db = StateDb::temporary().unwrap();
    let links = HashChainLink::generate_many(3);
    let token = deploy(&db, &links[0]);
    let owner = account(OWNER);
    token.gift(&owner, &links[0].advance_to(&links[1]), account(1), 5, Memo::default()).unwrap();

    // Re-committing H0 would make the published secret0 valid again.
    let before = token.snapshot().unwrap();
    let err = token
        .gift(&owner, &links[1].advance_to(&links[0]), account(1), 5, Memo::default())
        .unwrap_err();
    assert!(matches!(err, DistributokenError::StaleCommitment(_)));
    assert_eq!(token.snapshot().unwrap(), before);

    // secret1 is still unspent and can move the chain forward.
    token.set_sunset(&owner, &links[1].advance_to(&links[2]), true).unwrap();
    let err = token
        .gift(&owner, &links[0].advance_to(&links[1]), account(1), 5, Memo::default())
        .unwrap_err();
    assert!(matches!(err, DistributokenError::SecretMismatch { .. }));
}

#[test]
fn state_survives_reopen() {
    let dir = TempDir::new("reopen");
    let links = HashChainLink::generate_many(3);
    let id = {
        let db = StateDb::open(&dir.0).unwrap();
        let token = deploy(&db, &links[0]);
        token
            .gift(&account(OWNER), &links[0].advance_to(&links[1]), account(1), 42, Memo::from_text("kept").unwrap())
            .unwrap();
        db.flush().unwrap();
        token.id()
    };

    let db = StateDb::open(&dir.0).unwrap();
    let token = Distributoken::open(&db, &id, Arc::new(FixedClock::new(2_000))).unwrap();
    assert_eq!(token.hashed_secret().unwrap(), links[1].hashed_secret());
    assert_eq!(token.balance_of(&account(1)).unwrap(), 42);
    assert_eq!(token.distribution(0).unwrap().memo.to_string(), "kept");

    // The revealed secret stays spent across restarts.
    let err = token
        .gift(&account(OWNER), &links[0].advance_to(&links[2]), account(1), 1, Memo::default())
        .unwrap_err();
    assert!(matches!(err, DistributokenError::SecretMismatch { .. }));
    token
        .gift(&account(OWNER), &links[1].advance_to(&links[2]), account(1), 1, Memo::default())
        .unwrap();
    assert_eq!(token.distribution(1).unwrap().timestamp, 2_000);
}

#[test]
fn deployments_get_distinct_handles() {
    let db = StateDb::temporary().unwrap();
    let link = HashChainLink::generate();
    let a = deploy(&db, &link);
    let b = deploy(&db, &link);
    assert_ne!(a.id(), b.id());
    assert_eq!(db.instances().unwrap().len(), 2);
    assert!(matches!(
        Distributoken::open(&db, &distributoken_core::types::InstanceId([0u8; 20]), Arc::new(FixedClock::new(0))),
        Err(DistributokenError::UnknownInstance(_))
    ));
}
