//! End-to-end replay of the gift flow: five single gifts, then the same five
//! receivers again as one batch, checking the chain, the log and balances.
//!
//! Run with:
//!   cargo test -p distributoken-state --test gift_scenario

use std::sync::Arc;

use distributoken_core::error::DistributokenError;
use distributoken_core::record::LedgerConfig;
use distributoken_core::types::{AccountId, Balance, Memo};
use distributoken_crypto::HashChainLink;
use distributoken_state::{Distributoken, FixedClock, StateDb};

const RECEIVERS: usize = 5;

fn account(n: u8) -> AccountId {
    AccountId::from_bytes([n; 20])
}

fn memo(i: usize) -> Memo {
    let mut bytes = [0u8; 32];
    for (j, b) in bytes.iter_mut().enumerate() {
        *b = (i * 31 + j) as u8 | 1;
    }
    Memo(bytes)
}

#[test]
fn five_gifts_then_batch_of_five() {
    let db = StateDb::temporary().unwrap();
    let deployer = account(0xaa);
    let receivers: Vec<AccountId> = (1..=RECEIVERS as u8).map(account).collect();
    let values: Vec<Balance> = (0..RECEIVERS).map(|i| (i as Balance * 37 + 11) % 256).collect();
    let memos: Vec<Memo> = (0..RECEIVERS).map(memo).collect();
    let links = HashChainLink::generate_many(RECEIVERS * 2 + 1);

    let token = Distributoken::deploy(
        &db,
        deployer,
        "THANKS",
        "THANKS description",
        links[0].chain_state(),
        LedgerConfig::default(),
        Arc::new(FixedClock::new(1_500_000_000)),
    )
    .unwrap();

    // Fresh deployment.
    assert_eq!(token.owner().unwrap(), deployer);
    assert_eq!(token.total_supply().unwrap(), 0);
    assert_eq!(token.balance_of(&deployer).unwrap(), 0);
    assert_eq!(token.hashed_secret().unwrap(), links[0].hashed_secret());
    let meta = token.token_meta().unwrap();
    assert_eq!(meta.symbol, "THANKS");
    assert_eq!(meta.description, "THANKS description");
    assert_eq!(meta.decimals, 0);

    for i in 0..RECEIVERS {
        token
            .gift(&deployer, &links[i].advance_to(&links[i + 1]), receivers[i], values[i], memos[i])
            .unwrap();
    }
    assert_eq!(token.hashed_secret().unwrap(), links[RECEIVERS].hashed_secret());

    for i in 0..RECEIVERS {
        let record = token.distribution(i as u64).unwrap();
        assert!(record.timestamp > 0);
        assert_eq!(record.receiver, receivers[i]);
        assert_eq!(record.value, values[i]);
        assert_eq!(record.memo, memos[i]);
        assert_eq!(token.balance_of(&receivers[i]).unwrap(), values[i]);
    }
    assert!(matches!(
        token.distribution(5),
        Err(DistributokenError::IndexOutOfRange { index: 5, count: 5 })
    ));

    let memo_bytes: Vec<[u8; 32]> = memos.iter().map(|m| m.0).collect();
    token
        .distribute(
            &deployer,
            &links[RECEIVERS].advance_to(&links[RECEIVERS + 1]),
            &receivers,
            &values,
            &memo_bytes,
        )
        .unwrap();
    // One advance for the whole batch.
    assert_eq!(token.hashed_secret().unwrap(), links[RECEIVERS + 1].hashed_secret());
    assert_eq!(token.distribution_count().unwrap(), 10);

    for i in 0..RECEIVERS {
        let record = token.distribution((i + RECEIVERS) as u64).unwrap();
        assert_eq!(record.receiver, receivers[i]);
        assert_eq!(record.value, values[i]);
        assert_eq!(record.memo, memos[i]);
        assert_eq!(token.balance_of(&receivers[i]).unwrap(), values[i] * 2);
    }
    assert!(matches!(
        token.distribution(20),
        Err(DistributokenError::IndexOutOfRange { .. })
    ));

    let expected: Balance = values.iter().sum::<Balance>() * 2;
    assert_eq!(token.total_supply().unwrap(), expected);
    assert_eq!(token.audit_supply().unwrap(), expected);
}

#[test]
fn single_gift_then_replay() {
    let db = StateDb::temporary().unwrap();
    let deployer = account(0xaa);
    let links = HashChainLink::generate_many(3);
    let token = Distributoken::deploy(
        &db,
        deployer,
        "GIFT",
        "",
        links[0].chain_state(),
        LedgerConfig::default(),
        Arc::new(FixedClock::new(1)),
    )
    .unwrap();

    let memo1 = Memo::from_text("first").unwrap();
    let advance = links[0].advance_to(&links[1]);
    token
        .distribute(&deployer, &advance, &[account(1)], &[100], &[memo1.0])
        .unwrap();
    assert_eq!(token.balance_of(&account(1)).unwrap(), 100);
    let record = token.distribution(0).unwrap();
    assert_eq!((record.receiver, record.value, record.memo), (account(1), 100, memo1));
    assert_eq!(token.hashed_secret().unwrap(), links[1].hashed_secret());

    // secret0 is spent, even paired with a fresh commitment.
    let replay = links[0].advance_to(&links[2]);
    let err = token
        .distribute(&deployer, &replay, &[account(1)], &[100], &[memo1.0])
        .unwrap_err();
    assert!(matches!(err, DistributokenError::SecretMismatch { .. }));
    assert_eq!(token.balance_of(&account(1)).unwrap(), 100);
}
