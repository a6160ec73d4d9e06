//! Integration tests for typed references.

use proptest::prelude::*;
use shelfdb_core::{Cause, DbRef, EngineError, ErrorKind, JsonCodec, Options};
use shelfdb_testkit::{put_batch_strategy, record_strategy, EventCounter, Record, TestEnv};
use std::collections::HashMap;
use std::sync::Barrier;
use std::thread;

fn record(name: &str, count: u64) -> Record {
    Record {
        name: name.to_string(),
        count,
        score: None,
        tags: vec!["a".into(), "b".into()],
    }
}

#[test]
fn init_is_idempotent() {
    let test_env = TestEnv::new();

    let first: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
    first.put("r1", &record("one", 1)).unwrap();

    let second: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
    assert_eq!(second.get("r1").unwrap(), record("one", 1));

    second.put("r2", &record("two", 2)).unwrap();
    assert_eq!(first.get("r2").unwrap(), record("two", 2));
}

#[test]
fn concurrent_init_opens_once() {
    let test_env = TestEnv::with_options(Options::new().max_dbs(1));
    let threads = 12;
    let barrier = Barrier::new(threads);

    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let env = &test_env.env;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    let counters: DbRef<'_, u64, u64> = DbRef::init("counters", env).unwrap();
                    counters.put(&(i as u64), &(i as u64 * 10)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });

    let counters: DbRef<'_, u64, u64> = DbRef::init("counters", &test_env).unwrap();
    for i in 0..threads as u64 {
        assert_eq!(counters.get(&i).unwrap(), i * 10);
    }
}

#[test]
fn put_overwrites() {
    let test_env = TestEnv::new();
    let names: DbRef<'_, u32, String> = DbRef::init("names", &test_env).unwrap();

    names.put(&1, &"first".to_string()).unwrap();
    names.put(&1, &"second".to_string()).unwrap();
    assert_eq!(names.get(&1).unwrap(), "second");
}

#[test]
fn references_are_isolated() {
    let test_env = TestEnv::with_options(Options::new().max_dbs(2));
    let left: DbRef<'_, str, String> = DbRef::init("left", &test_env).unwrap();
    let right: DbRef<'_, str, String> = DbRef::init("right", &test_env).unwrap();

    left.put("k", &"from left".to_string()).unwrap();
    right.put("k", &"from right".to_string()).unwrap();

    assert_eq!(left.get("k").unwrap(), "from left");
    assert_eq!(right.get("k").unwrap(), "from right");

    left.put("only-left", &"x".to_string()).unwrap();
    let err = right.get("only-left").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GetFailed);
    assert!(err.is_not_found());
}

#[test]
fn missing_key_is_get_failed() {
    let test_env = TestEnv::new();
    let records: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();

    let err = records.get("absent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GetFailed);
    assert!(err.is_not_found());
    assert_eq!(err.id(), "records");
}

#[test]
fn wrong_value_type_is_get_failed() {
    let test_env = TestEnv::new();
    let as_record: DbRef<'_, str, Record> = DbRef::init("shared", &test_env).unwrap();
    as_record.put("k", &record("r", 5)).unwrap();

    let as_int: DbRef<'_, str, i64> = DbRef::init("shared", &test_env).unwrap();
    let err = as_int.get("k").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GetFailed);
    assert!(!err.is_not_found());
    assert!(matches!(err.cause(), Cause::DecodeValue(_)));
}

#[test]
fn sub_db_limit_is_init_failed() {
    let test_env = TestEnv::with_options(Options::new().max_dbs(2));
    let _a: DbRef<'_, str, u8> = DbRef::init("a", &test_env).unwrap();
    let _b: DbRef<'_, str, u8> = DbRef::init("b", &test_env).unwrap();

    let err = DbRef::<'_, str, u8>::init("c", &test_env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitFailed);
    assert_eq!(err.id(), "c");
    assert!(matches!(
        err.cause(),
        Cause::SubDb(engine) if matches!(**engine, EngineError::DbsFull { max: 2 })
    ));
}

#[test]
fn values_survive_reopen() {
    let test_env = TestEnv::with_options(Options::new().max_dbs(2));
    {
        let records: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
        let totals: DbRef<'_, str, u64> = DbRef::init("totals", &test_env).unwrap();
        records.put("r1", &record("kept", 7)).unwrap();
        totals.put("sum", &7).unwrap();
    }

    let test_env = test_env.reopen(Options::new().max_dbs(2));
    let records: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
    let totals: DbRef<'_, str, u64> = DbRef::init("totals", &test_env).unwrap();
    assert_eq!(records.get("r1").unwrap(), record("kept", 7));
    assert_eq!(totals.get("sum").unwrap(), 7);
}

#[test]
fn closed_environment_fails_every_operation() {
    let test_env = TestEnv::new();
    let records: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
    records.put("r1", &record("one", 1)).unwrap();

    test_env.close().unwrap();

    let put = records.put("r2", &record("two", 2)).unwrap_err();
    assert_eq!(put.kind(), ErrorKind::PutFailed);
    let get = records.get("r1").unwrap_err();
    assert_eq!(get.kind(), ErrorKind::GetFailed);
    assert!(matches!(
        get.cause(),
        Cause::Txn(engine) if matches!(**engine, EngineError::Closed)
    ));
}

#[test]
fn json_codec_roundtrip() {
    let test_env = TestEnv::new();
    let records: DbRef<'_, str, Record, JsonCodec> =
        DbRef::init_with_codec("records", &test_env, JsonCodec).unwrap();

    records.put("j1", &record("json", 3)).unwrap();
    assert_eq!(records.get("j1").unwrap(), record("json", 3));
}

#[test]
fn diagnostics_reach_the_sink() {
    let counter = EventCounter::new();
    let test_env = TestEnv::with_options(Options::new().diagnostics(counter.dispatch()));

    let records: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
    let after_init = counter.count();
    assert!(after_init > 0);

    records.put("r1", &record("seen", 1)).unwrap();
    assert!(counter.count() > after_init);
}

#[test]
fn default_sink_stays_silent() {
    let counter = EventCounter::new();
    let test_env = TestEnv::new();

    tracing::dispatcher::with_default(&counter.dispatch(), || {
        let records: DbRef<'_, str, u8> = DbRef::init("records", &test_env).unwrap();
        records.put("k", &1).unwrap();
    });

    assert_eq!(counter.count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn last_write_wins(batch in put_batch_strategy(24)) {
        let test_env = TestEnv::new();
        let records: DbRef<'_, str, Record> = DbRef::init("records", &test_env).unwrap();
        let mut expected = HashMap::new();

        for (key, value) in &batch {
            records.put(key, value).unwrap();
            expected.insert(key.clone(), value.clone());
        }

        for (key, value) in &expected {
            prop_assert_eq!(&records.get(key).unwrap(), value);
        }
    }

    #[test]
    fn record_roundtrip(value in record_strategy()) {
        let test_env = TestEnv::new();
        let records: DbRef<'_, u64, Record> = DbRef::init("records", &test_env).unwrap();

        records.put(&42, &value).unwrap();
        prop_assert_eq!(records.get(&42).unwrap(), value);
    }
}
