//! Integration tests for environment lifecycle.

use shelfdb_core::{Cause, CloseError, DbRef, EngineError, EnvFlags, Environment, ErrorKind, Options};
use shelfdb_testkit::{unusable_path, TestEnv};

#[test]
fn construction_touches_nothing() {
    let test_env = TestEnv::new();
    assert!(!test_env.path().exists());
    assert!(!test_env.is_open());
}

#[test]
fn first_reference_creates_directory() {
    let test_env = TestEnv::new();
    let _users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();

    assert!(test_env.path().is_dir());
    assert!(test_env.path().join("LOCK").exists());
    assert!(test_env.path().join("data.log").exists());
    assert!(test_env.is_open());
}

#[test]
fn unusable_directory_fails_every_init() {
    let (_dir, path) = unusable_path();
    let env = Environment::new(path, Options::default());

    for _ in 0..3 {
        let err = DbRef::<'_, str, String>::init("users", &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitFailed);
        assert!(matches!(err.cause(), Cause::CreateDir { .. }));
    }
    assert!(!env.is_open());
    assert!(matches!(env.close(), Err(CloseError::NotOpen)));
}

#[test]
fn second_environment_on_same_directory_is_locked_out() {
    let test_env = TestEnv::new();
    let _users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();

    let rival = Environment::new(test_env.path(), Options::default());
    let err = DbRef::<'_, str, String>::init("users", &rival).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitFailed);
    assert!(matches!(
        err.cause(),
        Cause::Open(engine) if matches!(**engine, EngineError::Locked)
    ));
}

#[test]
fn invalid_limits_fail_init() {
    let test_env = TestEnv::with_options(Options::new().max_readers(0));

    let err = DbRef::<'_, str, String>::init("users", &test_env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitFailed);
    assert!(matches!(
        err.cause(),
        Cause::Open(engine) if matches!(**engine, EngineError::InvalidConfig { .. })
    ));
}

#[test]
fn close_twice() {
    let test_env = TestEnv::new();
    let _users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();

    test_env.close().unwrap();
    assert!(!test_env.is_open());
    assert!(matches!(test_env.close(), Err(CloseError::AlreadyClosed)));
}

#[test]
fn no_sync_still_persists_on_close() {
    let options = || Options::new().flags(EnvFlags::NO_SYNC).batch_size(64);
    let test_env = TestEnv::with_options(options());
    {
        let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
        users.put("alice", &"hello".to_string()).unwrap();
    }

    let test_env = test_env.reopen(options());
    let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
    assert_eq!(users.get("alice").unwrap(), "hello");
}

#[test]
fn read_only_environment_rejects_puts() {
    let test_env = TestEnv::new();
    {
        let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
        users.put("alice", &"hello".to_string()).unwrap();
    }

    let test_env = test_env.reopen(Options::new().flags(EnvFlags::READ_ONLY));
    let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
    assert_eq!(users.get("alice").unwrap(), "hello");

    let err = users.put("bob", &"denied".to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PutFailed);
}

#[test]
fn damaged_log_fails_init_instead_of_dropping_commits() {
    let test_env = TestEnv::new();
    {
        let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
        for key in ["a", "b", "c"] {
            users.put(key, &key.to_uppercase()).unwrap();
        }
    }
    let test_env = test_env.reopen(Options::default());

    let data = test_env.path().join("data.log");
    let mut image = std::fs::read(&data).unwrap();
    let middle = image.len() / 2;
    image[middle] ^= 0x01;
    std::fs::write(&data, &image).unwrap();

    let err = DbRef::<'_, str, String>::init("users", &test_env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitFailed);
    assert!(matches!(
        err.cause(),
        Cause::Open(engine) if matches!(**engine, EngineError::Corrupted { .. })
    ));
    assert_eq!(std::fs::read(&data).unwrap(), image);
}

#[test]
fn read_only_environment_leaves_torn_tail_on_disk() {
    let test_env = TestEnv::new();
    {
        let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
        users.put("alice", &"hello".to_string()).unwrap();
    }
    let test_env = test_env.reopen(Options::new().flags(EnvFlags::READ_ONLY));

    let data = test_env.path().join("data.log");
    let mut image = std::fs::read(&data).unwrap();
    image.extend_from_slice(&[b'S', b'H', b'L', b'F', 1, 0]);
    std::fs::write(&data, &image).unwrap();

    let users: DbRef<'_, str, String> = DbRef::init("users", &test_env).unwrap();
    assert_eq!(users.get("alice").unwrap(), "hello");
    test_env.close().unwrap();

    assert_eq!(std::fs::read(&data).unwrap(), image);
}

#[test]
fn read_only_environment_on_missing_path_creates_nothing() {
    let test_env = TestEnv::with_options(Options::new().flags(EnvFlags::READ_ONLY));

    let err = DbRef::<'_, str, String>::init("users", &test_env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitFailed);
    assert!(!test_env.path().exists());
}
