use lmdbspan::{Database, EngineError, Environment, Error, KeyOrdering};
use tempfile::TempDir;

// Common test setup
fn setup_test_env() -> (TempDir, Environment) {
    let temp_dir = TempDir::new().unwrap();
    let env = Environment::open(temp_dir.path().join("basic.mdb")).unwrap();
    (temp_dir, env)
}

#[test]
fn test_database_open() {
    let (_dir, env) = setup_test_env();

    let db = Database::open(&env, "simple_db").unwrap();
    assert!(!db.is_intkeys());
    assert_eq!(db.ordering(), KeyOrdering::Lexicographic);

    let ik = Database::open_intkeys(&env, "intkey_db").unwrap();
    assert!(ik.is_intkeys());
    assert_ne!(db.dbi(), ik.dbi());

    // Reopening an existing name yields the same sub-database
    let again = Database::open(&env, "simple_db").unwrap();
    assert_eq!(again.dbi(), db.dbi());
}

#[test]
fn test_basic_put_get() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "simple_db").unwrap();
    let mut txn = env.begin_rw_txn().unwrap();

    txn.put(&db, b"test_key", b"test_value").unwrap();
    let result = txn.get(&db, b"test_key");

    assert!(result.valid());
    assert_eq!(result.as_bytes(), b"test_value");
}

#[test]
fn test_string_convenience_forms() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "simple_db").unwrap();
    let mut txn = env.begin_rw_txn().unwrap();

    txn.put_str_str(&db, "cat", "felix").unwrap();
    let span = txn.get_str(&db, "cat");
    assert_eq!(span.size(), "felix".len() + 1);
    assert_eq!(span.as_str().unwrap(), "felix");

    // Keys are stored with their terminator
    assert!(txn.get(&db, b"cat\0").valid());
    assert!(!txn.get(&db, b"cat").valid());

    txn.put_str(&db, "blob", &[1, 2, 3]).unwrap();
    assert_eq!(txn.get_str(&db, "blob").as_bytes(), &[1, 2, 3]);
}

#[test]
fn test_u32_keys_hold_doubles() {
    let (_dir, env) = setup_test_env();
    let simple = Database::open(&env, "simple_db").unwrap();
    let intkeys = Database::open_intkeys(&env, "intkey_db").unwrap();
    let dubkey = 11.11f64;

    let mut txn = env.begin_rw_txn().unwrap();
    txn.put_u32(&simple, 123, &dubkey.to_ne_bytes()).unwrap();
    txn.put_u32(&intkeys, 88, &dubkey.to_ne_bytes()).unwrap();

    assert_eq!(txn.get_u32(&simple, 123).as_f64(), dubkey);
    assert_eq!(txn.get_u32(&intkeys, 88).as_f64(), dubkey);
}

#[test]
fn test_missing_key_is_null_span() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "simple_db").unwrap();
    let txn = env.begin_ro_txn().unwrap();

    let result = txn.get(&db, b"nonexistent_key");
    assert!(!result.valid());
    assert_eq!(result.size(), 0);
    assert_eq!(result.data(), None);
}

#[test]
fn test_overwrite_replaces_value() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "simple_db").unwrap();
    let mut txn = env.begin_rw_txn().unwrap();

    txn.put(&db, b"key", b"first").unwrap();
    txn.put(&db, b"key", b"second").unwrap();
    assert_eq!(txn.get(&db, b"key"), *b"second");
}

#[test]
fn test_database_stats() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "simple_db").unwrap();
    let mut txn = env.begin_rw_txn().unwrap();

    assert_eq!(db.stat(&txn).unwrap().entries, 0);

    for i in 0..5 {
        let key = format!("key_{}", i);
        let value = format!("value_{}", i);
        txn.put(&db, key.as_bytes(), value.as_bytes()).unwrap();
    }

    assert_eq!(db.stat(&txn).unwrap().entries, 5);
}

#[test]
fn test_committed_values_round_trip() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "simple_db").unwrap();
    let pairs: Vec<(Vec<u8>, Vec<u8>)> = (0u8..50)
        .map(|i| (vec![b'k', i], vec![i; i as usize + 1]))
        .collect();

    let mut txn = env.begin_rw_txn().unwrap();
    for (k, v) in &pairs {
        txn.put(&db, k, v).unwrap();
    }
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    for (k, v) in &pairs {
        assert_eq!(txn.get(&db, k).as_bytes(), v.as_slice());
    }
}

#[test]
fn test_reopen_with_other_ordering_is_rejected() {
    let (_dir, env) = setup_test_env();
    let ik = Database::open_intkeys(&env, "ik_db").unwrap();

    let result = Database::open(&env, "ik_db");
    assert!(matches!(
        result,
        Err(Error::DatabaseOpen {
            source: EngineError::Incompatible,
            ..
        })
    ));

    // The original handle still reports how keys are compared
    let again = Database::open_intkeys(&env, "ik_db").unwrap();
    assert!(again.is_intkeys());
    assert_eq!(again.dbi(), ik.dbi());

    let plain = Database::open(&env, "plain_db").unwrap();
    assert!(matches!(
        Database::open_intkeys(&env, "plain_db"),
        Err(Error::DatabaseOpen { .. })
    ));
    assert_eq!(plain.ordering(), KeyOrdering::Lexicographic);
}

#[test]
fn test_stored_ordering_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ordering.mdb");
    {
        let env = Environment::open(&path).unwrap();
        Database::open_intkeys(&env, "ik_db").unwrap();
    }

    let env = Environment::open(&path).unwrap();
    assert!(matches!(
        Database::open(&env, "ik_db"),
        Err(Error::DatabaseOpen {
            source: EngineError::Incompatible,
            ..
        })
    ));
    let ik = Database::open_with_ordering(&env, "ik_db", KeyOrdering::Integer).unwrap();
    assert!(ik.is_intkeys());
}
