use std::thread;

use lmdbspan::{Database, Environment, Error, WriteError};
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, Environment) {
    let temp_dir = TempDir::new().unwrap();
    let env = Environment::open(temp_dir.path().join("txn.mdb")).unwrap();
    (temp_dir, env)
}

#[test]
fn test_commit_twice_fails() {
    let (_dir, env) = setup_test_env();
    let mut txn = env.begin_rw_txn().unwrap();
    assert!(!txn.is_readonly());
    assert!(!txn.is_finished());

    txn.commit().unwrap();
    assert!(txn.is_finished());

    assert!(matches!(txn.commit(), Err(Error::AlreadyClosed)));
}

#[test]
fn test_readonly_flag() {
    let (_dir, env) = setup_test_env();
    let txn = env.begin_ro_txn().unwrap();
    assert!(txn.is_readonly());
    txn.abort();
}

#[test]
fn test_drop_discards_writes() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "pets").unwrap();

    {
        let mut txn = env.begin_rw_txn().unwrap();
        txn.put_str_str(&db, "cat", "felix").unwrap();
        // Dropped without commit
    }

    let txn = env.begin_ro_txn().unwrap();
    assert!(!txn.get_str(&db, "cat").valid());
}

#[test]
fn test_explicit_abort_discards_writes() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "pets").unwrap();

    let mut txn = env.begin_rw_txn().unwrap();
    txn.put_str_str(&db, "dog", "rover").unwrap();
    txn.abort();

    let txn = env.begin_ro_txn().unwrap();
    assert!(!txn.get_str(&db, "dog").valid());
}

#[test]
fn test_readonly_put_is_rejected() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "pets").unwrap();

    let mut txn = env.begin_ro_txn().unwrap();
    let result = txn.put(&db, b"key", b"value");
    assert!(matches!(result, Err(Error::Write(WriteError::ReadOnly))));
}

#[test]
fn test_put_after_commit_is_rejected() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "pets").unwrap();

    let mut txn = env.begin_rw_txn().unwrap();
    txn.commit().unwrap();
    assert!(matches!(txn.put(&db, b"key", b"value"), Err(Error::AlreadyClosed)));
}

#[test]
#[should_panic(expected = "transaction used after commit or abort")]
fn test_get_after_commit_panics() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "pets").unwrap();

    let mut txn = env.begin_rw_txn().unwrap();
    txn.commit().unwrap();
    txn.get(&db, b"key");
}

#[test]
fn test_second_writer_on_same_thread_fails() {
    let (_dir, env) = setup_test_env();

    let first = env.begin_rw_txn().unwrap();
    assert!(matches!(env.begin_rw_txn(), Err(Error::Begin(_))));

    // Ending the first writer frees the slot
    drop(first);
    let mut second = env.begin_rw_txn().unwrap();
    second.commit().unwrap();
    env.begin_rw_txn().unwrap();
}

#[test]
fn test_transaction_isolation() {
    let (_dir, env) = setup_test_env();
    let db = Database::open(&env, "pets").unwrap();

    let mut write_txn = env.begin_rw_txn().unwrap();
    write_txn.put(&db, b"key", b"value").unwrap();

    // A reader on another thread doesn't see uncommitted changes
    thread::scope(|s| {
        s.spawn(|| {
            let read_txn = env.begin_ro_txn().unwrap();
            assert!(!read_txn.get(&db, b"key").valid());
        });
    });

    // After commit, changes are visible
    write_txn.commit().unwrap();
    let read_txn = env.begin_ro_txn().unwrap();
    assert_eq!(read_txn.get(&db, b"key").as_bytes(), b"value");
}

#[test]
fn test_concurrent_readers() {
    let (_dir, env) = setup_test_env();
    let db = Database::open_intkeys(&env, "counts").unwrap();

    let mut txn = env.begin_rw_txn().unwrap();
    for i in 0..100u32 {
        txn.put_u32(&db, i, &(i * 2).to_ne_bytes()).unwrap();
    }
    txn.commit().unwrap();

    thread::scope(|s| {
        for t in 0..4u32 {
            let env = &env;
            s.spawn(move || {
                let txn = env.begin_ro_txn().unwrap();
                for i in (t..100).step_by(4) {
                    assert_eq!(txn.get_u32(&db, i).as_u32(), i * 2);
                }
            });
        }
    });
}

#[test]
fn test_writers_on_other_threads_serialize() {
    let (_dir, env) = setup_test_env();
    let db = Database::open_intkeys(&env, "counts").unwrap();

    thread::scope(|s| {
        for t in 0..4u32 {
            let env = &env;
            s.spawn(move || {
                let mut txn = env.begin_rw_txn().unwrap();
                txn.put_u32(&db, t, b"done").unwrap();
                txn.commit().unwrap();
            });
        }
    });

    let txn = env.begin_ro_txn().unwrap();
    assert_eq!(db.stat(&txn).unwrap().entries, 4);
}

#[test]
#[should_panic(expected = "engine lookup failed")]
fn test_get_on_database_newer_than_txn_panics() {
    let (_dir, env) = setup_test_env();
    let txn = env.begin_ro_txn().unwrap();
    let late = Database::open(&env, "late").unwrap();
    txn.get(&late, b"key");
}
