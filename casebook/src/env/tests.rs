//! Unit tests for environment overrides.

use std::sync::{Arc, Barrier};
use std::thread;

use rstest::rstest;

use super::*;

fn env_value(key: &str) -> String {
    match std::env::var(key) {
        Ok(value) => value,
        Err(err) => panic!("expected environment variable {key}: {err}"),
    }
}

fn preset(key: &str, value: Option<&str>) {
    with_lock(|| match value {
        // SAFETY: Serialised by ENV_MUTEX held via with_lock.
        Some(text) => unsafe { env_set_var(key, OsStr::new(text)) },
        // SAFETY: Serialised by ENV_MUTEX held via with_lock.
        None => unsafe { env_remove_var(key) },
    });
}

#[rstest]
#[case("CASEBOOK_ENV_PRESET", Some("orig"))]
#[case("CASEBOOK_ENV_ABSENT", None)]
fn reset_restores_the_exact_prior_state(#[case] key: &str, #[case] prior: Option<&str>) {
    preset(key, prior);
    let case = TestCase::new("reset");
    let guard = set_env(&case, key, "temp");
    assert_eq!(env_value(key), "temp");
    assert_eq!(guard.original().and_then(OsStr::to_str), prior);
    guard.reset();
    assert_eq!(std::env::var(key).ok().as_deref(), prior);
    preset(key, None);
}

#[test]
fn remove_var_restores_value() {
    let key = "CASEBOOK_ENV_REMOVE";
    preset(key, Some("to-be-removed"));
    {
        let _guard = remove_var(key);
        assert!(std::env::var(key).is_err());
    }
    assert_eq!(env_value(key), "to-be-removed");
    preset(key, None);
}

#[test]
fn stacking_restores_in_lifo() {
    let key = "CASEBOOK_ENV_STACKING";
    preset(key, None);
    let outer = set_var(key, "v1");
    let inner = set_var(key, "v2");
    assert_eq!(env_value(key), "v2");
    drop(inner);
    assert_eq!(env_value(key), "v1");
    drop(outer);
    assert!(std::env::var(key).is_err());
}

#[rstest]
#[case("")]
#[case("A=B")]
#[case("NUL\0KEY")]
fn invalid_keys_are_rejected(#[case] key: &str) {
    assert!(matches!(
        try_set_var(key, "x"),
        Err(HarnessError::InvalidEnvKey { .. })
    ));
}

#[test]
#[should_panic(expected = "setup error in test 'bad key'")]
fn set_env_panics_on_invalid_keys() {
    let case = TestCase::new("bad key");
    let _guard = set_env(&case, "", "x");
}

#[test]
fn set_envs_applies_all_or_nothing() {
    let case = TestCase::new("batch");
    let keys = ["CASEBOOK_ENV_BATCH_A", "CASEBOOK_ENV_BATCH_B"];
    for key in keys {
        preset(key, None);
    }
    let scope = set_envs(&case, keys.map(|key| (key, "on")));
    assert_eq!(scope.keys(), keys);
    assert!(keys.iter().all(|key| env_value(key) == "on"));
    scope.reset();
    assert!(keys.iter().all(|key| std::env::var(key).is_err()));

    let rejected = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _scope = set_envs(&case, [("CASEBOOK_ENV_BATCH_A", "on"), ("BAD=KEY", "on")]);
    }));
    assert!(rejected.is_err());
    assert!(std::env::var("CASEBOOK_ENV_BATCH_A").is_err());
}

#[test]
fn scopes_restore_every_guard_in_reverse() {
    let kept = "CASEBOOK_ENV_SCOPE_KEPT";
    let cleared = "CASEBOOK_ENV_SCOPE_CLEARED";
    preset(kept, Some("before"));
    preset(cleared, Some("present"));
    let built = scope_with(|lock| {
        vec![
            lock.set_var(kept, "first"),
            lock.set_var(kept, "second"),
            lock.remove_var(cleared),
        ]
    });
    assert_eq!(built.keys(), [kept, kept, cleared]);
    assert_eq!(env_value(kept), "second");
    assert!(std::env::var(cleared).is_err());
    built.reset();
    assert_eq!(env_value(kept), "before");
    assert_eq!(env_value(cleared), "present");

    let adopted = scope(vec![set_var(kept, "adopted")]);
    assert_eq!(env_value(kept), "adopted");
    drop(adopted);
    assert_eq!(env_value(kept), "before");
    preset(kept, None);
    preset(cleared, None);
}

#[test]
fn concurrent_mutations_of_distinct_keys_restore_values() {
    const THREADS: usize = 4;
    const ITERATIONS: usize = 8;
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let key = format!("CASEBOOK_ENV_CONCURRENT_{index}");
            preset(&key, Some("original"));
            let start = Arc::clone(&barrier);
            thread::spawn(move || {
                start.wait();
                for iteration in 0..ITERATIONS {
                    let value = format!("value-{iteration}");
                    let guard = set_var(&key, &value);
                    assert_eq!(env_value(&key), value);
                    drop(guard);
                    assert_eq!(env_value(&key), "original");
                }
                preset(&key, None);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}
