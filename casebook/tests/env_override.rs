//! Integration tests for scoped environment overrides.

use casebook::{TestCase, env, test_case};
use rstest::rstest;
use serial_test::serial;

const KEY: &str = "CASEBOOK_IT_MODE";

fn current() -> Option<String> {
    std::env::var(KEY).ok()
}

#[rstest]
#[case(None)]
#[case(Some("production"))]
#[serial]
fn reset_restores_the_exact_prior_value(#[case] prior: Option<&str>) {
    let _baseline = match prior {
        Some(value) => env::set_var(KEY, value),
        None => env::remove_var(KEY),
    };
    let case = test_case!();
    let guard = env::set_env(&case, KEY, "test");
    assert_eq!(current().as_deref(), Some("test"));
    guard.reset();
    assert_eq!(current().as_deref(), prior);
}

#[test]
#[serial]
fn overrides_end_with_the_scope() {
    let _baseline = env::remove_var(KEY);
    let case = TestCase::new("scoped");
    {
        let _mode = env::set_env(&case, KEY, "scoped");
        assert_eq!(current().as_deref(), Some("scoped"));
    }
    assert_eq!(current(), None);
}

#[test]
#[serial]
fn batches_restore_together() {
    let _baseline = env::set_var(KEY, "base");
    let case = TestCase::new("batch");
    let scope = env::set_envs(&case, [(KEY, "one"), ("CASEBOOK_IT_EXTRA", "two")]);
    assert_eq!(current().as_deref(), Some("one"));
    assert_eq!(std::env::var("CASEBOOK_IT_EXTRA").as_deref(), Ok("two"));
    drop(scope);
    assert_eq!(current().as_deref(), Some("base"));
    assert!(std::env::var_os("CASEBOOK_IT_EXTRA").is_none());
}

#[test]
#[serial]
#[should_panic(expected = "invalid environment variable name")]
fn invalid_keys_fail_setup() {
    let case = TestCase::new("invalid");
    let _guard = env::set_env(&case, "MODE=1", "x");
}
