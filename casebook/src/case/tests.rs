//! Unit tests for sub-case bookkeeping and reporting.

use super::*;

#[test]
fn sub_cases_start_pending_and_pass_once() {
    let case = TestCase::new("bookkeeping");
    let id = case.open_in_group("add");
    assert_eq!(case.sub_cases()[0].status(), Status::Pending);
    case.pass(id);
    assert_eq!(case.sub_cases()[0].status(), Status::Passed);
    assert_eq!(case.sub_case_name(id), "add#1");
    let report = case.report();
    assert!(report.failed().next().is_none());
}

#[test]
fn failures_are_sticky() {
    let case = TestCase::new("sticky");
    let id = case.open_in_group("add");
    case.fail(id, "output 0: expected 1, got 2", Location::caller());
    case.pass(id);
    let report = case.report();
    let sub_case = report.get("add#1").expect("sub-case should be recorded");
    assert_eq!(sub_case.status(), Status::Failed);
    assert_eq!(sub_case.failures().len(), 1);
    assert_eq!(sub_case.failures()[0].location().file(), file!());
}

#[test]
fn report_lists_only_failed_sub_cases() {
    let case = TestCase::new("listing");
    let ok = case.open_in_group("add");
    let bad = case.open_in_group("add");
    case.pass(ok);
    case.fail(bad, "boom", Location::caller());
    let rendered = case.report().to_string();
    assert!(rendered.starts_with("test 'listing': 1 of 2 sub-case(s) failed"));
    assert!(rendered.contains("--- FAIL: add#2"));
    assert!(!rendered.contains("add#1"));
    assert!(rendered.contains("boom"));
}

#[test]
fn explicit_names_bypass_the_namer() {
    let case = TestCase::new("explicit");
    let step = case.next_name("steps");
    case.open(format!("{step}/1 GET /"));
    assert_eq!(case.next_name("steps"), "steps#2");
    assert_eq!(case.sub_cases()[0].name(), "steps#1/1 GET /");
    let _report = case.report();
}

#[test]
#[should_panic(expected = "--- FAIL: add#1")]
fn finish_panics_on_failure() {
    let case = TestCase::new("finishing");
    let id = case.open_in_group("add");
    case.fail(id, "mismatch", Location::caller());
    case.finish();
}

#[test]
#[should_panic(expected = "1 of 1 sub-case(s) failed")]
fn drop_panics_on_failure() {
    let case = TestCase::new("dropping");
    let id = case.open_in_group("add");
    case.fail(id, "mismatch", Location::caller());
}

#[test]
fn drop_is_silent_when_everything_passed() {
    let case = TestCase::new("quiet");
    let id = case.open_in_group("add");
    case.pass(id);
    drop(case);
}
