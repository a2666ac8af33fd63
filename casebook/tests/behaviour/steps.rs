//! Step definitions for multi-step HTTP scenarios.

use anyhow::{Context, Result, ensure};
use casebook::http::StatusCode;
use casebook::httptest::SequenceState;
use casebook::{HttpTestSpec, MultiHttpTestSpec, TestCase, serve_http};
use rstest_bdd_macros::{given, then, when};
use test_helpers::{CountingHandler, ItemStore};

use crate::fixtures::{HttpWorld, Target};

fn status(code: u16) -> Result<StatusCode> {
    StatusCode::from_u16(code).with_context(|| format!("{code} is not a status code"))
}

#[given("a counting handler answering {code:u16}")]
fn counting_handler(http_world: &HttpWorld, code: u16) -> Result<()> {
    ensure!(http_world.target.is_empty(), "target already configured");
    http_world
        .target
        .set(Target::Counting(CountingHandler::new(status(code)?)));
    Ok(())
}

#[given("an empty item store")]
fn empty_store(http_world: &HttpWorld) -> Result<()> {
    ensure!(http_world.target.is_empty(), "target already configured");
    http_world.target.set(Target::Store(ItemStore::new()));
    Ok(())
}

#[given("a scenario of {count:u8} steps each expecting status {code:u16}")]
fn uniform_steps(http_world: &HttpWorld, count: u8, code: u16) -> Result<()> {
    let expected = status(code)?;
    let steps = (1..=count)
        .map(|index| HttpTestSpec::get(format!("/step/{index}")).expect_status(expected))
        .collect();
    http_world.steps.set(steps);
    Ok(())
}

#[given("a scenario that creates {item} and reads it back")]
fn create_and_read(http_world: &HttpWorld, item: String) {
    let body = item.trim_matches('"').to_owned();
    http_world.steps.set(vec![
        HttpTestSpec::post("/items")
            .body(body.clone())
            .expect_status(StatusCode::CREATED)
            .expect_header("location", "/items/1"),
        HttpTestSpec::get("/items/1").expect_body(body),
    ]);
}

#[when("the scenario runs")]
fn run_scenario(http_world: &HttpWorld) -> Result<()> {
    let target = http_world.target.get().context("no target configured")?;
    let steps = http_world.steps.get().context("no steps configured")?;
    let scenario = MultiHttpTestSpec::new(steps);
    let case = TestCase::new("behaviour");
    let outcome = match target {
        Target::Counting(handler) => serve_http(&case, handler).run_steps(&scenario),
        Target::Store(store) => serve_http(&case, store).run_steps(&scenario),
    };
    let report = case.report();
    http_world.outcome.set(outcome);
    http_world.sub_case_names.set(
        report
            .sub_cases()
            .iter()
            .map(|sub_case| sub_case.name().to_owned())
            .collect(),
    );
    Ok(())
}

#[then("the number of executed steps is {expected:u8}")]
fn executed_steps(http_world: &HttpWorld, expected: u8) -> Result<()> {
    let outcome = http_world.outcome.get().context("scenario has not run")?;
    ensure!(
        outcome.executed == usize::from(expected),
        "executed {} steps",
        outcome.executed
    );
    let reported = http_world
        .sub_case_names
        .with_ref(Vec::len)
        .context("scenario has not run")?;
    ensure!(reported == usize::from(expected), "reported {reported} sub-cases");
    Ok(())
}

#[then("the handler received {expected:u8} requests")]
fn handler_requests(http_world: &HttpWorld, expected: u8) -> Result<()> {
    requests(http_world, expected)
}

#[then("the store received {expected:u8} requests")]
fn store_requests(http_world: &HttpWorld, expected: u8) -> Result<()> {
    requests(http_world, expected)
}

fn requests(http_world: &HttpWorld, expected: u8) -> Result<()> {
    let received = http_world
        .target
        .with_ref(Target::requests)
        .context("no target configured")?;
    ensure!(received == usize::from(expected), "received {received} requests");
    Ok(())
}

#[then("the scenario aborted at step {step:u8}")]
fn aborted_at(http_world: &HttpWorld, step: u8) -> Result<()> {
    let outcome = http_world.outcome.get().context("scenario has not run")?;
    let failed_step = usize::from(step).checked_sub(1).context("steps count from 1")?;
    ensure!(
        outcome.state == SequenceState::Aborted { failed_step },
        "state was {:?}",
        outcome.state
    );
    Ok(())
}

#[then("the scenario completed")]
fn completed(http_world: &HttpWorld) -> Result<()> {
    let outcome = http_world.outcome.get().context("scenario has not run")?;
    ensure!(outcome.passed(), "state was {:?}", outcome.state);
    Ok(())
}

#[then("the sub-cases are named after each step")]
fn named_steps(http_world: &HttpWorld) -> Result<()> {
    let names = http_world
        .sub_case_names
        .get()
        .context("scenario has not run")?;
    ensure!(
        names == ["steps#1/1 POST /items", "steps#1/2 GET /items/1"],
        "names were {names:?}"
    );
    Ok(())
}
