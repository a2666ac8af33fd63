//! Integration tests for running HTTP specs against in-process handlers.

use axum::Router;
use axum::extract::Path;
use axum::routing::get;
use casebook::http::header::CONTENT_TYPE;
use casebook::http::{HeaderValue, Request, StatusCode};
use casebook::{
    Bytes, HttpTestSpec, MultiHttpTestSpec, ResponseRecorder, ServiceHandler, Status, TestCase,
    serve_http, test_case,
};
use rstest::{fixture, rstest};
use test_helpers::{CountingHandler, ItemStore, echo};

#[fixture]
fn store() -> ItemStore {
    ItemStore::new()
}

#[test]
fn extra_response_headers_are_ignored() {
    let case = test_case!();
    let http = serve_http(&case, |_: &Request<Bytes>, response: &mut ResponseRecorder| {
        response.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
            .headers_mut()
            .insert("x-request-id", HeaderValue::from_static("abc-123"));
        response.write_body("{}");
    });
    assert!(http.run(
        HttpTestSpec::get("/")
            .expect_header("Content-Type", "application/json")
            .expect_body("{}")
    ));
    case.finish();
}

#[test]
fn queries_headers_and_bodies_reach_the_handler() {
    let case = test_case!();
    let http = serve_http(&case, echo);
    let spec = HttpTestSpec::put("/echo")
        .query("name", "Zoë")
        .query("tag", "a&b")
        .json_body(&["x", "y"])
        .expect("serialisable body")
        .expect_status(StatusCode::OK)
        .expect_header("x-method", "PUT")
        .expect_header("x-query", "name=Zo%C3%AB&tag=a%26b")
        .expect_header("content-type", "application/json")
        .expect_body(r#"["x","y"]"#);
    assert!(http.run(spec));
    case.finish();
}

#[rstest]
fn multi_step_scenarios_share_state(store: ItemStore) {
    let case = test_case!();
    let http = serve_http(&case, store.clone());
    let scenario = MultiHttpTestSpec::named("lifecycle")
        .step(
            HttpTestSpec::post("/items")
                .body("apple")
                .expect_status(StatusCode::CREATED)
                .expect_header("location", "/items/1"),
        )
        .step(HttpTestSpec::get("/items/1").expect_body("apple"))
        .step(HttpTestSpec::delete("/items/1").expect_status(StatusCode::NO_CONTENT))
        .step(HttpTestSpec::get("/items/1").expect_status(StatusCode::NOT_FOUND));
    let outcome = http.run_steps(&scenario);
    assert!(outcome.passed());
    assert_eq!(outcome.executed, 4);
    assert_eq!(store.requests(), 4);
    assert!(store.is_empty());
    let names: Vec<String> = case
        .sub_cases()
        .iter()
        .map(|sub_case| sub_case.name().to_owned())
        .collect();
    assert_eq!(
        names,
        [
            "lifecycle#1/1 POST /items",
            "lifecycle#1/2 GET /items/1",
            "lifecycle#1/3 DELETE /items/1",
            "lifecycle#1/4 GET /items/1",
        ]
    );
    case.finish();
}

#[test]
fn a_failed_step_stops_the_scenario() {
    let counter = CountingHandler::new(StatusCode::OK);
    let case = TestCase::new("fail fast");
    let http = serve_http(&case, counter.clone());
    let passed = http.run(vec![
        HttpTestSpec::post("/items").expect_status(StatusCode::CREATED),
        HttpTestSpec::get("/items/1").expect_status(StatusCode::OK),
    ]);
    assert!(!passed);
    assert_eq!(counter.hits(), 1);
    let report = case.report();
    assert_eq!(report.sub_cases().len(), 1);
    assert_eq!(report.sub_cases()[0].status(), Status::Failed);
    assert_eq!(
        report.sub_cases()[0].failures()[0].message(),
        "status: expected 201 Created, got 200 OK"
    );
}

#[test]
fn independent_specs_keep_running_after_a_failure() {
    let counter = CountingHandler::new(StatusCode::OK).with_body("pong");
    let case = TestCase::new("independent");
    let http = serve_http(&case, counter.clone());
    assert!(!http.run(HttpTestSpec::get("/ping").expect_body("pang")));
    assert!(http.run(HttpTestSpec::get("/ping").expect_body("pong")));
    assert_eq!(counter.hits(), 2);
    let failed: Vec<String> = case
        .report()
        .failed()
        .map(|sub_case| sub_case.name().to_owned())
        .collect();
    assert_eq!(failed, ["GET /ping#1"]);
}

async fn item(Path(id): Path<u32>) -> (StatusCode, String) {
    if id == 1 {
        (StatusCode::OK, String::from("apple"))
    } else {
        (StatusCode::NOT_FOUND, format!("no item {id}"))
    }
}

#[test]
fn tower_services_are_handlers() {
    let router = Router::new().route("/items/{id}", get(item));
    let service = ServiceHandler::new(router).expect("runtime builds");
    let case = test_case!();
    let http = serve_http(&case, service);
    assert!(http.run(
        HttpTestSpec::get("/items/1")
            .expect_status(StatusCode::OK)
            .expect_header("content-type", "text/plain; charset=utf-8")
            .expect_body("apple")
    ));
    assert!(http.run(
        HttpTestSpec::get("/items/2")
            .expect_status(StatusCode::NOT_FOUND)
            .expect_body("no item 2")
    ));
    assert!(http.run(HttpTestSpec::get("/nowhere").expect_status(StatusCode::NOT_FOUND)));
    case.finish();
}
