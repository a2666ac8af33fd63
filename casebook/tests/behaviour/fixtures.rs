//! Shared fixtures for the behavioural scenarios.

use casebook::HttpTestSpec;
use casebook::httptest::SequenceOutcome;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use test_helpers::{CountingHandler, ItemStore};

/// Handler a scenario runs against.
#[derive(Debug, Clone)]
pub enum Target {
    /// Fixed status, counting requests.
    Counting(CountingHandler),
    /// In-memory item store.
    Store(ItemStore),
}

impl Target {
    /// Requests received so far.
    pub fn requests(&self) -> usize {
        match self {
            Self::Counting(handler) => handler.hits(),
            Self::Store(store) => store.requests(),
        }
    }
}

/// State shared between the steps of one scenario.
#[derive(Debug, Default, ScenarioState)]
pub struct HttpWorld {
    pub target: Slot<Target>,
    pub steps: Slot<Vec<HttpTestSpec>>,
    pub outcome: Slot<SequenceOutcome>,
    pub sub_case_names: Slot<Vec<String>>,
}

/// Creates a clean world for each scenario.
#[fixture]
pub fn http_world() -> HttpWorld {
    HttpWorld::default()
}
