//! Binds the feature files to the step registry.

use crate::fixtures::{HttpWorld, http_world};
use rstest_bdd_macros::scenarios;

scenarios!(
    "tests/features/multi_step.feature",
    fixtures = [http_world: HttpWorld]
);
