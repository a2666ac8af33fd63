//! Declarative HTTP scenarios run against a handler or a live endpoint.
//!
//! An [`HttpExecutor`] is bound once to a dispatch target and then runs
//! [`HttpTestSpec`]s and [`MultiHttpTestSpec`]s against it. Each executed
//! spec becomes a sub-case of the owning [`TestCase`]:
//!
//! - a single spec is named after its method and path, e.g. `GET /items#1`;
//! - the steps of a multi-step spec share a scenario name, e.g.
//!   `steps#1/2 GET /items/1`, and steps after the first failing one are
//!   never run or reported.

mod assertions;
mod dispatch;
mod handler;
mod recorder;
mod sequencer;
mod spec;

use std::fmt;
use std::panic::{AssertUnwindSafe, Location};

pub use assertions::{HttpMismatch, check};
pub use dispatch::{Dispatch, ExecutorOptions, InProcess, Remote};
pub use handler::{Handler, ServiceHandler, SharedHandler};
pub use recorder::{RecordedResponse, ResponseRecorder};
pub use sequencer::{SequenceOutcome, SequenceState, Sequencer};
pub use spec::{HttpTestSpec, MultiHttpTestSpec};

use crate::case::TestCase;
use crate::error::Result;
use crate::invoke::panic_message;

/// Anything [`HttpExecutor::run`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// One request.
    Single(HttpTestSpec),
    /// Ordered steps with fail-fast semantics.
    Steps(MultiHttpTestSpec),
}

impl From<HttpTestSpec> for Scenario {
    fn from(spec: HttpTestSpec) -> Self {
        Self::Single(spec)
    }
}

impl From<MultiHttpTestSpec> for Scenario {
    fn from(steps: MultiHttpTestSpec) -> Self {
        Self::Steps(steps)
    }
}

impl From<Vec<HttpTestSpec>> for Scenario {
    fn from(steps: Vec<HttpTestSpec>) -> Self {
        Self::Steps(MultiHttpTestSpec::new(steps))
    }
}

/// Runs HTTP specs against one dispatch target, reporting into a
/// [`TestCase`].
///
/// # Examples
///
/// ```
/// use casebook::{Bytes, HttpTestSpec, ResponseRecorder, serve_http, test_case};
/// use casebook::http::{Request, StatusCode};
///
/// let case = test_case!();
/// let http = serve_http(&case, |request: &Request<Bytes>, response: &mut ResponseRecorder| {
///     if request.uri().path() == "/health" {
///         response.write_body("ok");
///     } else {
///         response.set_status(StatusCode::NOT_FOUND);
///     }
/// });
/// assert!(http.run(HttpTestSpec::get("/health").expect_body("ok")));
/// assert!(http.run(HttpTestSpec::get("/missing").expect_status(StatusCode::NOT_FOUND)));
/// case.finish();
/// ```
pub struct HttpExecutor<'t, D> {
    case: &'t TestCase,
    dispatch: D,
}

/// Binds an executor to an in-process `handler`.
pub const fn serve_http<H: Handler>(case: &TestCase, handler: H) -> HttpExecutor<'_, InProcess<H>> {
    HttpExecutor::new(case, InProcess::new(handler))
}

/// Binds an executor to the HTTP endpoint at `url`.
///
/// # Errors
///
/// Returns a [`HarnessError`](crate::HarnessError) when `url` is not an
/// absolute base URL, carries a query or fragment, or the client cannot be
/// built.
pub fn serve_endpoint<'t>(case: &'t TestCase, url: &str) -> Result<HttpExecutor<'t, Remote>> {
    Ok(HttpExecutor::new(
        case,
        Remote::new(url, ExecutorOptions::default())?,
    ))
}

impl<'t, D: Dispatch> HttpExecutor<'t, D> {
    /// Binds `dispatch` to `case`.
    pub const fn new(case: &'t TestCase, dispatch: D) -> Self {
        Self { case, dispatch }
    }

    /// The dispatch target.
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatch
    }

    /// Runs a spec or a multi-step spec and returns whether it passed.
    ///
    /// # Panics
    ///
    /// Panics at the caller's location on a setup error: an unbuildable
    /// request, an invalid expected header name or a transport failure.
    #[track_caller]
    pub fn run(&self, scenario: impl Into<Scenario>) -> bool {
        let location = Location::caller();
        match scenario.into() {
            Scenario::Single(spec) => self.run_single(&spec, location),
            Scenario::Steps(steps) => self.run_steps_at(&steps, location).passed(),
        }
    }

    /// Runs a multi-step spec and returns how far it got.
    ///
    /// # Panics
    ///
    /// Panics on a setup error, as [`run`](Self::run) does.
    #[track_caller]
    pub fn run_steps(&self, steps: &MultiHttpTestSpec) -> SequenceOutcome {
        self.run_steps_at(steps, Location::caller())
    }

    fn run_single(&self, spec: &HttpTestSpec, location: &'static Location<'static>) -> bool {
        let name = self.case.next_name(&spec.label());
        self.step(name, spec, location)
            .unwrap_or_else(|err| self.setup_failed(&err, location))
    }

    fn run_steps_at(
        &self,
        steps: &MultiHttpTestSpec,
        location: &'static Location<'static>,
    ) -> SequenceOutcome {
        let scenario = self.case.next_name(steps.group());
        let outcome = Sequencer::new(&steps.steps)
            .run(|index, spec| {
                let name = format!("{scenario}/{} {}", index + 1, spec.label());
                self.step(name, spec, location)
            })
            .unwrap_or_else(|err| self.setup_failed(&err, location));
        if !outcome.passed() {
            tracing::debug!(
                %scenario,
                skipped = outcome.total - outcome.executed,
                "remaining steps skipped"
            );
        }
        outcome
    }

    fn step(
        &self,
        name: String,
        spec: &HttpTestSpec,
        location: &'static Location<'static>,
    ) -> Result<bool> {
        let request = spec.to_request()?;
        let id = self.case.open(name);
        let response = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.dispatch.dispatch(request)
        })) {
            Ok(response) => response?,
            Err(payload) => {
                let message = format!("handler panicked: {}", panic_message(&*payload));
                self.case.fail(id, message, location);
                return Ok(false);
            }
        };
        let mismatches = check(spec, &response)?;
        for mismatch in &mismatches {
            self.case.fail(id, mismatch.to_string(), location);
        }
        if mismatches.is_empty() {
            self.case.pass(id);
        }
        Ok(mismatches.is_empty())
    }

    fn setup_failed(&self, err: &crate::HarnessError, location: &Location<'_>) -> ! {
        panic!(
            "setup error in test '{}' at {location}: {err}",
            self.case.name()
        )
    }
}

impl<D: fmt::Debug> fmt::Debug for HttpExecutor<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("test", &self.case.name())
            .field("dispatch", &self.dispatch)
            .finish()
    }
}
