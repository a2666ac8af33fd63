//! The enclosing test and the sub-cases recorded against it.
//!
//! A [`TestCase`] plays the role of the host framework's test handle: it
//! owns the [`CallNamer`], collects every sub-case opened by invokers and
//! HTTP executors, and fails the surrounding `#[test]` when it is finished
//! or dropped with at least one failed sub-case.
//!
//! The case is deliberately `!Sync`. Sub-cases are recorded through a
//! `RefCell`, so sharing one case between threads is rejected by the
//! compiler rather than left to chance.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;

use crate::namer::CallNamer;

/// Outcome of a single sub-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Registered but nothing has been asserted yet.
    Pending,
    /// Every assertion made against the sub-case held.
    Passed,
    /// At least one assertion failed.
    Failed,
}

/// One failed assertion, attributed to the line of test code that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
    location: &'static Location<'static>,
}

impl Failure {
    /// Human-readable description of the mismatch.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source location of the assertion in the caller's test code.
    #[must_use]
    pub const fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Independently reported outcome named `group#n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCase {
    name: String,
    status: Status,
    failures: Vec<Failure>,
}

impl SubCase {
    /// Name produced by the call namer, for example `add#2`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Failures recorded so far, in the order they were observed.
    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }
}

/// Handle to a sub-case registered on a [`TestCase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubCaseId(usize);

#[derive(Debug, Default)]
struct CaseState {
    namer: CallNamer,
    sub_cases: Vec<SubCase>,
}

/// The enclosing test: owns sub-case naming and results.
///
/// # Examples
///
/// ```
/// use casebook::{TestCase, function};
///
/// fn double(x: i32) -> i32 {
///     x * 2
/// }
///
/// let case = TestCase::new("doubles");
/// let double = function(&case, double);
/// double.call((2,)).returns(4);
/// double.call((5,)).returns(10);
/// case.finish();
/// ```
#[derive(Debug)]
pub struct TestCase {
    name: String,
    state: RefCell<CaseState>,
    finished: Cell<bool>,
}

impl TestCase {
    /// Creates a case for the test called `name`.
    ///
    /// Prefer [`test_case!`](crate::test_case) inside a `#[test]` function,
    /// which derives the name from the enclosing function.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RefCell::new(CaseState::default()),
            finished: Cell::new(false),
        }
    }

    /// Name of the enclosing test.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a new sub-case in `group`, numbering it with the namer.
    pub(crate) fn open_in_group(&self, group: &str) -> SubCaseId {
        let name = self.state.borrow_mut().namer.name_for(group);
        self.open(name)
    }

    /// Registers a new sub-case under an explicit name.
    pub(crate) fn open(&self, name: String) -> SubCaseId {
        tracing::debug!(test = %self.name, sub_case = %name, "sub-case registered");
        let mut state = self.state.borrow_mut();
        state.sub_cases.push(SubCase {
            name,
            status: Status::Pending,
            failures: Vec::new(),
        });
        SubCaseId(state.sub_cases.len().saturating_sub(1))
    }

    /// Issues the next `group#n` name without registering a sub-case.
    pub(crate) fn next_name(&self, group: &str) -> String {
        self.state.borrow_mut().namer.name_for(group)
    }

    pub(crate) fn sub_case_name(&self, id: SubCaseId) -> String {
        self.state
            .borrow()
            .sub_cases
            .get(id.0)
            .map(|sub_case| sub_case.name.clone())
            .unwrap_or_default()
    }

    /// Records a failed assertion against `id`.
    pub(crate) fn fail(
        &self,
        id: SubCaseId,
        message: impl Into<String>,
        location: &'static Location<'static>,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(sub_case) = state.sub_cases.get_mut(id.0) else {
            return;
        };
        let failure = Failure {
            message: message.into(),
            location,
        };
        tracing::warn!(
            test = %self.name,
            sub_case = %sub_case.name,
            %location,
            message = %failure.message,
            "sub-case failed"
        );
        sub_case.status = Status::Failed;
        sub_case.failures.push(failure);
    }

    /// Marks `id` as passed unless a failure was already recorded.
    pub(crate) fn pass(&self, id: SubCaseId) {
        let mut state = self.state.borrow_mut();
        if let Some(sub_case) = state.sub_cases.get_mut(id.0)
            && sub_case.status == Status::Pending
        {
            sub_case.status = Status::Passed;
            tracing::info!(test = %self.name, sub_case = %sub_case.name, "sub-case passed");
        }
    }

    /// Snapshot of every sub-case registered so far, in registration order.
    #[must_use]
    pub fn sub_cases(&self) -> Vec<SubCase> {
        self.state.borrow().sub_cases.clone()
    }

    /// Returns `true` when any sub-case has failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.state
            .borrow()
            .sub_cases
            .iter()
            .any(|sub_case| sub_case.status == Status::Failed)
    }

    /// Returns the report without failing the test.
    ///
    /// The case counts as finished afterwards: dropping it no longer
    /// panics, so a test can inspect failures itself.
    #[must_use]
    pub fn report(&self) -> Report {
        self.finished.set(true);
        Report {
            test: self.name.clone(),
            sub_cases: self.state.borrow().sub_cases.clone(),
        }
    }

    /// Ends the test, panicking with a report if any sub-case failed.
    ///
    /// # Panics
    ///
    /// Panics when at least one sub-case recorded a failure.
    #[track_caller]
    pub fn finish(&self) {
        let report = self.report();
        if report.failed().next().is_some() {
            panic!("{report}");
        }
    }
}

impl Drop for TestCase {
    fn drop(&mut self) {
        if self.finished.get() || std::thread::panicking() {
            return;
        }
        let report = Report {
            test: self.name.clone(),
            sub_cases: std::mem::take(&mut self.state.get_mut().sub_cases),
        };
        if report.failed().next().is_some() {
            panic!("{report}");
        }
    }
}

/// Summary of a finished [`TestCase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    test: String,
    sub_cases: Vec<SubCase>,
}

impl Report {
    /// Name of the test the report belongs to.
    #[must_use]
    pub fn test(&self) -> &str {
        &self.test
    }

    /// Every sub-case, in registration order.
    #[must_use]
    pub fn sub_cases(&self) -> &[SubCase] {
        &self.sub_cases
    }

    /// Iterates over the failed sub-cases.
    pub fn failed(&self) -> impl Iterator<Item = &SubCase> {
        self.sub_cases
            .iter()
            .filter(|sub_case| sub_case.status == Status::Failed)
    }

    /// Looks up a sub-case by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SubCase> {
        self.sub_cases.iter().find(|sub_case| sub_case.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed().count();
        write!(
            f,
            "test '{}': {failed} of {} sub-case(s) failed",
            self.test,
            self.sub_cases.len()
        )?;
        for sub_case in self.failed() {
            write!(f, "\n--- FAIL: {}", sub_case.name)?;
            for failure in &sub_case.failures {
                write!(f, "\n    {failure}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
