//! Wrapping callables so that each call becomes a numbered sub-case.
//!
//! [`function`] and [`method`] wrap a callable in an [`Invoker`]. Every
//! [`Invoker::call`] checks the supplied values against the callable's
//! declared parameters, registers a sub-case named `group#n`, and returns an
//! [`Invocation`]. The callable only runs once its outputs are requested,
//! usually through [`Invocation::returns`].
//!
//! A malformed call (wrong number or types of values) is a setup error and
//! aborts the test. A wrong result, or a panic inside the callable, fails
//! only the sub-case it belongs to.
//!
//! # Examples
//!
//! ```
//! use casebook::{TestCase, function};
//!
//! fn div_mod(a: u32, b: u32) -> (u32, u32) {
//!     (a / b, a % b)
//! }
//!
//! let case = TestCase::new("div_mod");
//! let div_mod = function(&case, div_mod);
//! div_mod.call((7_u32, 2_u32)).returns((3, 1));
//! div_mod.call((9_u32, 3_u32)).returns((3, 0));
//! case.finish();
//! ```

mod args;
mod callable;
mod outputs;

use std::cell::{Cell, OnceCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, Location};
use std::rc::Rc;

pub use args::{Arg, IntoArgs, Param, Signature};
pub use callable::{Invokable, MethodInvokable};
pub use outputs::{IntoOutputs, Output, Outputs};

use crate::case::{SubCaseId, TestCase};
use crate::error::Result;
use crate::outcome;

type CallFn<R> = dyn Fn(Vec<Arg>) -> Option<R>;

struct Callable<R> {
    name: String,
    signature: Signature,
    func: Box<CallFn<R>>,
}

/// Wraps a free function or closure, grouping its calls under the
/// callable's own name.
pub fn function<F, Args>(case: &TestCase, callable: F) -> Invoker<'_, F::Output>
where
    F: Invokable<Args> + 'static,
{
    let name = callable::callable_name::<F>();
    named_function(case, name, callable)
}

/// Wraps a free function or closure under an explicit group name.
///
/// Distinct names keep independent counters even when they wrap the same
/// callable.
pub fn named_function<F, Args>(
    case: &TestCase,
    name: impl Into<String>,
    callable: F,
) -> Invoker<'_, F::Output>
where
    F: Invokable<Args> + 'static,
{
    let signature = callable.signature();
    Invoker::new(
        case,
        name.into(),
        signature,
        Box::new(move |args| callable.invoke(args)),
    )
}

/// Wraps a `&self` method; the first value of every call is the receiver.
///
/// # Examples
///
/// ```
/// use casebook::{TestCase, method};
///
/// struct Greeter {
///     greeting: &'static str,
/// }
///
/// impl Greeter {
///     fn greet(&self, name: String) -> String {
///         format!("{}, {name}!", self.greeting)
///     }
/// }
///
/// let case = TestCase::new("greets");
/// let greet = method(&case, Greeter::greet);
/// assert_eq!(greet.group(), "Greeter::greet");
/// greet
///     .call((Greeter { greeting: "Hello" }, String::from("Ada")))
///     .returns(String::from("Hello, Ada!"));
/// case.finish();
/// ```
pub fn method<S, F, Args>(case: &TestCase, callable: F) -> Invoker<'_, F::Output>
where
    F: MethodInvokable<S, Args> + 'static,
{
    let name = callable::callable_name::<F>();
    named_method(case, name, callable)
}

/// Wraps a `&self` method under an explicit group name.
pub fn named_method<S, F, Args>(
    case: &TestCase,
    name: impl Into<String>,
    callable: F,
) -> Invoker<'_, F::Output>
where
    F: MethodInvokable<S, Args> + 'static,
{
    let signature = callable.signature();
    Invoker::new(
        case,
        name.into(),
        signature,
        Box::new(move |args| callable.invoke(args)),
    )
}

/// A wrapped callable bound to a [`TestCase`].
///
/// Invokers share the case's namer, so two invokers with the same group
/// name continue one numbering sequence.
pub struct Invoker<'t, R> {
    case: &'t TestCase,
    callable: Rc<Callable<R>>,
}

impl<'t, R: IntoOutputs> Invoker<'t, R> {
    fn new(case: &'t TestCase, name: String, signature: Signature, func: Box<CallFn<R>>) -> Self {
        Self {
            case,
            callable: Rc::new(Callable {
                name,
                signature,
                func,
            }),
        }
    }

    /// Group name used for sub-cases.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.callable.name
    }

    /// Declared parameters, receiver first for methods.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.callable.signature
    }

    /// Supplies values for one call, returning a setup error instead of
    /// aborting the test when they do not fit the signature.
    ///
    /// A rejected call registers no sub-case and never runs the callable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HarnessError::Arity`] or [`crate::HarnessError::ArgumentType`]
    /// when the values do not match the declared parameters.
    pub fn try_call(&self, args: impl IntoArgs) -> Result<Invocation<'t, R>> {
        let supplied = args.into_args();
        self.callable.signature.check(&self.callable.name, &supplied)?;
        let id = self.case.open_in_group(&self.callable.name);
        Ok(Invocation {
            case: self.case,
            id,
            callable: Rc::clone(&self.callable),
            args: Cell::new(Some(supplied)),
            result: OnceCell::new(),
        })
    }

    /// Supplies values for one call and registers the next sub-case.
    ///
    /// # Panics
    ///
    /// Panics at the caller's location when the values do not match the
    /// callable's signature; a malformed call means the test itself is wrong.
    #[track_caller]
    pub fn call(&self, args: impl IntoArgs) -> Invocation<'t, R> {
        match self.try_call(args) {
            Ok(invocation) => invocation,
            Err(err) => panic!("setup error in test '{}': {err}", self.case.name()),
        }
    }
}

impl<R> fmt::Debug for Invoker<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("group", &self.callable.name)
            .field("signature", &self.callable.signature)
            .finish_non_exhaustive()
    }
}

/// One bound call awaiting, or holding, its outputs.
///
/// Outputs are captured on first request and never change afterwards.
pub struct Invocation<'t, R> {
    case: &'t TestCase,
    id: SubCaseId,
    callable: Rc<Callable<R>>,
    args: Cell<Option<Vec<Arg>>>,
    result: OnceCell<std::result::Result<Outputs, String>>,
}

impl<R: IntoOutputs> Invocation<'_, R> {
    /// Name of the sub-case this call reports to, such as `add#2`.
    #[must_use]
    pub fn name(&self) -> String {
        self.case.sub_case_name(self.id)
    }

    /// Runs the callable if needed and returns its outputs, or `None` when
    /// it panicked. A panic is recorded as a failure of this sub-case.
    #[track_caller]
    pub fn outputs(&self) -> Option<&Outputs> {
        self.execute(Location::caller()).as_ref().ok()
    }

    /// Runs the callable if needed and compares its outputs with `expected`.
    ///
    /// The first diverging position is recorded as a failure of this
    /// sub-case, attributed to the line calling `returns`. Sibling sub-cases
    /// are unaffected. Returns whether the outputs matched.
    #[track_caller]
    pub fn returns(&self, expected: R) -> bool {
        let location = Location::caller();
        let Ok(actual) = self.execute(location) else {
            return false;
        };
        outcome::first_mismatch(actual, &expected.into_outputs()).map_or_else(
            || {
                self.case.pass(self.id);
                true
            },
            |mismatch| {
                self.case.fail(self.id, mismatch.to_string(), location);
                false
            },
        )
    }

    fn execute(
        &self,
        location: &'static Location<'static>,
    ) -> &std::result::Result<Outputs, String> {
        self.result.get_or_init(|| {
            let args = self.args.take().unwrap_or_default();
            tracing::debug!(sub_case = %self.name(), "executing callable");
            let func = &self.callable.func;
            match std::panic::catch_unwind(AssertUnwindSafe(|| func(args))) {
                Ok(Some(value)) => Ok(value.into_outputs()),
                Ok(None) => panic!(
                    "setup error in test '{}': arguments for '{}' no longer match its signature",
                    self.case.name(),
                    self.callable.name
                ),
                Err(payload) => {
                    let message = format!("callable panicked: {}", panic_message(&*payload));
                    self.case.fail(self.id, message.clone(), location);
                    Err(message)
                }
            }
        })
    }
}

impl<R> fmt::Debug for Invocation<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("group", &self.callable.name)
            .field("executed", &self.result.get().is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}
